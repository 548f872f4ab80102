use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::feedback::extract::AiResponse;
use crate::feedback::prompts::{resume_prompt, FEEDBACK_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};
use crate::storage::{BlobStore, StorageError};

#[derive(Debug, Error)]
pub enum FeedbackServiceError {
    #[error("could not read resume: {0}")]
    Storage(#[from] StorageError),

    #[error("could not extract resume text: {0}")]
    Extraction(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// AI feedback for a stored resume. `Ok(None)` means the service answered
/// with nothing usable.
#[async_trait]
pub trait FeedbackService: Send + Sync {
    async fn feedback(
        &self,
        resume_path: &str,
        instructions: &str,
    ) -> Result<Option<AiResponse>, FeedbackServiceError>;
}

/// Reads the stored PDF, extracts its text and asks Claude for feedback.
pub struct AnthropicFeedbackService {
    llm: LlmClient,
    blobs: Arc<dyn BlobStore>,
}

impl AnthropicFeedbackService {
    pub fn new(llm: LlmClient, blobs: Arc<dyn BlobStore>) -> Self {
        Self { llm, blobs }
    }
}

#[async_trait]
impl FeedbackService for AnthropicFeedbackService {
    async fn feedback(
        &self,
        resume_path: &str,
        instructions: &str,
    ) -> Result<Option<AiResponse>, FeedbackServiceError> {
        let pdf = self.blobs.download(resume_path).await?;

        let resume_text =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf.bytes))
                .await
                .map_err(|e| FeedbackServiceError::Extraction(e.to_string()))?
                .map_err(|e| FeedbackServiceError::Extraction(e.to_string()))?;

        if resume_text.trim().is_empty() {
            return Err(FeedbackServiceError::Extraction(
                "the PDF contains no extractable text".to_string(),
            ));
        }
        debug!("Extracted {} chars from {}", resume_text.len(), resume_path);

        let response = self
            .llm
            .call(&resume_prompt(instructions, &resume_text), FEEDBACK_SYSTEM)
            .await?;

        info!(
            "Feedback received for {}: input_tokens={}, output_tokens={}",
            resume_path, response.usage.input_tokens, response.usage.output_tokens
        );

        let parts: Vec<String> = response
            .content
            .into_iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text)
            .collect();

        if parts.is_empty() {
            return Ok(None);
        }
        Ok(Some(AiResponse::from_parts(parts)))
    }
}
