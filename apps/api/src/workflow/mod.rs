//! Upload workflow: the sequence behind one resume submission.
//!
//! Flow: upload PDF → render preview → upload preview → persist record with
//! empty feedback → request AI feedback → parse the embedded JSON → persist
//! record with feedback.
//!
//! Every step awaits the previous one; nothing runs in parallel and nothing is
//! retried. Any failure ends the run in `Failed` with a status text the user
//! can read, and the user may simply submit again.

pub mod handlers;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::conversion::PdfConverter;
use crate::feedback::prompts::prepare_instructions;
use crate::feedback::{parse_feedback, FeedbackParseError, FeedbackService, FeedbackSlot};
use crate::models::resume::ResumeRecord;
use crate::resumes::repository::ResumeRepository;
use crate::storage::{BlobStore, FileBlob, StorageError};

/// One user submission: the PDF plus the job it is scored against.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub file: FileBlob,
}

/// Linear progress of a run. `Failed` is reachable from every stage and
/// absorbs; there are no back-edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Idle,
    Uploading,
    Converting,
    UploadingImage,
    Persisting,
    Analyzing,
    ParsingFeedback,
    Complete,
    Failed,
}

impl WorkflowStage {
    /// Status text shown while the stage runs. `Failed` carries its own message.
    pub fn status_text(self) -> &'static str {
        match self {
            WorkflowStage::Idle => "",
            WorkflowStage::Uploading => "Uploading file...",
            WorkflowStage::Converting => "Converting to image...",
            WorkflowStage::UploadingImage => "Uploading the image...",
            WorkflowStage::Persisting => "Preparing data...",
            WorkflowStage::Analyzing => "Analyzing file...",
            WorkflowStage::ParsingFeedback => "Reading feedback...",
            WorkflowStage::Complete => "Analysis Complete",
            WorkflowStage::Failed => "Error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStage::Complete | WorkflowStage::Failed)
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Upload(String),

    #[error("{0}")]
    Conversion(String),

    #[error("Failed to analyze: {0}")]
    Analysis(String),

    #[error("{0}")]
    Parse(#[from] FeedbackParseError),

    #[error("Failed to save resume: {0}")]
    Store(#[from] StorageError),
}

/// Receives status updates as the workflow moves through its stages.
pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: WorkflowStage, status_text: &str);
}

/// Path of the results view for a record.
pub fn results_path(id: Uuid) -> String {
    format!("/resume/{id}")
}

pub struct UploadWorkflow {
    blobs: Arc<dyn BlobStore>,
    converter: Arc<dyn PdfConverter>,
    resumes: ResumeRepository,
    ai: Arc<dyn FeedbackService>,
}

impl UploadWorkflow {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        converter: Arc<dyn PdfConverter>,
        resumes: ResumeRepository,
        ai: Arc<dyn FeedbackService>,
    ) -> Self {
        Self {
            blobs,
            converter,
            resumes,
            ai,
        }
    }

    /// Runs the whole submission. On failure the error is logged and reported
    /// to `progress` as `Error: <message>` before being returned.
    pub async fn analyze(
        &self,
        request: UploadRequest,
        progress: &dyn ProgressSink,
    ) -> Result<ResumeRecord, WorkflowError> {
        match self.run(request, progress).await {
            Ok(record) => {
                info!("Analysis complete for {}", record.key());
                progress.report(
                    WorkflowStage::Complete,
                    WorkflowStage::Complete.status_text(),
                );
                Ok(record)
            }
            Err(e) => {
                error!("Analysis failed: {e}");
                progress.report(WorkflowStage::Failed, &format!("Error: {e}"));
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: UploadRequest,
        progress: &dyn ProgressSink,
    ) -> Result<ResumeRecord, WorkflowError> {
        let UploadRequest {
            company_name,
            job_title,
            job_description,
            file,
        } = request;

        enter(progress, WorkflowStage::Uploading);
        let resume_path = self.upload(&file, "File").await?;

        enter(progress, WorkflowStage::Converting);
        let outcome = self.converter.convert(&file).await;
        let image = outcome.file.ok_or_else(|| {
            WorkflowError::Conversion(
                outcome
                    .error
                    .unwrap_or_else(|| "Failed to convert PDF to image".to_string()),
            )
        })?;

        enter(progress, WorkflowStage::UploadingImage);
        let image_path = self.upload(&image, "Image").await?;

        enter(progress, WorkflowStage::Persisting);
        let record = ResumeRecord {
            id: Uuid::new_v4(),
            resume_path,
            image_path,
            company_name,
            job_title,
            job_description,
            feedback: FeedbackSlot::Pending,
        };
        self.resumes.save(&record).await?;
        info!("Stored {} awaiting feedback", record.key());

        enter(progress, WorkflowStage::Analyzing);
        let instructions = prepare_instructions(&record.job_title, &record.job_description);
        let response = self
            .ai
            .feedback(&record.resume_path, &instructions)
            .await
            .map_err(|e| WorkflowError::Analysis(e.to_string()))?
            .ok_or_else(|| WorkflowError::Analysis("AI response was empty".to_string()))?;
        let text = response
            .text()
            .ok_or_else(|| WorkflowError::Analysis("AI response was empty".to_string()))?;
        debug!("Raw AI response for {}: {}", record.key(), text);

        enter(progress, WorkflowStage::ParsingFeedback);
        let feedback = parse_feedback(text)?;

        let record = record.with_feedback(feedback);
        self.resumes.save(&record).await?;

        Ok(record)
    }

    async fn upload(&self, file: &FileBlob, what: &str) -> Result<String, WorkflowError> {
        match self.blobs.upload(file).await {
            Ok(Some(stored)) => Ok(stored.path),
            Ok(None) => Err(WorkflowError::Upload(format!(
                "{what} upload failed. Please try again."
            ))),
            Err(e) => Err(WorkflowError::Upload(format!("{what} upload failed: {e}"))),
        }
    }
}

fn enter(progress: &dyn ProgressSink, stage: WorkflowStage) {
    info!("Upload workflow stage: {:?}", stage);
    progress.report(stage, stage.status_text());
}
