//! Turning an AI response into validated feedback.
//!
//! The model answers in free text that should contain one JSON object. The
//! text is taken from the response, the first balanced `{...}` span is cut
//! out, and that span alone is parsed and checked against the schema.

use serde::Deserialize;
use thiserror::Error;

use super::types::FeedbackValue;

/// Response envelope of the AI service.
#[derive(Debug, Clone, Deserialize)]
pub struct AiResponse {
    pub message: AiMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiMessage {
    pub content: MessageContent,
}

/// The content is either a plain string or a list of text parts.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub text: Option<String>,
}

impl AiResponse {
    #[cfg(test)]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            message: AiMessage {
                content: MessageContent::Text(text.into()),
            },
        }
    }

    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message: AiMessage {
                content: MessageContent::Parts(
                    parts
                        .into_iter()
                        .map(|t| ContentPart {
                            text: Some(t.into()),
                        })
                        .collect(),
                ),
            },
        }
    }

    /// A string body is used as is; a part list yields the first part's text.
    pub fn text(&self) -> Option<&str> {
        match &self.message.content {
            MessageContent::Text(s) => Some(s.as_str()),
            MessageContent::Parts(parts) => parts.first().and_then(|p| p.text.as_deref()),
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedbackParseError {
    #[error("AI did not return a JSON object")]
    NoJsonObject,

    #[error("AI returned malformed JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("AI feedback does not match the expected format: {0}")]
    Schema(serde_json::Error),
}

/// Returns the first balanced `{...}` span in `text`.
///
/// Braces inside JSON string literals do not count toward the balance. Only
/// the span opened by the first `{` is considered; if it never closes there
/// is no object.
pub fn locate_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Locates, parses and validates the feedback object embedded in `text`.
pub fn parse_feedback(text: &str) -> Result<FeedbackValue, FeedbackParseError> {
    let span = locate_json_object(text).ok_or(FeedbackParseError::NoJsonObject)?;
    let value: serde_json::Value =
        serde_json::from_str(span).map_err(FeedbackParseError::InvalidJson)?;
    FeedbackValue::from_value(value).map_err(FeedbackParseError::Schema)
}
