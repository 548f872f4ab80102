use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::feedback::{FeedbackSlot, FeedbackValue};

/// Persisted metadata and feedback for one uploaded resume.
///
/// Stored as camelCase JSON under `resume:<id>`. `feedback` is `""` until the
/// analysis has been parsed and attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: Uuid,
    pub resume_path: String,
    pub image_path: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub feedback: FeedbackSlot,
}

impl ResumeRecord {
    pub fn key(&self) -> String {
        record_key(self.id)
    }

    pub fn with_feedback(mut self, feedback: FeedbackValue) -> Self {
        self.feedback = FeedbackSlot::Scored(feedback);
        self
    }

    pub fn summary(&self) -> ResumeSummary {
        ResumeSummary {
            id: self.id,
            company_name: self.company_name.clone(),
            job_title: self.job_title.clone(),
            image_path: self.image_path.clone(),
            overall_score: self.feedback.overall_score(),
        }
    }
}

pub const RECORD_KEY_PREFIX: &str = "resume:";

pub fn record_key(id: Uuid) -> String {
    format!("{RECORD_KEY_PREFIX}{id}")
}

/// What a resume card needs: identity, job, preview and the score if analyzed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSummary {
    pub id: Uuid,
    pub company_name: String,
    pub job_title: String,
    pub image_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
}
