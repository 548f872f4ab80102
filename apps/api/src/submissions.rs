//! In-flight submission tracking.
//!
//! Each accepted upload gets a submission id whose status the client polls.
//! A user may have only one submission running at a time; finished statuses
//! are kept for `RETENTION_MINUTES` so a slow client can still read the outcome.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::models::resume::ResumeRecord;
use crate::workflow::{results_path, ProgressSink, WorkflowError, WorkflowStage};

const RETENTION_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatus {
    pub submission_id: Uuid,
    #[serde(skip)]
    pub user_id: String,
    pub stage: WorkflowStage,
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    statuses: HashMap<Uuid, SubmissionStatus>,
    active_users: HashSet<String>,
}

#[derive(Default)]
pub struct SubmissionTracker {
    inner: Mutex<Inner>,
}

impl SubmissionTracker {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a new submission for `user_id`, or returns `None` if that
    /// user already has one in flight.
    pub fn begin(&self, user_id: &str) -> Option<Uuid> {
        let mut inner = self.lock();
        prune(&mut inner, Utc::now());

        if !inner.active_users.insert(user_id.to_string()) {
            warn!("Rejected overlapping submission for user {user_id}");
            return None;
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        inner.statuses.insert(
            id,
            SubmissionStatus {
                submission_id: id,
                user_id: user_id.to_string(),
                stage: WorkflowStage::Idle,
                status_text: WorkflowStage::Idle.status_text().to_string(),
                resume_id: None,
                redirect_to: None,
                error: None,
                started_at: now,
                updated_at: now,
            },
        );
        Some(id)
    }

    /// Status of a submission, visible only to the user who made it.
    pub fn status(&self, id: Uuid, user_id: &str) -> Option<SubmissionStatus> {
        self.lock()
            .statuses
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .cloned()
    }

    pub fn progress(self: &Arc<Self>, id: Uuid) -> SubmissionProgress {
        SubmissionProgress {
            tracker: Arc::clone(self),
            id,
        }
    }

    fn update(&self, id: Uuid, stage: WorkflowStage, status_text: &str) {
        let mut inner = self.lock();
        if let Some(status) = inner.statuses.get_mut(&id) {
            // Terminal stages absorb; nothing moves a finished submission.
            if status.stage.is_terminal() {
                return;
            }
            status.stage = stage;
            status.status_text = status_text.to_string();
            status.updated_at = Utc::now();
        }
    }

    /// Records the outcome and frees the user's slot.
    pub fn finish(&self, id: Uuid, result: &Result<ResumeRecord, WorkflowError>) {
        let mut inner = self.lock();
        let Some(status) = inner.statuses.get_mut(&id) else {
            return;
        };

        match result {
            Ok(record) => {
                status.stage = WorkflowStage::Complete;
                status.status_text = WorkflowStage::Complete.status_text().to_string();
                status.resume_id = Some(record.id);
                status.redirect_to = Some(results_path(record.id));
            }
            Err(e) => fail(status, e.to_string()),
        }
        status.updated_at = Utc::now();

        let user_id = status.user_id.clone();
        inner.active_users.remove(&user_id);
    }

    /// Ends a run that stopped without producing a result (the task panicked
    /// or was cancelled) and frees the user's slot.
    pub fn abort(&self, id: Uuid, message: &str) {
        let mut inner = self.lock();
        let Some(status) = inner.statuses.get_mut(&id) else {
            return;
        };
        if !status.stage.is_terminal() {
            fail(status, message.to_string());
            status.updated_at = Utc::now();
        }

        let user_id = status.user_id.clone();
        inner.active_users.remove(&user_id);
    }
}

fn fail(status: &mut SubmissionStatus, message: String) {
    status.stage = WorkflowStage::Failed;
    status.status_text = format!("Error: {message}");
    status.error = Some(message);
}

fn prune(inner: &mut Inner, now: DateTime<Utc>) {
    let cutoff = now - Duration::minutes(RETENTION_MINUTES);
    inner
        .statuses
        .retain(|_, s| !s.stage.is_terminal() || s.updated_at > cutoff);
}

/// Progress sink bound to one submission.
pub struct SubmissionProgress {
    tracker: Arc<SubmissionTracker>,
    id: Uuid,
}

impl ProgressSink for SubmissionProgress {
    fn report(&self, stage: WorkflowStage, status_text: &str) {
        // The final state is written by `finish`, which also frees the slot.
        if stage.is_terminal() {
            return;
        }
        self.tracker.update(self.id, stage, status_text);
    }
}
