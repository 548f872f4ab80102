use std::sync::Arc;

use crate::auth::AuthProvider;
use crate::resumes::repository::ResumeRepository;
use crate::storage::BlobStore;
use crate::submissions::SubmissionTracker;
use crate::workflow::UploadWorkflow;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<UploadWorkflow>,
    pub resumes: ResumeRepository,
    /// Same store the workflow uploads to; backs the file download route.
    pub blobs: Arc<dyn BlobStore>,
    pub submissions: Arc<SubmissionTracker>,
    /// Pluggable authentication. Default: StaticTokenAuth from AUTH_TOKENS.
    pub auth: Arc<dyn AuthProvider>,
}
