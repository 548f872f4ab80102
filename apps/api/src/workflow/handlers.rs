//! Axum route handlers for submitting resumes and polling their progress.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::storage::FileBlob;
use crate::submissions::SubmissionStatus;
use crate::state::AppState;
use crate::workflow::{UploadRequest, WorkflowStage};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    pub submission_id: Uuid,
    pub status_text: String,
}

/// POST /api/v1/uploads
///
/// Multipart form: `company-name`, `job-title`, `job-description`, `file`.
/// Starts the workflow in the background and returns the submission id to poll.
pub async fn handle_upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadAccepted>), AppError> {
    let request = read_upload_form(multipart).await?;

    let submission_id = state.submissions.begin(&user.id).ok_or_else(|| {
        AppError::Conflict("An analysis is already running for this account".to_string())
    })?;
    info!(
        "Accepted submission {submission_id} from {} ({} bytes)",
        user.id,
        request.file.bytes.len()
    );

    let workflow = state.workflow.clone();
    let tracker = state.submissions.clone();
    tokio::spawn(async move {
        let run = tokio::spawn({
            let tracker = tracker.clone();
            async move {
                let progress = tracker.progress(submission_id);
                workflow.analyze(request, &progress).await
            }
        });

        match run.await {
            Ok(result) => tracker.finish(submission_id, &result),
            Err(e) => {
                error!("Submission {submission_id} stopped unexpectedly: {e}");
                tracker.abort(submission_id, "Analysis stopped unexpectedly");
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAccepted {
            submission_id,
            status_text: WorkflowStage::Uploading.status_text().to_string(),
        }),
    ))
}

/// GET /api/v1/uploads/:submission_id
pub async fn handle_upload_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(submission_id): Path<Uuid>,
) -> Result<Json<SubmissionStatus>, AppError> {
    state
        .submissions
        .status(submission_id, &user.id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Submission {submission_id} not found")))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadRequest, AppError> {
    let mut company_name = String::new();
    let mut job_title = String::new();
    let mut job_description = String::new();
    let mut file: Option<FileBlob> = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "company-name" => company_name = field.text().await.map_err(invalid_form)?,
            "job-title" => job_title = field.text().await.map_err(invalid_form)?,
            "job-description" => job_description = field.text().await.map_err(invalid_form)?,
            "file" => {
                let name = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(invalid_form)?;
                file = Some(FileBlob::new(name, content_type, bytes));
            }
            _ => {}
        }
    }

    let file = file
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::Validation("Please select a file to analyze.".to_string()))?;
    if !is_pdf(&file) {
        return Err(AppError::Validation("Only PDF files can be analyzed.".to_string()));
    }

    Ok(UploadRequest {
        company_name,
        job_title,
        job_description,
        file,
    })
}

fn invalid_form(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid upload form: {e}"))
}

fn is_pdf(file: &FileBlob) -> bool {
    file.content_type == "application/pdf" || file.name.to_ascii_lowercase().ends_with(".pdf")
}
