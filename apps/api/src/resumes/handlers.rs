use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{ResumeRecord, ResumeSummary};
use crate::state::AppState;
use crate::storage::StorageError;

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeSummary>>, AppError> {
    let records = state.resumes.list().await?;
    Ok(Json(records.iter().map(ResumeRecord::summary).collect()))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeRecord>, AppError> {
    state
        .resumes
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

/// GET /api/v1/files/*path
///
/// Serves a stored upload or preview by the path kept in its resume record
/// (`resumePath`, `imagePath`).
pub async fn handle_get_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let path = path.trim_start_matches('/');
    let file = state.blobs.download(path).await.map_err(|e| match e {
        StorageError::Missing(p) => AppError::NotFound(format!("File {p} not found")),
        other => AppError::Storage(other),
    })?;

    Ok(([(header::CONTENT_TYPE, file.content_type)], file.bytes))
}
