use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::{FileBlob, StorageError};

/// Handle returned by the blob store for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub path: String,
}

/// Blob storage for uploaded resumes and their previews.
///
/// `upload` returns `Ok(None)` when the store accepted the request but handed
/// back no usable handle; callers treat that the same as a failed upload.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, file: &FileBlob) -> Result<Option<StoredFile>, StorageError>;

    /// Fetches a stored file. An unknown path is `StorageError::Missing`.
    async fn download(&self, path: &str) -> Result<FileBlob, StorageError>;
}

/// S3 / MinIO backed blob store. Objects live under `uploads/<uuid>/<file name>`
/// and the object key doubles as the public path.
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, file: &FileBlob) -> Result<Option<StoredFile>, StorageError> {
        let key = object_key(Uuid::new_v4(), &file.name);

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes.clone()))
            .content_type(&file.content_type)
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("upload of '{key}' failed: {e}")))?;

        if output.e_tag().is_none() {
            return Ok(None);
        }

        info!(
            "Uploaded {} bytes to s3://{}/{}",
            file.bytes.len(),
            self.bucket,
            key
        );
        Ok(Some(StoredFile { path: key }))
    }

    async fn download(&self, path: &str) -> Result<FileBlob, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| download_error(path, e))?;

        let content_type = output
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(format!("reading '{path}' failed: {e}")))?
            .into_bytes();

        debug!("Downloaded {} bytes from {}", body.len(), path);
        Ok(FileBlob::new(file_name(path), content_type, body))
    }
}

fn download_error(path: &str, e: SdkError<GetObjectError>) -> StorageError {
    classify_download_error(path, e.as_service_error(), &e)
}

fn classify_download_error(
    path: &str,
    service_error: Option<&GetObjectError>,
    e: &dyn std::fmt::Display,
) -> StorageError {
    match service_error {
        Some(GetObjectError::NoSuchKey(_)) => StorageError::Missing(path.to_string()),
        _ => StorageError::S3(format!("download of '{path}' failed: {e}")),
    }
}

/// Last segment of an object key.
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Builds the object key for an upload, keeping only filename-safe characters.
fn object_key(id: Uuid, file_name: &str) -> String {
    let base = file_name.rsplit(&['/', '\\'][..]).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    let name = if cleaned.is_empty() { "file" } else { cleaned };
    format!("uploads/{id}/{name}")
}
