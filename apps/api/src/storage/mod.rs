//! External storage collaborators: blob storage for uploaded files and a
//! key-value store for resume records. Both sit behind traits so the workflow
//! never talks to S3 or Redis directly.

pub mod blob;
pub mod kv;

use bytes::Bytes;
use thiserror::Error;

pub use blob::{BlobStore, S3BlobStore};
pub use kv::{KvStore, RedisKvStore};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Object not found: {0}")]
    Missing(String),
}

/// A file held in memory: the user's PDF or its rendered preview.
#[derive(Debug, Clone)]
pub struct FileBlob {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl FileBlob {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
