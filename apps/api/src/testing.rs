//! In-memory stand-ins for the external collaborators, shared by unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::conversion::{ConversionOutcome, PdfConverter};
use crate::feedback::extract::AiResponse;
use crate::feedback::service::FeedbackServiceError;
use crate::feedback::FeedbackService;
use crate::llm_client::LlmError;
use crate::storage::blob::StoredFile;
use crate::storage::{BlobStore, FileBlob, KvStore, StorageError};

#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
}

impl MemoryKvStore {
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// Blob store handing out `blob/<n>/<name>` paths. Uploads listed in
/// `no_handle_on` (1-based) return no handle.
#[derive(Default)]
pub struct MemoryBlobStore {
    files: Mutex<BTreeMap<String, FileBlob>>,
    uploads: Mutex<Vec<String>>,
    no_handle_on: Vec<usize>,
}

impl MemoryBlobStore {
    pub fn failing_on(upload_number: usize) -> Self {
        Self {
            no_handle_on: vec![upload_number],
            ..Default::default()
        }
    }

    /// Names of the files passed to `upload`, in call order.
    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, file: &FileBlob) -> Result<Option<StoredFile>, StorageError> {
        let n = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(file.name.clone());
            uploads.len()
        };
        if self.no_handle_on.contains(&n) {
            return Ok(None);
        }
        let path = format!("blob/{n}/{}", file.name);
        self.files
            .lock()
            .unwrap()
            .insert(path.clone(), file.clone());
        Ok(Some(StoredFile { path }))
    }

    async fn download(&self, path: &str) -> Result<FileBlob, StorageError> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::Missing(path.to_string()))
    }
}

/// Converter returning a fixed outcome and counting calls.
pub struct StaticConverter {
    outcome: ConversionOutcome,
    calls: AtomicUsize,
}

impl StaticConverter {
    pub fn producing_png() -> Self {
        Self {
            outcome: ConversionOutcome {
                file: Some(FileBlob::new(
                    "resume.png",
                    "image/png",
                    Bytes::from_static(b"\x89PNG"),
                )),
                error: None,
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: Option<&str>) -> Self {
        Self {
            outcome: ConversionOutcome {
                file: None,
                error: error.map(String::from),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfConverter for StaticConverter {
    async fn convert(&self, _pdf: &FileBlob) -> ConversionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

#[derive(Clone)]
pub enum Reply {
    Response(AiResponse),
    Empty,
    Fail,
    Panic,
}

/// Feedback service with a scripted reply; records each call's arguments.
pub struct ScriptedFeedback {
    reply: Reply,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedFeedback {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(Reply::Response(AiResponse::from_text(text)))
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedbackService for ScriptedFeedback {
    async fn feedback(
        &self,
        resume_path: &str,
        instructions: &str,
    ) -> Result<Option<AiResponse>, FeedbackServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((resume_path.to_string(), instructions.to_string()));
        match &self.reply {
            Reply::Response(r) => Ok(Some(r.clone())),
            Reply::Empty => Ok(None),
            Reply::Fail => Err(FeedbackServiceError::Llm(LlmError::RateLimited { retries: 3 })),
            Reply::Panic => panic!("feedback service crashed"),
        }
    }
}

pub fn pdf_file() -> FileBlob {
    FileBlob::new(
        "resume.pdf",
        "application/pdf",
        Bytes::from_static(b"%PDF-1.7 test"),
    )
}
