//! PDF → PNG preview conversion.
//!
//! The PDFium library is bound on the first conversion rather than at startup,
//! so a process that never converts a file never loads it. A failed load is
//! not cached; the next conversion tries again.

pub mod pdfium;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::storage::FileBlob;

pub use pdfium::PdfiumRenderer;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("PDF renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("Failed to load PDF: {0}")]
    PdfLoad(String),

    #[error("PDF is password protected")]
    PdfEncrypted,

    #[error("Rendering failed: {0}")]
    Rendering(String),

    #[error("Image encoding failed: {0}")]
    ImageEncoding(String),
}

/// Renders the first page of a PDF document to PNG bytes. Blocking.
pub trait PageRenderer: Send + Sync {
    fn render_first_page(&self, pdf_bytes: &[u8]) -> Result<Vec<u8>, ConversionError>;
}

/// Result of a conversion attempt. `file` is `None` whenever no image was
/// produced, with `error` carrying the diagnostic.
#[derive(Debug, Clone, Default)]
pub struct ConversionOutcome {
    pub file: Option<FileBlob>,
    pub error: Option<String>,
}

impl ConversionOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            file: None,
            error: Some(message.into()),
        }
    }
}

#[async_trait]
pub trait PdfConverter: Send + Sync {
    async fn convert(&self, pdf: &FileBlob) -> ConversionOutcome;
}

type RendererLoader =
    Box<dyn Fn() -> Result<Arc<dyn PageRenderer>, ConversionError> + Send + Sync>;

/// Converter that builds its renderer on first use.
pub struct LazyPdfConverter {
    loader: Arc<RendererLoader>,
    renderer: OnceCell<Arc<dyn PageRenderer>>,
}

impl LazyPdfConverter {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn PageRenderer>, ConversionError> + Send + Sync + 'static,
    {
        Self {
            loader: Arc::new(Box::new(loader)),
            renderer: OnceCell::new(),
        }
    }

    async fn renderer(&self) -> Result<Arc<dyn PageRenderer>, ConversionError> {
        self.renderer
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| ConversionError::RendererUnavailable(e.to_string()))?
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl PdfConverter for LazyPdfConverter {
    async fn convert(&self, pdf: &FileBlob) -> ConversionOutcome {
        let renderer = match self.renderer().await {
            Ok(r) => r,
            Err(e) => {
                warn!("PDF renderer could not be loaded: {e}");
                return ConversionOutcome::failed(format!("Failed to convert PDF: {e}"));
            }
        };

        let bytes = pdf.bytes.clone();
        let rendered = tokio::task::spawn_blocking(move || renderer.render_first_page(&bytes))
            .await
            .map_err(|e| ConversionError::Rendering(e.to_string()))
            .and_then(|r| r);

        match rendered {
            Ok(png) if png.is_empty() => ConversionOutcome::failed("Failed to create image blob"),
            Ok(png) => {
                debug!(
                    pdf_size = pdf.bytes.len(),
                    png_size = png.len(),
                    "Rendered preview for {}",
                    pdf.name
                );
                ConversionOutcome {
                    file: Some(FileBlob::new(
                        preview_file_name(&pdf.name),
                        "image/png",
                        Bytes::from(png),
                    )),
                    error: None,
                }
            }
            Err(e) => ConversionOutcome::failed(format!("Failed to convert PDF: {e}")),
        }
    }
}

/// `resume.pdf` → `resume.png`; names without a `.pdf` extension get `.png` appended.
pub fn preview_file_name(pdf_name: &str) -> String {
    let lower = pdf_name.to_ascii_lowercase();
    let stem = if lower.ends_with(".pdf") {
        &pdf_name[..pdf_name.len() - 4]
    } else {
        pdf_name
    };
    format!("{stem}.png")
}
