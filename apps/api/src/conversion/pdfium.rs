//! First-page preview rendering via Google PDFium.
//!
//! `PdfiumRenderer` holds no library handle: the upstream `Pdfium` type is
//! `!Send`, so every render binds the library again. The OS caches the
//! `dlopen`, making repeat binds cheap.

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::{ConversionError, PageRenderer};

/// Upper bound on either side of the rendered preview.
const MAX_DIMENSION_PX: u32 = 4096;

pub struct PdfiumRenderer {
    library_path: Option<String>,
    scale: f32,
}

impl PdfiumRenderer {
    /// Creates a renderer and verifies the library can be bound.
    ///
    /// Discovery order: the explicit `library_path`, then next to the running
    /// executable, then the system library search path.
    pub fn new(library_path: Option<String>, scale: f32) -> Result<Self, ConversionError> {
        let renderer = Self {
            library_path,
            scale: if scale > 0.0 { scale } else { 1.0 },
        };
        let _ = renderer.bind()?;
        Ok(renderer)
    }

    fn bind(&self) -> Result<Pdfium, ConversionError> {
        if let Some(path) = &self.library_path {
            debug!(path = %path, "Binding PDFium from configured path");
            let bindings = Pdfium::bind_to_library(path).map_err(|e| {
                ConversionError::RendererUnavailable(format!("Failed to load PDFium from {path}: {e}"))
            })?;
            return Ok(Pdfium::new(bindings));
        }

        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                debug!(dir = %dir.display(), "Bound PDFium next to executable");
                return Ok(Pdfium::new(bindings));
            }
        }

        let bindings = Pdfium::bind_to_system_library().map_err(|e| {
            ConversionError::RendererUnavailable(format!(
                "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
            ))
        })?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_first_page(&self, pdf_bytes: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(map_load_error)?;

        let pages = document.pages();
        let page = pages
            .get(0)
            .map_err(|_| ConversionError::Rendering("PDF has no pages".to_string()))?;

        let (target_w, target_h) =
            compute_render_dimensions(page.width().value, page.height().value, self.scale);

        let config = PdfRenderConfig::new()
            .set_target_width(target_w as i32)
            .set_maximum_height(target_h as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| ConversionError::Rendering(e.to_string()))?;

        // Go through raw RGBA so our `image` version need not match pdfium-render's.
        let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
        let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(|| {
            ConversionError::ImageEncoding(format!("bitmap buffer does not match {width}x{height}"))
        })?;

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| ConversionError::ImageEncoding(e.to_string()))?;

        let png_bytes = cursor.into_inner();
        debug!(
            width,
            height,
            png_size = png_bytes.len(),
            "Rendered first PDF page to PNG"
        );
        Ok(png_bytes)
    }
}

fn map_load_error(e: PdfiumError) -> ConversionError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ConversionError::PdfEncrypted
    } else {
        ConversionError::PdfLoad(msg)
    }
}

/// Pixel size for a page of `width_points` × `height_points` at `scale`,
/// capped to `MAX_DIMENSION_PX` on the longer side with aspect ratio kept.
fn compute_render_dimensions(width_points: f32, height_points: f32, scale: f32) -> (u32, u32) {
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        let h = ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        warn!(
            raw_width = raw_w as u32,
            raw_height = raw_h as u32,
            "Preview capped to {w}x{h}"
        );
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}
