//! PDF rasterisation: render pages to `DynamicImage` via pdfium.
//!
//! ## Why a fixed oversampling factor?
//!
//! Recognition accuracy degrades sharply below ~150 DPI. Rendering at 2.0×
//! turns a typical 72 DPI page into a ~144 DPI bitmap — sharp enough for the
//! engine to read reliably, while keeping per-page pixel counts (and the
//! engine's runtime) bounded. The factor applies to both axes, so pixel count
//! quadruples; that trade-off is deliberate.
//!
//! ## Why no async here?
//!
//! pdfium wraps a C++ library with thread-local state; it must not be called
//! from async contexts. The orchestrator runs the whole per-page loop inside
//! one `tokio::task::spawn_blocking` section and calls these functions from
//! there. Only [`extract_metadata`] wraps its own blocking task, because it
//! is also used by the async `inspect` entry point.

use crate::error::SearchifyError;
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Bind to a pdfium library: a copy next to the executable first, then the
/// system-wide install. `PDFIUM_DYNAMIC_LIB_PATH` is honoured by the binding
/// layer itself.
pub fn bind_pdfium() -> Result<Pdfium, SearchifyError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| SearchifyError::PdfiumBindingFailed(format!("{e:?}")))
}

/// Open a source PDF, mapping parse failures to [`SearchifyError::CorruptPdf`].
pub fn load_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
) -> Result<PdfDocument<'a>, SearchifyError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| SearchifyError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{e:?}"),
        })
}

/// Rasterise a single page at the given oversampling factor.
///
/// Page dimensions are in PDF points (1/72 inch), so the target pixel size is
/// `points × zoom`. Errors are returned as a plain detail string; the
/// orchestrator attaches the page number and wraps them in a
/// [`crate::error::PageError`].
pub fn rasterize_page(page: &PdfPage, zoom: f32) -> Result<DynamicImage, String> {
    let width_px = (page.width().value * zoom).round().max(1.0) as i32;
    let height_px = (page.height().value * zoom).round().max(1.0) as i32;

    let render_config = PdfRenderConfig::new()
        .set_target_width(width_px)
        .set_target_height(height_px);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| format!("{e:?}"))?;

    let image = bitmap.as_image();
    debug!("rendered page → {}x{} px", image.width(), image.height());
    Ok(image)
}

/// Extract document metadata from a PDF without rendering pages.
pub async fn extract_metadata(pdf_path: &Path) -> Result<DocumentMetadata, SearchifyError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path))
        .await
        .map_err(|e| SearchifyError::Internal(format!("Metadata task panicked: {}", e)))?
}

/// Blocking implementation of metadata extraction.
fn extract_metadata_blocking(pdf_path: &Path) -> Result<DocumentMetadata, SearchifyError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, pdf_path)?;

    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: pages.len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}
