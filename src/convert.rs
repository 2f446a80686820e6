//! Conversion entry points: scanned PDF in, editable document out.
//!
//! ## Why OCR never blocks the base conversion
//!
//! The OCR pipeline is an *enhancement* step. When the engine is missing, or
//! the pipeline fails partway, the right user experience is a plain
//! conversion of the original PDF with a logged warning — not a failed job.
//! `convert` therefore treats every OCR-level problem (except cancellation)
//! as a reason to fall back, and only converter-level problems as fatal.
//!
//! ## Temp-file contract
//!
//! The OCR-enhanced PDF is written to a uniquely-named temp file inside the
//! output folder (`<stem>-ocr-<salt>.pdf`, via [`tempfile::Builder`]) and is
//! removed on every exit path — success, conversion error, or OCR error —
//! because the handle's Drop does the deletion. Two jobs against the same
//! folder can never collide on temp names.

use crate::config::ConversionConfig;
use crate::converter::{DocumentConverter, LibreOfficeConverter};
use crate::error::SearchifyError;
use crate::ocr::{self, OcrReport};
use crate::output::{ConversionOutcome, ConversionStats, DocumentMetadata};
use crate::pipeline::{input, render};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Convert a PDF file or URL into an editable document in `output_dir`.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_str`  — Local file path or HTTP/HTTPS URL to a PDF
/// * `output_dir` — Folder receiving `<stem>.docx` (extension decided by the
///   configured converter); created if absent
/// * `config`     — Conversion configuration
///
/// # Returns
/// `Ok(ConversionOutcome)` when an output document was produced, even if OCR
/// was skipped or individual pages failed (check `outcome.ocr_applied` and
/// `outcome.stats`).
///
/// # Errors
/// Returns `Err(SearchifyError)` only for fatal errors:
/// - Input not found / not a PDF / download failure
/// - No document converter available, or the converter failed
/// - Cancellation
pub async fn convert(
    input_str: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutcome, SearchifyError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    let output_dir = output_dir.as_ref();
    info!("Starting conversion: {input_str}");

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let stem = resolved.stem();

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| SearchifyError::OutputWriteFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

    // ── Step 2: OCR pre-processing, or fallback ──────────────────────────
    // The temp PDF handle lives in this scope so that every exit path below
    // — including early returns — deletes the file when the handle drops.
    let mut source_path = resolved.path().to_path_buf();
    let mut ocr_temp: Option<tempfile::NamedTempFile> = None;
    let mut ocr_report: Option<OcrReport> = None;
    let mut fallback_reason: Option<String> = None;
    let mut ocr_duration_ms = 0u64;

    if config.use_ocr {
        match ocr::resolve_engine(config) {
            Ok(engine) => {
                info!("OCR enabled: pre-processing pages (this may take a while)");
                let ocr_start = Instant::now();

                let temp = tempfile::Builder::new()
                    .prefix(&format!("{stem}-ocr-"))
                    .suffix(".pdf")
                    .tempfile_in(output_dir)
                    .map_err(|e| {
                        SearchifyError::Internal(format!("could not create temp PDF: {e}"))
                    })?;

                let pdf_path = source_path.clone();
                let temp_path = temp.path().to_path_buf();
                let pipeline_config = config.clone();
                let run = tokio::task::spawn_blocking(move || {
                    ocr::run_pipeline_blocking(&pdf_path, &temp_path, &engine, &pipeline_config)
                })
                .await
                .map_err(|e| SearchifyError::Internal(format!("OCR task panicked: {e}")))?;

                ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

                match run {
                    Ok(report) => {
                        info!(
                            "OCR pre-processing complete: {}/{} page(s) recognized",
                            report.recognized(),
                            report.total_pages
                        );
                        source_path = temp.path().to_path_buf();
                        ocr_temp = Some(temp);
                        ocr_report = Some(report);
                    }
                    // The user asked to stop; that is not a fallback case.
                    Err(SearchifyError::Cancelled) => return Err(SearchifyError::Cancelled),
                    Err(err) => {
                        warn!("OCR pipeline failed: {err}; falling back to the original PDF");
                        fallback_reason = Some(err.to_string());
                    }
                }
            }
            Err(err) => {
                warn!("{err}; skipping OCR");
                fallback_reason = Some(err.to_string());
            }
        }
    }

    // ── Step 3: Document conversion ──────────────────────────────────────
    let converter = resolve_converter(config)?;
    let output_path = output_dir.join(format!("{stem}.{}", converter.output_extension()));

    let convert_start = Instant::now();
    let conv_source = source_path.clone();
    let conv_output = output_path.clone();
    let conv = Arc::clone(&converter);
    tokio::task::spawn_blocking(move || conv.convert_document(&conv_source, &conv_output))
        .await
        .map_err(|e| SearchifyError::Internal(format!("conversion task panicked: {e}")))?
        .map_err(|e| SearchifyError::DocumentConversionFailed {
            path: source_path,
            detail: e.to_string(),
        })?;
    let convert_duration_ms = convert_start.elapsed().as_millis() as u64;

    // ── Step 4: Assemble the outcome ─────────────────────────────────────
    let ocr_applied = ocr_report.is_some();
    let (total_pages, recognized, failed, fallback, pages) = match ocr_report {
        Some(report) => (
            report.total_pages,
            report.recognized(),
            report.failed(),
            report.fallback(),
            report.pages,
        ),
        None => (0, 0, 0, 0, Vec::new()),
    };

    let stats = ConversionStats {
        total_pages,
        recognized_pages: recognized,
        failed_pages: failed,
        fallback_pages: fallback,
        ocr_duration_ms,
        convert_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!("Finished: {}", output_path.display());

    // `ocr_temp` (and any downloaded input) drop here, deleting the temp PDF.
    Ok(ConversionOutcome {
        output_path,
        ocr_applied,
        fallback_reason,
        pages,
        stats,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutcome, SearchifyError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SearchifyError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(convert(input_str, output_dir, config))
}

/// Extract PDF metadata without converting content.
///
/// Does not require the OCR engine or a document converter.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, SearchifyError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    render::extract_metadata(resolved.path()).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the document converter, from most-specific to least-specific:
///
/// 1. **Pre-built converter** (`config.converter`) — the caller constructed
///    one; used as-is. This is also how tests inject mocks.
/// 2. **Discovered LibreOffice** — `SOFFICE_PATH`, well-known install
///    locations, then `soffice` on PATH.
fn resolve_converter(
    config: &ConversionConfig,
) -> Result<Arc<dyn DocumentConverter>, SearchifyError> {
    if let Some(ref converter) = config.converter {
        return Ok(Arc::clone(converter));
    }

    LibreOfficeConverter::discover()
        .map(|c| Arc::new(c) as Arc<dyn DocumentConverter>)
        .ok_or_else(|| SearchifyError::ConverterNotConfigured {
            hint: "Install LibreOffice (soffice) or inject a DocumentConverter via \
                   ConversionConfig::builder().converter(...)."
                .to_string(),
        })
}
