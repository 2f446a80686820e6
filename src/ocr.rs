//! The OCR pipeline orchestrator: drive render → preprocess → recognize →
//! merge for every page of a source document.
//!
//! ## Shape of a job
//!
//! ```text
//! open source ──▶ page 1 ──▶ page 2 ──▶ … ──▶ write merged PDF
//!                 │
//!                 ├─ rasterise (pdfium, 2.0×)
//!                 ├─ preprocess (binarise + denoise)
//!                 ├─ recognise (tesseract → one-page fragment)
//!                 └─ merge (append fragment in source order)
//! ```
//!
//! Pages are processed strictly sequentially: fragments must merge in source
//! order and each engine invocation is itself a blocking, single-threaded
//! call. The whole loop therefore runs inside one `spawn_blocking` section;
//! per-page parallelism would buy nothing and cost ordering.
//!
//! ## Failure policy
//!
//! A failure at any stage of page *i* is page-scoped: it is logged, reported
//! through the progress callback, and the loop continues with page *i+1*.
//! What lands in the output for a failed page is governed by
//! [`FailedPagePolicy`]: nothing (default), or the rendered page image
//! without a text layer. Only three things abort the whole job: a source
//! document that cannot be opened, a merged write that fails, and
//! cancellation.
//!
//! Per-page artifacts (rendered image, processed image, fragment file) are
//! created and dropped within a single iteration; fragment files live in a
//! per-job `TempDir`, so even the failure paths cannot leak them past the
//! job.

use crate::config::{ConversionConfig, FailedPagePolicy};
use crate::engine::{EngineConfig, TesseractEngine};
use crate::error::{PageError, SearchifyError};
use crate::output::{PageReport, PageStatus};
use crate::pipeline::{merge, merge::PdfMerger, preprocess, render};
use pdfium_render::prelude::*;
use std::path::Path;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Summary of one OCR pipeline run.
#[derive(Debug, Clone)]
pub struct OcrReport {
    /// Page count of the source document.
    pub total_pages: usize,
    /// One report per source page, in page order.
    pub pages: Vec<PageReport>,
}

impl OcrReport {
    /// Pages that produced a searchable fragment.
    pub fn recognized(&self) -> usize {
        self.count(PageStatus::Recognized)
    }

    /// Pages kept as image-only fallbacks.
    pub fn fallback(&self) -> usize {
        self.count(PageStatus::Fallback)
    }

    /// Pages omitted from the merged output.
    pub fn failed(&self) -> usize {
        self.count(PageStatus::Failed)
    }

    fn count(&self, status: PageStatus) -> usize {
        self.pages.iter().filter(|p| p.status == status).count()
    }
}

/// Run the OCR pipeline and write a searchable PDF to `output_path`.
///
/// Unlike [`crate::convert`], this entry point does not fall back to the
/// original document: an unavailable engine is an error here, because the
/// caller asked specifically for a searchable PDF.
pub async fn make_searchable(
    input: &Path,
    output_path: &Path,
    config: &ConversionConfig,
) -> Result<OcrReport, SearchifyError> {
    let engine = resolve_engine(config)?;
    let pdf_path = input.to_path_buf();
    let out_path = output_path.to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || {
        run_pipeline_blocking(&pdf_path, &out_path, &engine, &config)
    })
    .await
    .map_err(|e| SearchifyError::Internal(format!("OCR task panicked: {e}")))?
}

/// Resolve the OCR engine: an explicitly configured [`EngineConfig`] wins,
/// otherwise discovery runs. Either way the binary is probed once before the
/// pipeline starts — engine availability is a job-level decision, not a
/// per-page one.
pub(crate) fn resolve_engine(
    config: &ConversionConfig,
) -> Result<TesseractEngine, SearchifyError> {
    let engine = TesseractEngine::new(engine_config_for(config)?);
    if !engine.is_available() {
        return Err(SearchifyError::EngineUnavailable {
            detail: format!(
                "'{}' did not answer --version",
                engine.config().binary.display()
            ),
        });
    }
    Ok(engine)
}

/// Explicit config wins over discovery; either way the `--dpi` hint is kept
/// in step with the renderer's effective resolution, or the fragment pages
/// would come out a different physical size than the source.
fn engine_config_for(config: &ConversionConfig) -> Result<EngineConfig, SearchifyError> {
    let mut engine_config = match config.engine {
        Some(ref c) => c.clone(),
        None => EngineConfig::discover().ok_or_else(|| SearchifyError::EngineUnavailable {
            detail: "no tesseract binary found".to_string(),
        })?,
    };
    engine_config.dpi = (72.0 * config.zoom).round() as u32;
    Ok(engine_config)
}

/// Blocking pipeline body. Everything pdfium and every subprocess call lives
/// here, on a blocking worker thread.
pub(crate) fn run_pipeline_blocking(
    pdf_path: &Path,
    output_path: &Path,
    engine: &TesseractEngine,
    config: &ConversionConfig,
) -> Result<OcrReport, SearchifyError> {
    let filename = pdf_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let pdfium = render::bind_pdfium()?;
    let document = render::load_document(&pdfium, pdf_path)?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("OCR pipeline: {total_pages} page(s) from {filename}");

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total_pages);
    }

    let fragment_dir =
        TempDir::new().map_err(|e| SearchifyError::Internal(format!("fragment dir: {e}")))?;
    let mut merger = PdfMerger::new();
    let mut reports: Vec<PageReport> = Vec::with_capacity(total_pages);
    let mut first_error: Option<String> = None;

    for (index, page) in pages.iter().enumerate() {
        let page_num = index + 1;

        if config.is_cancelled() {
            info!("cancellation requested; stopping before page {page_num}");
            return Err(SearchifyError::Cancelled);
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, total_pages);
        }
        let started = Instant::now();

        let (status, error) =
            process_page(&page, page_num, engine, config, fragment_dir.path(), &mut merger);

        if let Some(ref err) = error {
            if first_error.is_none() {
                first_error = Some(err.to_string());
            }
        }

        if let Some(ref cb) = config.progress_callback {
            match &error {
                Some(err) => cb.on_page_error(page_num, total_pages, &err.to_string()),
                None => cb.on_page_complete(page_num, total_pages, &filename),
            }
        }

        reports.push(PageReport {
            page_num,
            status,
            duration_ms: started.elapsed().as_millis() as u64,
            error,
        });
    }

    let recognized = reports
        .iter()
        .filter(|r| r.status == PageStatus::Recognized)
        .count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(total_pages, recognized);
    }

    if merger.page_count() == 0 {
        return Err(SearchifyError::AllPagesFailed {
            total: total_pages,
            first_error: first_error.unwrap_or_else(|| "document has no pages".to_string()),
        });
    }

    match merger.write(output_path) {
        Ok(count) => {
            info!(
                "merged searchable PDF: {count} page(s) → {}",
                output_path.display()
            );
        }
        Err(err) => {
            // Job-fatal: make sure no partial output file survives.
            if output_path.exists() {
                let _ = std::fs::remove_file(output_path);
            }
            return Err(err);
        }
    }

    Ok(OcrReport {
        total_pages,
        pages: reports,
    })
}

/// Take one page through render → preprocess → recognize → merge.
///
/// Returns the page's disposition and the error (if any) that decided it.
/// A `Fallback` status still carries the original error so callers can see
/// why the page lost its text layer.
fn process_page(
    page: &PdfPage,
    page_num: usize,
    engine: &TesseractEngine,
    config: &ConversionConfig,
    fragment_dir: &Path,
    merger: &mut PdfMerger,
) -> (PageStatus, Option<PageError>) {
    let rendered = match render::rasterize_page(page, config.zoom) {
        Ok(image) => image,
        Err(detail) => {
            let err = PageError::RenderFailed {
                page: page_num,
                detail,
            };
            warn!("{err}");
            return (PageStatus::Failed, Some(err));
        }
    };

    let fragment_path = fragment_dir.join(format!("page_{page_num:04}.pdf"));

    let recognized = preprocess::preprocess_page(&rendered)
        .map_err(|detail| PageError::PreprocessFailed {
            page: page_num,
            detail,
        })
        .and_then(|processed| {
            engine
                .create_searchable_page(&processed, &fragment_path, &config.language)
                .then_some(())
                .ok_or_else(|| PageError::RecognitionFailed {
                    page: page_num,
                    detail: "engine did not produce a fragment".to_string(),
                })
        })
        .and_then(|()| {
            merger
                .append_file(&fragment_path)
                .map(|_| ())
                .map_err(|detail| PageError::MergeFailed {
                    page: page_num,
                    detail,
                })
        });

    match recognized {
        Ok(()) => {
            remove_fragment(&fragment_path);
            (PageStatus::Recognized, None)
        }
        Err(err) => {
            warn!("{err}");
            remove_fragment(&fragment_path);

            if config.failed_page_policy == FailedPagePolicy::KeepOriginal {
                let kept = merge::write_image_page(&rendered, config.zoom, &fragment_path)
                    .and_then(|()| merger.append_file(&fragment_path).map(|_| ()));
                remove_fragment(&fragment_path);
                match kept {
                    Ok(()) => {
                        debug!("page {page_num}: kept original image without text layer");
                        return (PageStatus::Fallback, Some(err));
                    }
                    Err(detail) => {
                        warn!("page {page_num}: image fallback failed: {detail}");
                    }
                }
            }

            (PageStatus::Failed, Some(err))
        }
    }
}

/// Fragments are deleted as soon as they are merged; deletion failures are
/// logged, never escalated — the per-job `TempDir` sweeps leftovers anyway.
fn remove_fragment(path: &Path) {
    if path.exists() {
        if let Err(err) = std::fs::remove_file(path) {
            warn!("could not remove fragment '{}': {err}", path.display());
        }
    }
}
