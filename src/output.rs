//! Output types returned by the conversion entry points.
//!
//! Everything here is `serde`-serialisable so callers can log a full
//! [`ConversionOutcome`] as JSON, persist it next to the output document, or
//! ship it over a channel to a UI process.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of a successful conversion.
///
/// "Successful" means an output document was produced — individual pages may
/// still have failed OCR (check [`ConversionStats::failed_pages`]); the
/// pipeline falls back to the original PDF rather than failing the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// Path of the produced editable document.
    pub output_path: PathBuf,
    /// Whether the converter consumed the OCR-enhanced PDF (true) or the
    /// original input (false).
    pub ocr_applied: bool,
    /// Why OCR was skipped or abandoned, when `ocr_applied` is false and OCR
    /// had been requested.
    pub fallback_reason: Option<String>,
    /// Per-page OCR reports, empty when the pipeline never ran.
    pub pages: Vec<PageReport>,
    /// Aggregate statistics.
    pub stats: ConversionStats,
}

/// Aggregate statistics for one conversion job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Page count of the source document (0 when OCR never ran).
    pub total_pages: usize,
    /// Pages that produced a searchable fragment.
    pub recognized_pages: usize,
    /// Pages that failed and were omitted from the merged PDF.
    pub failed_pages: usize,
    /// Pages that failed but were kept as image-only pages
    /// ([`crate::config::FailedPagePolicy::KeepOriginal`]).
    pub fallback_pages: usize,
    /// Wall-clock time spent in the OCR pipeline.
    pub ocr_duration_ms: u64,
    /// Wall-clock time spent in the external document converter.
    pub convert_duration_ms: u64,
    /// Total wall-clock time for the job.
    pub total_duration_ms: u64,
}

/// Outcome of one page's trip through the OCR pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-indexed page number.
    pub page_num: usize,
    /// What ended up in the merged document for this page.
    pub status: PageStatus,
    /// Wall-clock time for this page (render + preprocess + recognize + merge).
    pub duration_ms: u64,
    /// The page-scoped error, for `Failed` and `Fallback` pages.
    pub error: Option<PageError>,
}

/// Disposition of a page in the merged output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageStatus {
    /// Searchable fragment merged.
    Recognized,
    /// OCR failed; the rendered page image was merged without a text layer.
    Fallback,
    /// OCR failed; the page was omitted from the merged output.
    Failed,
}

/// PDF document metadata, extracted without rendering any page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_round_trips_through_json() {
        let outcome = ConversionOutcome {
            output_path: PathBuf::from("/tmp/scan.docx"),
            ocr_applied: true,
            fallback_reason: None,
            pages: vec![PageReport {
                page_num: 1,
                status: PageStatus::Recognized,
                duration_ms: 1234,
                error: None,
            }],
            stats: ConversionStats {
                total_pages: 1,
                recognized_pages: 1,
                ..Default::default()
            },
        };

        let json = serde_json::to_string(&outcome).expect("serialise");
        let back: ConversionOutcome = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back.pages.len(), 1);
        assert_eq!(back.pages[0].status, PageStatus::Recognized);
        assert!(back.ocr_applied);
    }

    #[test]
    fn failed_page_carries_error() {
        let report = PageReport {
            page_num: 2,
            status: PageStatus::Failed,
            duration_ms: 10,
            error: Some(PageError::RecognitionFailed {
                page: 2,
                detail: "engine exited 1".into(),
            }),
        };
        let json = serde_json::to_string(&report).expect("serialise");
        assert!(json.contains("RecognitionFailed"));
    }
}
