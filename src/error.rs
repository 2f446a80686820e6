//! Error types for the searchify library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SearchifyError`] — **Fatal**: the conversion cannot proceed at all
//!   (bad input file, corrupt PDF, document converter missing). Returned as
//!   `Err(SearchifyError)` from the top-level `convert*` functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (render glitch,
//!   engine hiccup) but all other pages are fine. Stored inside
//!   [`crate::output::PageReport`] so callers can inspect partial success
//!   rather than losing the whole document to one bad page.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! page failure, log and continue, or collect all errors for a post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the searchify library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum SearchifyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    // ── OCR pipeline errors ───────────────────────────────────────────────
    /// The Tesseract binary could not be found or probed.
    ///
    /// Non-fatal at the facade level: `convert` logs a warning and proceeds
    /// with the original, unenhanced PDF. Fatal only for callers that
    /// explicitly request an OCR-only run ([`crate::ocr::make_searchable`]).
    #[error("OCR engine unavailable: {detail}\nInstall tesseract or set TESSERACT_PATH.")]
    EngineUnavailable { detail: String },

    /// Every page failed; the merged document would be empty.
    #[error("All {total} pages failed OCR.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    /// The merged searchable PDF could not be written to disk.
    #[error("Failed to write merged PDF '{path}': {detail}")]
    MergeWriteFailed { path: PathBuf, detail: String },

    /// The job was cancelled via the configured cancel flag.
    #[error("Conversion cancelled")]
    Cancelled,

    // ── Document conversion errors ────────────────────────────────────────
    /// No document converter is configured and none could be discovered.
    #[error("No document converter available.\n{hint}")]
    ConverterNotConfigured { hint: String },

    /// The external document converter failed.
    #[error("Document conversion failed for '{path}': {detail}")]
    DocumentConversionFailed { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_DYNAMIC_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored inside [`crate::output::PageReport`] when a page fails. The overall
/// pipeline continues unless ALL pages fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Image preprocessing failed.
    #[error("Page {page}: preprocessing failed: {detail}")]
    PreprocessFailed { page: usize, detail: String },

    /// The OCR engine did not produce a searchable fragment.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// The fragment was produced but could not be appended to the output.
    #[error("Page {page}: fragment merge failed: {detail}")]
    MergeFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::PreprocessFailed { page, .. }
            | PageError::RecognitionFailed { page, .. }
            | PageError::MergeFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pages_failed_display() {
        let e = SearchifyError::AllPagesFailed {
            total: 10,
            first_error: "page 1: boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 10 pages"), "got: {msg}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn engine_unavailable_mentions_override() {
        let e = SearchifyError::EngineUnavailable {
            detail: "not found".into(),
        };
        assert!(e.to_string().contains("TESSERACT_PATH"));
    }

    #[test]
    fn merge_write_failed_display() {
        let e = SearchifyError::MergeWriteFailed {
            path: PathBuf::from("/tmp/out.pdf"),
            detail: "disk full".into(),
        };
        assert!(e.to_string().contains("/tmp/out.pdf"));
        assert!(e.to_string().contains("disk full"));
    }

    #[test]
    fn page_error_reports_page_number() {
        let e = PageError::RecognitionFailed {
            page: 3,
            detail: "engine exited 1".into(),
        };
        assert_eq!(e.page(), 3);
        assert!(e.to_string().contains("Page 3"));
    }

    #[test]
    fn page_error_serialises() {
        let e = PageError::RenderFailed {
            page: 2,
            detail: "bad xref".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("RenderFailed"));
    }
}
