//! # searchify
//!
//! Make scanned PDFs searchable with Tesseract OCR, then convert them to
//! editable documents.
//!
//! ## Why this crate?
//!
//! Document converters do a fine job on PDFs that already carry text, but a
//! scanned PDF is just a stack of photographs — the converter has nothing to
//! extract. This crate rebuilds the missing text layer first: every page is
//! rasterised, cleaned up for recognition (colour backgrounds and uneven
//! lighting are the usual killers), run through Tesseract, and merged back
//! into a searchable PDF that downstream tools can actually read.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       resolve local file or download from URL
//!  ├─ 2. Render      rasterise each page at 2.0× via pdfium
//!  ├─ 3. Preprocess  grayscale → adaptive threshold → denoise
//!  ├─ 4. Recognise   tesseract → one-page searchable fragment
//!  ├─ 5. Merge       append fragments in page order (lopdf)
//!  └─ 6. Convert     hand the searchable PDF to a document converter
//! ```
//!
//! Steps 2–5 are per-page and failure-tolerant: a page that cannot be
//! recognised is logged and skipped (or kept as an image-only page), never
//! the whole job. When the engine is missing entirely, step 6 simply runs on
//! the original file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use searchify::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .use_ocr(true)
//!         .language("eng")
//!         .build()?;
//!     let outcome = convert("scan.pdf", "out/", &config).await?;
//!     println!("wrote {}", outcome.output_path.display());
//!     eprintln!(
//!         "OCR: {}/{} pages recognized",
//!         outcome.stats.recognized_pages,
//!         outcome.stats.total_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! Only a searchable PDF, no document conversion:
//!
//! ```rust,no_run
//! use searchify::{make_searchable, ConversionConfig};
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConversionConfig::default();
//! let report = make_searchable(Path::new("scan.pdf"), Path::new("scan-ocr.pdf"), &config).await?;
//! eprintln!("{}/{} pages recognized", report.recognized(), report.total_pages);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `searchify` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! searchify = { version = "0.3", default-features = false }
//! ```
//!
//! ## External tools
//!
//! | Tool | Needed for | Discovery |
//! |------|-----------|-----------|
//! | `tesseract` | OCR | `TESSERACT_PATH`, well-known install dirs, `PATH` |
//! | `soffice` (LibreOffice) | default document converter | `SOFFICE_PATH`, well-known install dirs, `PATH` |
//! | pdfium | page rendering | bundled/system library, `PDFIUM_DYNAMIC_LIB_PATH` |
//!
//! Language data (`<code>.traineddata`) is resolved once per job: a bundled
//! `tessdata/` directory wins when it holds at least one language file,
//! otherwise an operator-set `TESSDATA_PREFIX` is respected, otherwise the
//! directory next to the tesseract binary is used.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod converter;
pub mod engine;
pub mod error;
pub mod ocr;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod settings;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, FailedPagePolicy};
pub use convert::{convert, convert_sync, inspect};
pub use converter::{ConverterError, DocumentConverter, LibreOfficeConverter};
pub use engine::{EngineConfig, TesseractEngine};
pub use error::{PageError, SearchifyError};
pub use ocr::{make_searchable, OcrReport};
pub use output::{ConversionOutcome, ConversionStats, DocumentMetadata, PageReport, PageStatus};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use settings::Settings;
