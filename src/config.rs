//! Configuration types for scan-to-document conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across threads, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field. The
//! builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::converter::DocumentConverter;
use crate::engine::EngineConfig;
use crate::error::SearchifyError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration for one conversion job.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use searchify::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .use_ocr(true)
///     .language("deu")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Whether to run the OCR pipeline before document conversion. Default: false.
    ///
    /// When the OCR engine is unavailable or the pipeline fails, the original
    /// PDF is used instead; OCR never blocks the base conversion.
    pub use_ocr: bool,

    /// Tesseract language code (e.g. "eng", "por", "deu"). Default: "eng".
    ///
    /// Must name an installed `.traineddata` file; see
    /// [`crate::engine::TesseractEngine::list_languages`].
    pub language: String,

    /// Page oversampling factor applied in both axes when rasterising. Default: 2.0.
    ///
    /// 2.0 turns a typical 72 DPI page into a ~144 DPI bitmap. Recognition
    /// accuracy degrades sharply below that; doubling linear resolution
    /// quadruples pixel count, a deliberate accuracy/latency trade-off.
    pub zoom: f32,

    /// What to do with a page whose OCR fails. Default: [`FailedPagePolicy::Omit`].
    pub failed_page_policy: FailedPagePolicy,

    /// Pre-resolved OCR engine configuration. If None, the engine is
    /// discovered once per job from well-known install locations and the
    /// `TESSERACT_PATH` environment variable.
    pub engine: Option<EngineConfig>,

    /// Pre-constructed document converter. If None, a LibreOffice installation
    /// is discovered at conversion time.
    pub converter: Option<Arc<dyn DocumentConverter>>,

    /// Progress event sink. If None, events surface as `tracing` logs only.
    pub progress_callback: Option<ProgressCallback>,

    /// Cooperative cancellation flag, checked at the top of each page
    /// iteration. A page already handed to the engine is never interrupted.
    pub cancel_flag: Option<Arc<AtomicBool>>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            use_ocr: false,
            language: "eng".to_string(),
            zoom: 2.0,
            failed_page_policy: FailedPagePolicy::default(),
            engine: None,
            converter: None,
            progress_callback: None,
            cancel_flag: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("use_ocr", &self.use_ocr)
            .field("language", &self.language)
            .field("zoom", &self.zoom)
            .field("failed_page_policy", &self.failed_page_policy)
            .field("engine", &self.engine)
            .field(
                "converter",
                &self.converter.as_ref().map(|_| "<dyn DocumentConverter>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// True once the configured cancel flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .map(|f| f.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn use_ocr(mut self, v: bool) -> Self {
        self.config.use_ocr = v;
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn zoom(mut self, zoom: f32) -> Self {
        self.config.zoom = zoom.clamp(1.0, 4.0);
        self
    }

    pub fn failed_page_policy(mut self, policy: FailedPagePolicy) -> Self {
        self.config.failed_page_policy = policy;
        self
    }

    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.config.converter = Some(converter);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.config.cancel_flag = Some(flag);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, SearchifyError> {
        let c = &self.config;
        if !(1.0..=4.0).contains(&c.zoom) {
            return Err(SearchifyError::InvalidConfig(format!(
                "zoom must be 1.0–4.0, got {}",
                c.zoom
            )));
        }
        if c.language.trim().is_empty() {
            return Err(SearchifyError::InvalidConfig(
                "language code must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// What the pipeline does with a page whose OCR failed.
///
/// Silently dropping scanned content is surprising, but inserting an
/// unrecognised image page changes the output page count relative to what the
/// text layer covers. Neither choice suits every caller, so the policy is
/// explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailedPagePolicy {
    /// Omit the page from the merged output (default). The merged page count
    /// shrinks by one per failed page; no placeholder is inserted.
    #[default]
    Omit,
    /// Keep the rendered page image as an image-only page without a text
    /// layer, preserving the source page count. Pages that fail during
    /// rendering are still omitted — there is nothing to keep.
    KeepOriginal,
}
