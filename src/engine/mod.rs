//! Recognition engine adapter: Tesseract behind a subprocess boundary.
//!
//! ## Why a subprocess and not bindings?
//!
//! Tesseract's C API bindings (leptess et al.) pin the whole process to one
//! libtesseract version and turn engine crashes into process crashes. The
//! `tesseract` binary with the `pdf` output mode already produces exactly what
//! this pipeline needs — a one-page PDF whose visual content is the input
//! image with an invisible, position-aligned text layer — so the adapter
//! shells out and treats the engine as replaceable.
//!
//! ## Failure contract
//!
//! None of the probe methods return `Result`: `is_available` answers false,
//! `list_languages` answers empty, and `create_searchable_page` answers false
//! on any engine failure, after logging the cause. Page-level policy belongs
//! to the orchestrator, not here.

mod discovery;

pub use discovery::EngineConfig;

use image::GrayImage;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Handle to a discovered (or explicitly configured) Tesseract installation.
///
/// Construction is cheap; all probing happens per call. The configuration is
/// resolved once — either by the caller or via [`EngineConfig::discover`] —
/// and passed by reference, so nothing here mutates the process environment.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    config: EngineConfig,
}

impl TesseractEngine {
    /// Wrap a resolved engine configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Discover a Tesseract installation from well-known locations.
    ///
    /// Returns None when no binary could be found; see
    /// [`EngineConfig::discover`] for the search order.
    pub fn discover() -> Option<Self> {
        EngineConfig::discover().map(Self::new)
    }

    /// The configuration this adapter was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Probe whether the engine binary is installed and invocable.
    ///
    /// Never fails: any spawn or exit error answers false.
    pub fn is_available(&self) -> bool {
        match Command::new(&self.config.binary).arg("--version").output() {
            Ok(output) => output.status.success(),
            Err(err) => {
                debug!("tesseract probe failed: {err}");
                false
            }
        }
    }

    /// List installed language codes, best-effort.
    ///
    /// Returns an empty list on any error. The first line of
    /// `tesseract --list-langs` output is a header and is skipped.
    pub fn list_languages(&self) -> Vec<String> {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("--list-langs");
        if let Some(ref dir) = self.config.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }

        let output = match cmd.output() {
            Ok(o) if o.status.success() => o,
            Ok(o) => {
                debug!(
                    "tesseract --list-langs exited {}: {}",
                    o.status,
                    String::from_utf8_lossy(&o.stderr).trim()
                );
                return Vec::new();
            }
            Err(err) => {
                debug!("tesseract --list-langs failed to spawn: {err}");
                return Vec::new();
            }
        };

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .skip(1)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Produce a one-page searchable PDF from a processed page image.
    ///
    /// The image is written to a temporary PNG and handed to
    /// `tesseract <png> <out_base> -l <lang> --dpi <n> pdf`, which writes
    /// `<out_base>.pdf` — an image-background page with an invisible text
    /// layer. `output_path` must therefore end in `.pdf`.
    ///
    /// Returns false (never an error) on any engine failure; the cause is
    /// logged at warn level.
    pub fn create_searchable_page(
        &self,
        image: &GrayImage,
        output_path: &Path,
        language: &str,
    ) -> bool {
        let png = match tempfile::Builder::new()
            .prefix("searchify-page-")
            .suffix(".png")
            .tempfile()
        {
            Ok(f) => f,
            Err(err) => {
                warn!("OCR page: could not create temp image: {err}");
                return false;
            }
        };

        if let Err(err) = image.save(png.path()) {
            warn!("OCR page: could not encode image: {err}");
            return false;
        }

        // Tesseract appends ".pdf" to the output base itself.
        let out_base = output_path.with_extension("");

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg(png.path())
            .arg(&out_base)
            .arg("-l")
            .arg(language)
            .arg("--dpi")
            .arg(self.config.dpi.to_string());
        if let Some(ref dir) = self.config.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("pdf");

        match cmd.output() {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                warn!(
                    "tesseract exited {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                return false;
            }
            Err(err) => {
                warn!("tesseract failed to spawn: {err}");
                return false;
            }
        }

        if !output_path.exists() {
            warn!(
                "tesseract reported success but '{}' was not written",
                output_path.display()
            );
            return false;
        }

        debug!("searchable fragment written to {}", output_path.display());
        true
    }
}
