//! The document-conversion seam: PDF in, editable document out.
//!
//! The pipeline's job ends at a single page-ordered searchable PDF; producing
//! the editable output is delegated to an external collaborator behind the
//! [`DocumentConverter`] trait. Callers inject their own implementation via
//! [`crate::config::ConversionConfigBuilder::converter`] (tests use a mock);
//! when none is configured the facade falls back to a discovered LibreOffice
//! installation.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error raised by a [`DocumentConverter`] implementation.
///
/// The facade translates this into
/// [`crate::error::SearchifyError::DocumentConversionFailed`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConverterError(pub String);

/// Converts a full PDF into an editable document.
///
/// Implementations must convert the entire page range and write the result to
/// the exact `output` path they are given.
pub trait DocumentConverter: Send + Sync {
    /// File extension (without dot) of the documents this converter produces.
    fn output_extension(&self) -> &str {
        "docx"
    }

    /// Convert `source` (a PDF) into an editable document at `output`.
    fn convert_document(&self, source: &Path, output: &Path) -> Result<(), ConverterError>;
}

/// Default converter: LibreOffice in headless mode.
///
/// `soffice --headless --convert-to docx` performs a full-document
/// conversion and names its output after the input stem, so the produced
/// file is renamed to the requested path afterwards.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    binary: PathBuf,
}

/// Environment variable overriding LibreOffice discovery.
pub const SOFFICE_PATH_VAR: &str = "SOFFICE_PATH";

impl LibreOfficeConverter {
    /// Wrap an explicit `soffice` binary path.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Discover a LibreOffice installation: `SOFFICE_PATH`, well-known
    /// locations, then a bare `soffice` on `PATH` probed with `--version`.
    pub fn discover() -> Option<Self> {
        if let Ok(path) = std::env::var(SOFFICE_PATH_VAR) {
            let path = PathBuf::from(path);
            if path.is_file() {
                return Some(Self::new(path));
            }
            warn!("{SOFFICE_PATH_VAR} set but '{}' is not a file", path.display());
        }

        let candidates: &[&str] = if cfg!(windows) {
            &[
                r"C:\Program Files\LibreOffice\program\soffice.exe",
                r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
            ]
        } else if cfg!(target_os = "macos") {
            &["/Applications/LibreOffice.app/Contents/MacOS/soffice"]
        } else {
            &["/usr/bin/soffice", "/usr/local/bin/soffice"]
        };

        if let Some(path) = candidates.iter().map(PathBuf::from).find(|p| p.is_file()) {
            return Some(Self::new(path));
        }

        let on_path = Command::new("soffice")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        on_path.then(|| Self::new("soffice"))
    }
}

impl DocumentConverter for LibreOfficeConverter {
    fn convert_document(&self, source: &Path, output: &Path) -> Result<(), ConverterError> {
        let out_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        info!(
            "converting {} with LibreOffice → {}",
            source.display(),
            output.display()
        );

        let result = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("docx")
            .arg("--outdir")
            .arg(out_dir)
            .arg(source)
            .output()
            .map_err(|e| ConverterError(format!("failed to run soffice: {e}")))?;

        if !result.status.success() {
            return Err(ConverterError(format!(
                "soffice exited {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        // soffice names the output after the source stem.
        let produced = out_dir.join(
            Path::new(source.file_name().unwrap_or_default()).with_extension("docx"),
        );
        if !produced.exists() {
            return Err(ConverterError(format!(
                "soffice reported success but '{}' was not written",
                produced.display()
            )));
        }

        if produced != output {
            std::fs::rename(&produced, output)
                .map_err(|e| ConverterError(format!("could not move converter output: {e}")))?;
            debug!("renamed {} → {}", produced.display(), output.display());
        }
        Ok(())
    }
}
