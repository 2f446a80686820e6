//! Persisted user settings.
//!
//! A flat key-value JSON document at a per-user config path. Host
//! applications (GUI shells, wrappers) read and write these between runs;
//! the library itself never consults them implicitly — callers map them onto
//! a [`crate::config::ConversionConfig`] explicitly.
//!
//! Missing or corrupt files fall back to defaults rather than erroring: a
//! damaged settings file must never keep the application from starting.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// User-facing settings persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// UI language tag.
    pub language: String,
    /// Last selected output folder; empty means "ask".
    pub output_folder: String,
    /// UI theme name.
    pub theme: String,
    /// Whether OCR pre-processing is enabled.
    pub ocr_enabled: bool,
    /// Tesseract language code used when OCR is enabled.
    pub ocr_language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: "pt_BR".to_string(),
            output_folder: String::new(),
            theme: "dark".to_string(),
            ocr_enabled: false,
            ocr_language: "por".to_string(),
        }
    }
}

/// Per-user configuration directory.
///
/// `%APPDATA%\PDFConverter` on Windows, `~/.pdfconverter` elsewhere; `/tmp`
/// as a last resort when no home is known.
pub fn config_dir() -> PathBuf {
    if cfg!(windows) {
        if let Ok(app_data) = std::env::var("APPDATA") {
            return PathBuf::from(app_data).join("PDFConverter");
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".pdfconverter");
    }
    PathBuf::from("/tmp").join(".pdfconverter")
}

impl Settings {
    /// Path of the settings document.
    pub fn config_file() -> PathBuf {
        config_dir().join("settings.json")
    }

    /// Load settings from the default location.
    pub fn load() -> Self {
        Self::load_from(&Self::config_file())
    }

    /// Load settings from an explicit path, falling back to defaults on a
    /// missing or unparsable file.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                warn!("settings file '{}' is corrupt ({err}); using defaults", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to the default location, creating the directory.
    pub fn save(&self) -> std::io::Result<()> {
        let dir = config_dir();
        std::fs::create_dir_all(&dir)?;
        self.save_to(&dir.join("settings.json"))
    }

    /// Save settings to an explicit path.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
