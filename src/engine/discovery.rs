//! One-time discovery of the Tesseract binary and its language data.
//!
//! Discovery produces an explicit [`EngineConfig`] that callers construct once
//! at startup and pass by reference. The language-data directory is forwarded
//! to every invocation via `--tessdata-dir`, never by mutating the process
//! environment — concurrent jobs in one process cannot interfere with each
//! other's engine setup.
//!
//! Search order for the binary:
//! 1. `TESSERACT_PATH` environment variable, when it names an existing file
//! 2. Well-known install locations for the current OS
//! 3. Bare `tesseract` on `PATH`, probed with `--version`
//!
//! The language-data directory:
//! 1. A bundled `tessdata/` directory (working directory, then next to the
//!    executable) is authoritative iff it contains at least one
//!    `.traineddata` file
//! 2. An operator-supplied `TESSDATA_PREFIX` is respected: the adapter passes
//!    no `--tessdata-dir` and lets the engine read the variable itself
//! 3. Otherwise the `tessdata` directory next to the discovered binary

use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Environment variable overriding binary discovery.
pub const TESSERACT_PATH_VAR: &str = "TESSERACT_PATH";

/// Well-known Tesseract install locations, most specific first.
static WELL_KNOWN_BINARIES: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    if cfg!(windows) {
        let mut paths = vec![
            PathBuf::from(r"C:\Program Files\Tesseract-OCR\tesseract.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe"),
        ];
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            paths.push(PathBuf::from(local).join(r"Tesseract-OCR\tesseract.exe"));
        }
        paths
    } else {
        vec![
            PathBuf::from("/usr/bin/tesseract"),
            PathBuf::from("/usr/local/bin/tesseract"),
            PathBuf::from("/opt/homebrew/bin/tesseract"),
        ]
    }
});

/// Resolved engine configuration: where the binary lives and where its
/// language data is.
///
/// Construct once (via [`EngineConfig::discover`] or explicitly) and share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Path of the `tesseract` executable.
    pub binary: PathBuf,
    /// Language-data directory passed via `--tessdata-dir`. None means the
    /// engine resolves its own data (system default or `TESSDATA_PREFIX`).
    pub tessdata_dir: Option<PathBuf>,
    /// Resolution hint passed via `--dpi`; should match the renderer's
    /// effective output resolution (zoom × 72).
    pub dpi: u32,
}

impl EngineConfig {
    /// Discover a Tesseract installation.
    ///
    /// Returns None when no binary could be located. Runs filesystem probes
    /// and possibly one `--version` subprocess; call it once per process and
    /// reuse the result.
    pub fn discover() -> Option<Self> {
        let override_path = std::env::var(TESSERACT_PATH_VAR).ok().map(PathBuf::from);
        let binary = pick_binary(override_path, &WELL_KNOWN_BINARIES)
            .or_else(path_probe)?;

        let bundled = bundled_candidates();
        let operator_prefix = std::env::var("TESSDATA_PREFIX").ok();
        let tessdata_dir = pick_tessdata(&bundled, operator_prefix.as_deref(), &binary);

        info!(
            "tesseract discovered at {} (tessdata: {})",
            binary.display(),
            tessdata_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "engine default".into())
        );

        Some(Self {
            binary,
            tessdata_dir,
            dpi: 144,
        })
    }
}

/// First existing path among the override and the well-known candidates.
fn pick_binary(override_path: Option<PathBuf>, candidates: &[PathBuf]) -> Option<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Some(path);
        }
        debug!("{TESSERACT_PATH_VAR} set but '{}' is not a file", path.display());
    }
    candidates.iter().find(|p| p.is_file()).cloned()
}

/// Probe a bare `tesseract` on PATH.
fn path_probe() -> Option<PathBuf> {
    let ok = Command::new("tesseract")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    ok.then(|| PathBuf::from("tesseract"))
}

/// Bundled tessdata candidates: working directory first, then exe-adjacent.
fn bundled_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("tessdata")];
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join("tessdata"));
    }
    candidates
}

/// Resolve the language-data directory per the priority rules above.
fn pick_tessdata(
    bundled: &[PathBuf],
    operator_prefix: Option<&str>,
    binary: &Path,
) -> Option<PathBuf> {
    // A bundled directory only wins when it actually holds language data;
    // an empty placeholder directory must not shadow a working install.
    if let Some(dir) = bundled.iter().find(|d| has_traineddata(d)) {
        return Some(dir.clone());
    }

    if operator_prefix.is_some_and(|p| !p.is_empty()) {
        return None;
    }

    // A bare `tesseract` found on PATH has no meaningful parent directory.
    let parent = binary.parent().filter(|p| !p.as_os_str().is_empty())?;
    let sibling = parent.join("tessdata");
    sibling.is_dir().then_some(sibling)
}

/// True when `dir` contains at least one `<code>.traineddata` file.
fn has_traineddata(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .flatten()
        .any(|e| e.path().extension().is_some_and(|ext| ext == "traineddata"))
}
