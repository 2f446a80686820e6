//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! ## Why download to a temp file?
//!
//! pdfium requires a file-system path — it cannot stream from a byte buffer.
//! Downloading into a `TempDir` gives us a path pdfium can open while
//! ensuring cleanup happens automatically when `ResolvedInput` is dropped,
//! even if the process panics. Both paths validate the `%PDF` magic bytes
//! before returning so callers get a meaningful error rather than a pdfium
//! crash.

use crate::error::SearchifyError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The resolved input — either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    /// File stem of the resolved PDF, used to name outputs and temp files.
    pub fn stem(&self) -> String {
        self.path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, SearchifyError> {
    if input.trim().is_empty() {
        return Err(SearchifyError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Validate that the file at `path` starts with the PDF magic bytes.
fn ensure_pdf_magic(path: &Path) -> Result<(), SearchifyError> {
    use std::io::Read;

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SearchifyError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(SearchifyError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    // A file shorter than the magic cannot be a PDF either way; treat a
    // short read the same as a mismatch.
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == b"%PDF" => Ok(()),
        Ok(()) => Err(SearchifyError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        }),
        Err(_) => Err(SearchifyError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        }),
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, SearchifyError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(SearchifyError::FileNotFound { path });
    }
    ensure_pdf_magic(&path)?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, SearchifyError> {
    info!("Downloading PDF from: {}", url);

    let download_err = |reason: String| SearchifyError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_err(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SearchifyError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_err(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(download_err(format!("HTTP {}", response.status())));
    }

    let filename = filename_from_url(url);
    let temp_dir = TempDir::new().map_err(|e| SearchifyError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_err(e.to_string()))?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| SearchifyError::Internal(format!("Failed to write temp file: {}", e)))?;

    ensure_pdf_magic(&file_path)?;
    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last URL path segment when it looks like a filename, else a fixed name.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed.path_segments().and_then(|mut segments| {
                segments
                    .next_back()
                    .filter(|last| !last.is_empty() && last.contains('.'))
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_picks_last_segment() {
        assert_eq!(
            filename_from_url("https://example.com/papers/scan.pdf"),
            "scan.pdf"
        );
        assert_eq!(filename_from_url("https://example.com/papers/"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://example.com"), "downloaded.pdf");
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = resolve_local("/nonexistent/scan.pdf").unwrap_err();
        assert!(matches!(err, SearchifyError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let err = resolve_input("  ", 120).await.unwrap_err();
        assert!(matches!(err, SearchifyError::InvalidInput { .. }));
    }

    #[test]
    fn non_pdf_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"not a pdf at all").unwrap();

        let err = resolve_local(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, SearchifyError::NotAPdf { .. }));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.pdf");
        std::fs::write(&path, b"%P").unwrap();

        let err = resolve_local(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, SearchifyError::NotAPdf { .. }));
    }

    #[test]
    fn valid_magic_resolves_with_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice scan.pdf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"%PDF-1.4\n%fake body").unwrap();

        let resolved = resolve_local(path.to_str().unwrap()).unwrap();
        assert_eq!(resolved.path(), path.as_path());
        assert_eq!(resolved.stem(), "invoice scan");
    }
}
