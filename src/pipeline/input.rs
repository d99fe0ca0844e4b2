//! Input resolution: turn the user's path or URL into a local PDF and read
//! the issue number off its file name.
//!
//! pdfium opens files by path, so URL inputs are downloaded into a
//! [`TempDir`] that lives as long as the [`ResolvedInput`]. Both routes check
//! the `%PDF` magic before pdfium ever sees the file.

use crate::error::IssueError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF ready to be opened, local or downloaded.
pub enum ResolvedInput {
    Local(PathBuf),
    /// Removed together with `_temp_dir` when dropped.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    /// Issue number from the (original or downloaded) file name.
    pub fn issue_number(&self) -> Option<u32> {
        issue_number(self.path())
    }

    /// File stem, used in log lines and as the default output name.
    pub fn display_name(&self) -> String {
        self.path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "issue".to_string())
    }
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to a local PDF, downloading it first if it is a URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, IssueError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else if input.trim().is_empty() {
        Err(IssueError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, IssueError> {
    let path = PathBuf::from(path_str);
    if !path.is_file() {
        return Err(IssueError::FileNotFound { path });
    }

    let mut magic = [0u8; 4];
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            // Files shorter than four bytes fall through to pdfium's own error.
            if f.read_exact(&mut magic).is_ok() {
                check_magic(&path, &magic)?;
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(IssueError::PermissionDenied { path });
        }
        Err(_) => return Err(IssueError::FileNotFound { path }),
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

fn check_magic(path: &Path, head: &[u8]) -> Result<(), IssueError> {
    if head.len() < 4 || &head[..4] == PDF_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&head[..4]);
    Err(IssueError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, IssueError> {
    info!("Downloading issue from: {}", url);

    let failed = |reason: String| IssueError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            IssueError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| IssueError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(url));
    check_magic(&file_path, &bytes)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| IssueError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());
    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL, so the issue number survives the download.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Issue number encoded in the file name.
///
/// The stem must contain exactly one run of digits (`augustiner_42.pdf`);
/// anything else is ambiguous and yields `None`.
pub fn issue_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_string_lossy();
    let mut runs = RE_DIGITS.find_iter(&stem);
    let only = runs.next()?;
    if runs.next().is_some() {
        warn!("File name '{}' holds more than one number, issue number unknown", stem);
        return None;
    }
    only.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://x.org/hefte/augustiner_42.pdf"), "augustiner_42.pdf");
        assert_eq!(filename_from_url("https://x.org/download"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://x.org/"), "downloaded.pdf");
    }

    #[test]
    fn test_issue_number_single_run() {
        assert_eq!(issue_number(Path::new("/in/augustiner_42.pdf")), Some(42));
        assert_eq!(issue_number(Path::new("ausgabe-007.pdf")), Some(7));
    }

    #[test]
    fn test_issue_number_ambiguous_or_missing() {
        assert_eq!(issue_number(Path::new("2024_ausgabe_3.pdf")), None);
        assert_eq!(issue_number(Path::new("sonderheft.pdf")), None);
        assert_eq!(issue_number(Path::new("99999999999999.pdf")), None);
    }

    #[test]
    fn test_resolve_local_missing_file() {
        let err = resolve_local("/definitely/not/here.pdf").err().unwrap();
        assert!(matches!(err, IssueError::FileNotFound { .. }));
    }

    #[test]
    fn test_resolve_local_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"GIF89a").unwrap();
        let err = resolve_local(path.to_str().unwrap()).err().unwrap();
        assert!(matches!(err, IssueError::NotAPdf { magic, .. } if &magic == b"GIF8"));
    }

    #[test]
    fn test_resolve_local_accepts_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("augustiner_12.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();
        let resolved = resolve_local(path.to_str().unwrap()).unwrap();
        assert_eq!(resolved.issue_number(), Some(12));
        assert_eq!(resolved.display_name(), "augustiner_12");
    }

    #[tokio::test]
    async fn test_resolve_input_rejects_empty() {
        let err = resolve_input("  ", 5).await.err().unwrap();
        assert!(matches!(err, IssueError::InvalidInput { .. }));
    }
}
