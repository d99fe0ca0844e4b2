//! Error types for the pdf2articles library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`IssueError`]: **Fatal**: the issue cannot be segmented (bad input,
//!   wrong password, the text-extraction collaborator failed on a page).
//!   Returned as `Err(IssueError)`; any article still being accumulated is
//!   dropped so nothing half-formed reaches the publisher.
//!
//! * [`SegmentationWarning`]: **Non-fatal**: a documented best-effort
//!   degradation (malformed page, ambiguous markers, an article flushed
//!   without its end marker). Collected in [`crate::output::IssueOutput`]
//!   for human review and never silently dropped.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2articles library.
#[derive(Debug, Error)]
pub enum IssueError {
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
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page-text extraction collaborator failed; the issue is aborted.
    #[error("Text extraction failed on page {page}: {detail}")]
    Extraction { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or profile validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A layout profile file could not be read or parsed.
    #[error("Failed to load layout profile '{path}': {detail}")]
    ProfileLoad { path: PathBuf, detail: String },

    // ── Run errors ────────────────────────────────────────────────────────
    /// The article sink refused an article.
    #[error("Publishing article '{title}' failed: {detail}")]
    Publish { title: String, detail: String },

    /// Cancellation was requested; honoured before `next_page`.
    #[error("Segmentation cancelled before page {next_page}")]
    Cancelled { next_page: usize },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why an article was emitted without its end marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlushCause {
    /// The next page belongs to a different category.
    CategoryChange { next_category: String },
    /// The article stayed open for the configured page ceiling.
    PageLimit { limit: usize },
    /// The issue ended while the article was still open.
    EndOfIssue,
}

/// A non-fatal segmentation problem, surfaced for human review.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentationWarning {
    /// The page's span dictionary was absent or unparsable; the page
    /// contributed nothing to segmentation.
    #[error("Page {page}: malformed page content skipped: {reason}")]
    MalformedPage { page: usize, reason: String },

    /// A further start marker showed up inside an article body before its
    /// end marker; the first marker kept the article.
    #[error("Page {page}: start marker(s) {stray_markers:?} found inside the open article anchored at {anchor:?}")]
    AmbiguousSegmentation {
        page: usize,
        anchor: String,
        stray_markers: Vec<String>,
    },

    /// An article was flushed before its end marker was seen.
    #[error("Pages {first_page}-{last_page}: article '{title}' flushed without end marker ({cause:?})")]
    UnterminatedArticle {
        first_page: usize,
        last_page: usize,
        title: String,
        cause: FlushCause,
    },
}

impl SegmentationWarning {
    /// Page the warning is reported against.
    pub fn page(&self) -> usize {
        match self {
            SegmentationWarning::MalformedPage { page, .. }
            | SegmentationWarning::AmbiguousSegmentation { page, .. } => *page,
            SegmentationWarning::UnterminatedArticle { last_page, .. } => *last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_display() {
        let e = IssueError::Extraction {
            page: 7,
            detail: "content stream truncated".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 7"), "got: {msg}");
        assert!(msg.contains("truncated"));
    }

    #[test]
    fn cancelled_display() {
        let e = IssueError::Cancelled { next_page: 4 };
        assert!(e.to_string().contains("page 4"));
    }

    #[test]
    fn unterminated_display_names_pages() {
        let w = SegmentationWarning::UnterminatedArticle {
            first_page: 3,
            last_page: 5,
            title: "Wohnen".into(),
            cause: FlushCause::CategoryChange {
                next_category: "sport".into(),
            },
        };
        let msg = w.to_string();
        assert!(msg.contains("3-5"), "got: {msg}");
        assert!(msg.contains("Wohnen"));
        assert_eq!(w.page(), 5);
    }

    #[test]
    fn warning_serialises_with_kind_tag() {
        let w = SegmentationWarning::MalformedPage {
            page: 2,
            reason: "no blocks".into(),
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "malformed_page");
        assert_eq!(json["page"], 2);
    }
}
