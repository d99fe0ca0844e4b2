//! Result types: articles, per-issue output and statistics.

use crate::error::{FlushCause, SegmentationWarning};
use serde::{Deserialize, Serialize};

/// How an article's body was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The end-marker glyph was found.
    Complete,
    /// Emitted without an end marker.
    ForcedFlush { cause: FlushCause },
}

/// One reconstructed article, ready for a publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub body: String,
    pub category: String,
    pub image_id: Option<String>,
    /// Markup for further images on the article's pages.
    pub image_html: String,
    /// First and last logical page (0-indexed) the article spans.
    pub first_page: usize,
    pub last_page: usize,
    pub termination: Termination,
}

impl Article {
    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Complete
    }

    /// Number of logical pages the article spans.
    pub fn page_span(&self) -> usize {
        self.last_page - self.first_page + 1
    }
}

/// Category detected for a page, as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCategory {
    pub page_num: usize,
    pub category: String,
    /// False when the page carried nothing the segmenter could read.
    pub segmented: bool,
}

/// Issue-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueMetadata {
    /// Issue number parsed from the file name, when unambiguous.
    pub issue_number: Option<u32>,
    /// Physical pages in the PDF.
    pub physical_pages: usize,
    /// Logical pages after spread splitting.
    pub logical_pages: usize,
    /// Image reference of the cover page.
    pub cover_image_id: Option<String>,
}

/// Counters for one segmentation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStats {
    pub total_pages: usize,
    pub segmented_pages: usize,
    pub skipped_pages: usize,
    pub articles: usize,
    pub complete_articles: usize,
    pub forced_flushes: usize,
    pub warnings: usize,
    pub extraction_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything produced for one issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueOutput {
    pub articles: Vec<Article>,
    pub warnings: Vec<SegmentationWarning>,
    pub pages: Vec<PageCategory>,
    pub metadata: IssueMetadata,
    pub stats: IssueStats,
}

/// Signals seen on one page, for `inspect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub page_num: usize,
    pub category: String,
    pub span_count: usize,
    pub headlines: Vec<String>,
    pub start_markers: Vec<String>,
    pub end_marker_count: usize,
    pub malformed: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(termination: Termination) -> Article {
        Article {
            title: "T".into(),
            body: "Body.".into(),
            category: "sport".into(),
            image_id: None,
            image_html: String::new(),
            first_page: 3,
            last_page: 5,
            termination,
        }
    }

    #[test]
    fn page_span_is_inclusive() {
        assert_eq!(article(Termination::Complete).page_span(), 3);
    }

    #[test]
    fn completeness() {
        assert!(article(Termination::Complete).is_complete());
        let forced = article(Termination::ForcedFlush {
            cause: FlushCause::EndOfIssue,
        });
        assert!(!forced.is_complete());
    }

    #[test]
    fn article_json_shape() {
        let json = serde_json::to_value(article(Termination::Complete)).unwrap();
        assert_eq!(json["title"], "T");
        assert_eq!(json["termination"]["kind"], "complete");
        assert!(json["image_id"].is_null());
    }
}
