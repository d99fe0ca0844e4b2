//! Progress-callback trait for per-page segmentation events.
//!
//! Inject an [`Arc<dyn IssueProgressCallback>`] via
//! [`crate::config::SegmentationConfigBuilder::progress_callback`] to follow
//! an issue as the page loop walks it. The CLI drives its progress bar from
//! these events; a host application can forward them anywhere it likes.
//!
//! # Example
//!
//! ```rust
//! use pdf2articles::{Article, IssueProgressCallback, SegmentationConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct ArticleCounter {
//!     seen: AtomicUsize,
//! }
//!
//! impl IssueProgressCallback for ArticleCounter {
//!     fn on_article(&self, article: &Article) {
//!         let n = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("#{n}: {}", article.title);
//!     }
//! }
//!
//! let counter = Arc::new(ArticleCounter { seen: AtomicUsize::new(0) });
//! let config = SegmentationConfig::builder()
//!     .progress_callback(counter as Arc<dyn IssueProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::SegmentationWarning;
use crate::output::Article;
use std::sync::Arc;

/// Called by the issue driver as it visits each logical page.
///
/// Pages are visited strictly in order on one thread, but the trait is
/// `Send + Sync` so one callback can be shared by issues segmented
/// concurrently. All methods default to no-ops.
pub trait IssueProgressCallback: Send + Sync {
    /// Called once extraction finished, before the first page is segmented.
    ///
    /// # Arguments
    /// * `total_pages`: logical pages after spread splitting
    fn on_issue_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page goes through the assembler.
    ///
    /// # Arguments
    /// * `page_num`   : 0-indexed logical page
    /// * `total_pages`: logical pages in the issue
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page was processed.
    ///
    /// # Arguments
    /// * `page_num`: 0-indexed logical page
    /// * `category`: category the page was attributed to
    fn on_page_complete(&self, page_num: usize, total_pages: usize, category: &str) {
        let _ = (page_num, total_pages, category);
    }

    /// Called for every article handed to the sink.
    fn on_article(&self, article: &Article) {
        let _ = article;
    }

    /// Called for every non-fatal warning as it is raised.
    fn on_warning(&self, warning: &SegmentationWarning) {
        let _ = warning;
    }

    /// Called once after the last page.
    ///
    /// # Arguments
    /// * `total_pages`: logical pages in the issue
    /// * `articles`   : articles emitted, forced flushes included
    fn on_issue_complete(&self, total_pages: usize, articles: usize) {
        let _ = (total_pages, articles);
    }
}

/// Used when no callback is configured.
pub struct NoopProgressCallback;

impl IssueProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::SegmentationConfig`].
pub type ProgressCallback = Arc<dyn IssueProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Termination;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        pages: AtomicUsize,
        articles: AtomicUsize,
        warnings: AtomicUsize,
    }

    impl IssueProgressCallback for TrackingCallback {
        fn on_page_complete(&self, _page_num: usize, _total: usize, _category: &str) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_article(&self, _article: &Article) {
            self.articles.fetch_add(1, Ordering::SeqCst);
        }

        fn on_warning(&self, _warning: &SegmentationWarning) {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_accepts_every_event() {
        let cb = NoopProgressCallback;
        cb.on_issue_start(4);
        cb.on_page_start(0, 4);
        cb.on_page_complete(0, 4, "wohnen");
        cb.on_warning(&SegmentationWarning::MalformedPage {
            page: 1,
            reason: "x".into(),
        });
        cb.on_issue_complete(4, 0);
    }

    #[test]
    fn overridden_methods_are_called_through_the_alias() {
        let tracker = Arc::new(TrackingCallback {
            pages: AtomicUsize::new(0),
            articles: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
        });
        let cb: ProgressCallback = tracker.clone();

        cb.on_page_complete(0, 2, "sport");
        cb.on_page_complete(1, 2, "sport");
        cb.on_article(&Article {
            title: "T".into(),
            body: "B.".into(),
            category: "sport".into(),
            image_id: None,
            image_html: String::new(),
            first_page: 0,
            last_page: 1,
            termination: Termination::Complete,
        });

        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.articles.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.warnings.load(Ordering::SeqCst), 0);
    }
}
