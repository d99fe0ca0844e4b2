//! # pdf2articles
//!
//! Segment typeset magazine PDFs into publishable articles.
//!
//! ## Why this crate?
//!
//! A magazine issue is not a document with a structure tree: it is pages of
//! positioned glyphs following a visual grammar. Articles start at a coloured
//! drop capital, carry an oversize headline, run across columns and pages,
//! and end at a small square glyph. This crate reads that grammar from font,
//! size and colour metadata and rebuilds each article as continuous prose
//! with its title, category and image reference.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   text layer via pdfium (spawn_blocking), spreads split
//!  ├─ 3. Category  running header → section name, editorial crop
//!  ├─ 4. Classify  spans → headline / start marker / end marker / body
//!  ├─ 5. Assemble  page-at-a-time state machine across pages
//!  ├─ 6. Normalize undo print line-wrapping and hyphenation
//!  └─ 7. Publish   articles to an ArticleSink, report + warnings
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2articles::{segment_issue, SegmentationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SegmentationConfig::default();
//!     let output = segment_issue("augustiner_42.pdf", &config).await?;
//!     for article in &output.articles {
//!         println!("[{}] {}", article.category, article.title);
//!     }
//!     for warning in &output.warnings {
//!         eprintln!("review: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Already have spans from another PDF stack? Build [`PageInput`]s and call
//! [`segment_pages`]; pdfium is never touched.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2articles` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2articles = { version = "0.3", default-features = false }
//! ```
//!
//! ## Other Templates
//!
//! Every typographic threshold lives in [`LayoutProfile`], which loads from
//! JSON. Another publication with the same grammar needs a profile, not code.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod issue;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod segment;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CancelFlag, CategoryRegions, LayoutProfile, SegmentationConfig, SegmentationConfigBuilder};
pub use error::{FlushCause, IssueError, SegmentationWarning};
pub use issue::{
    inspect, inspect_pages, segment_issue, segment_issue_into, segment_issue_sync, segment_issue_to_file,
    segment_pages, segment_pages_into,
};
pub use model::{BBox, ClassifiedSpan, PageImage, PageInput, PageSignals, Rgb, Span, SpanRole};
pub use output::{Article, IssueMetadata, IssueOutput, IssueStats, PageCategory, PageReport, Termination};
pub use pipeline::category::{CategoryIdentifier, FixedCategory, RegionCategoryIdentifier};
pub use pipeline::images::{FallbackImageResolver, ImageResolver, PrefetchedImages};
pub use pipeline::publish::{ArticleSink, DiscardSink, JsonLinesSink};
pub use progress::{IssueProgressCallback, NoopProgressCallback, ProgressCallback};
pub use segment::{ArticleAssembler, AssemblerState, SpanClassifier, TextNormalizer};
