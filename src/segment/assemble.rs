//! The article assembler: a page-at-a-time state machine.
//!
//! ```text
//!            start marker, no end            end found
//!   Idle ───────────────────────────► Open ───────────► Closed ─► Idle
//!     │                                │  ▲                 ▲
//!     │ start marker + end on one page │  │ no end yet      │ ForcedFlush
//!     └────────────────────────────────┼──┘                 │ (category change,
//!                                      └────────────────────┘  page limit,
//!                                                              end of issue)
//! ```
//!
//! Only a coloured end-marker span lets the `■` in the text close an
//! article; glyphs on pages without one are dropped from the raw text.
//! When a start marker follows the glyph on the closing page, the next
//! article opens right there.
//!
//! [`ArticleAssembler::step`] consumes the current [`AssemblerState`] by
//! value and returns the next one inside a [`Step`], so no accumulation
//! state is ever shared or mutated in place.

use crate::config::SegmentationConfig;
use crate::error::{FlushCause, SegmentationWarning};
use crate::model::{PageImage, PageInput, PageSignals};
use crate::output::{Article, Termination};
use crate::segment::normalize::{Normalization, TextNormalizer};
use crate::segment::signals::SignalExtractor;
use tracing::{debug, info, warn};

/// Everything gathered for the article currently open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulationState {
    /// Raw text of every page seen so far, joined with line breaks.
    pub pending_raw_text: String,
    pub pending_headlines: Vec<String>,
    pub pending_start_markers: Vec<String>,
    pub category: String,
    pub image_id: Option<String>,
    pub image_html: String,
    pub first_page: usize,
    pub last_page: usize,
    /// Number of pages the article has been open for.
    pub pages_open: usize,
    /// End-marker spans (in marker colour) seen and not yet used to close
    /// an article.
    pub end_markers_seen: usize,
}

impl AccumulationState {
    fn open(page: &PageInput, signals: PageSignals, end_marker: char) -> Self {
        Self {
            pending_raw_text: page_text(page, &signals, end_marker),
            pending_headlines: signals.headlines,
            pending_start_markers: signals.start_markers,
            category: page.category.clone(),
            image_id: non_empty(&page.image).map(str::to_string),
            image_html: page.image.image_html.clone(),
            first_page: page.page_num,
            last_page: page.page_num,
            pages_open: 1,
            end_markers_seen: signals.end_marker_count,
        }
    }

    /// Fold a continuation page in, returning the grown state.
    fn extend(self, page: &PageInput, signals: PageSignals, end_marker: char) -> Self {
        let text = page_text(page, &signals, end_marker);
        let pending_raw_text = if self.pending_raw_text.is_empty() {
            text
        } else {
            format!("{}\n{}", self.pending_raw_text, text)
        };
        let image_id = self
            .image_id
            .or_else(|| non_empty(&page.image).map(str::to_string));
        let image_html = self.image_html + &page.image.image_html;

        Self {
            pending_raw_text,
            pending_headlines: signals.headlines,
            pending_start_markers: signals.start_markers,
            image_id,
            image_html,
            last_page: page.page_num,
            pages_open: self.pages_open + 1,
            end_markers_seen: self.end_markers_seen + signals.end_marker_count,
            ..self
        }
    }

    /// State for an article starting after the end glyph on the closing
    /// page. Headlines printed between the glyph and the new anchor move
    /// over from the closed article.
    fn reopen(&mut self, page: &PageInput, remainder: String, start_markers: Vec<String>) -> Self {
        let lead_in = lines_before(&remainder, &start_markers[0]);
        let (moved, kept): (Vec<String>, Vec<String>) = std::mem::take(&mut self.pending_headlines)
            .into_iter()
            .partition(|h| lead_in.iter().any(|line| line.contains(h.as_str())));
        self.pending_headlines = kept;

        Self {
            pending_raw_text: remainder,
            pending_headlines: moved,
            pending_start_markers: start_markers,
            category: self.category.clone(),
            image_id: non_empty(&page.image).map(str::to_string),
            image_html: page.image.image_html.clone(),
            first_page: page.page_num,
            last_page: page.page_num,
            pages_open: 1,
            end_markers_seen: self.end_markers_seen.saturating_sub(1),
        }
    }

    /// Headlines joined by a space, or the category when none were seen.
    pub fn title(&self) -> String {
        if self.pending_headlines.is_empty() {
            self.category.clone()
        } else {
            self.pending_headlines.join(" ")
        }
    }

    fn into_article(self, body: String, termination: Termination) -> Article {
        Article {
            title: self.title(),
            body,
            category: self.category,
            image_id: self.image_id,
            image_html: self.image_html,
            first_page: self.first_page,
            last_page: self.last_page,
            termination,
        }
    }
}

/// A page's raw text. Without an end-marker span the page's glyphs are
/// body-ink ornaments, not article ends, and are removed.
fn page_text(page: &PageInput, signals: &PageSignals, end_marker: char) -> String {
    if signals.end_marker_count == 0 && page.raw_text.contains(end_marker) {
        debug!("Page {}: end glyph in body ink ignored", page.page_num);
        page.raw_text.replace(end_marker, "")
    } else {
        page.raw_text.clone()
    }
}

/// Trimmed lines of `text` before the line equal to `anchor`.
fn lines_before<'t>(text: &'t str, anchor: &str) -> Vec<&'t str> {
    text.lines()
        .map(str::trim)
        .take_while(|line| *line != anchor.trim())
        .collect()
}

fn non_empty(image: &PageImage) -> Option<&str> {
    image.image_id.as_deref().filter(|id| !id.trim().is_empty())
}

/// Assembler state between two pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AssemblerState {
    /// No article open.
    #[default]
    Idle,
    /// An article is waiting for its end marker.
    Open(Box<AccumulationState>),
}

impl AssemblerState {
    pub fn is_open(&self) -> bool {
        matches!(self, AssemblerState::Open(_))
    }
}

/// What a page did to the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page neither opened nor closed an article.
    Ignored,
    /// An article ended on this page.
    Closed,
    /// An article is open and continues on the next page. Articles that
    /// closed earlier on the same page are still in [`Step::articles`].
    NeedNextPage,
}

/// Result of one transition.
#[derive(Debug, Clone)]
pub struct Step {
    pub state: AssemblerState,
    pub outcome: PageOutcome,
    /// Articles emitted by this transition, in page order. A category
    /// change can flush one article and close another on the same page.
    pub articles: Vec<Article>,
    pub warnings: Vec<SegmentationWarning>,
}

impl Step {
    fn new(state: AssemblerState, outcome: PageOutcome) -> Self {
        Self {
            state,
            outcome,
            articles: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Drives pages through extraction, normalisation and article assembly.
#[derive(Debug, Clone, Copy)]
pub struct ArticleAssembler<'p> {
    extractor: SignalExtractor<'p>,
    normalizer: TextNormalizer,
    end_marker: char,
    max_open_pages: usize,
}

impl<'p> ArticleAssembler<'p> {
    pub fn new(config: &'p SegmentationConfig) -> Self {
        Self {
            extractor: SignalExtractor::new(&config.profile),
            normalizer: TextNormalizer::new(config.profile.end_marker),
            end_marker: config.profile.end_marker,
            max_open_pages: config.max_open_pages.max(1),
        }
    }

    /// Feed one page.
    pub fn step(&self, state: AssemblerState, page: &PageInput) -> Step {
        if let Some(reason) = &page.malformed {
            warn!("Page {}: malformed content skipped: {}", page.page_num, reason);
            let mut step = Step::new(state, PageOutcome::Ignored);
            step.warnings.push(SegmentationWarning::MalformedPage {
                page: page.page_num,
                reason: reason.clone(),
            });
            return step;
        }
        if page.spans.is_empty() {
            debug!("Page {}: no spans, passing through", page.page_num);
            return Step::new(state, PageOutcome::Ignored);
        }

        let mut flushed = None;
        let state = match state {
            AssemblerState::Open(acc) if acc.category != page.category => {
                let cause = FlushCause::CategoryChange {
                    next_category: page.category.clone(),
                };
                flushed = Some(self.force_flush(*acc, cause));
                AssemblerState::Idle
            }
            other => other,
        };

        let mut step = match state {
            AssemblerState::Idle => self.step_idle(page),
            AssemblerState::Open(acc) => self.step_open(*acc, page),
        };

        if let Some((article, warning)) = flushed {
            step.articles.insert(0, article);
            step.warnings.insert(0, warning);
        }
        step
    }

    /// Flush whatever is still open once the issue has no more pages.
    pub fn finish(&self, state: AssemblerState) -> Step {
        let mut step = Step::new(AssemblerState::Idle, PageOutcome::Ignored);
        if let AssemblerState::Open(acc) = state {
            let (article, warning) = self.force_flush(*acc, FlushCause::EndOfIssue);
            step.articles.push(article);
            step.warnings.push(warning);
        }
        step
    }

    /// Signals for a page seen in isolation, as `inspect` reports them.
    pub fn signals(&self, page: &PageInput) -> PageSignals {
        self.extractor.extract_fresh(&page.spans)
    }

    fn step_idle(&self, page: &PageInput) -> Step {
        let signals = self.extractor.extract_fresh(&page.spans);
        if signals.start_markers.is_empty() {
            if !signals.headlines.is_empty() {
                debug!(
                    "Page {}: {} headline(s) but no start marker, nothing opened",
                    page.page_num,
                    signals.headlines.len()
                );
            }
            return Step::new(AssemblerState::Idle, PageOutcome::Ignored);
        }

        debug!(
            "Page {}: opening article at {:?} ({} headline(s))",
            page.page_num,
            signals.start_markers[0],
            signals.headlines.len()
        );
        let acc = AccumulationState::open(page, signals, self.end_marker);
        self.attempt(acc, page, Vec::new())
    }

    fn step_open(&self, acc: AccumulationState, page: &PageInput) -> Step {
        let signals = self.extractor.extract(
            &page.spans,
            &acc.pending_start_markers,
            &acc.pending_headlines,
            true,
        );
        // Markers suppressed on a continuation page may still open the next
        // article once this one closes.
        let page_markers = self.extractor.extract_fresh(&page.spans).start_markers;
        self.attempt(acc.extend(page, signals, self.end_marker), page, page_markers)
    }

    /// Try to close the article with everything accumulated so far, then
    /// any article starting after its end glyph on the same page.
    fn attempt(&self, mut acc: AccumulationState, page: &PageInput, mut page_markers: Vec<String>) -> Step {
        let page_num = page.page_num;
        let mut articles = Vec::new();
        let mut warnings = Vec::new();

        loop {
            let outcome = if acc.end_markers_seen == 0 {
                Normalization::Unterminated
            } else {
                self.normalizer
                    .segment(&acc.pending_raw_text, &acc.pending_start_markers)
            };

            let (text, stray_markers, remainder) = match outcome {
                Normalization::Complete {
                    text,
                    stray_markers,
                    remainder,
                } => (text, stray_markers, remainder),
                outcome => {
                    if acc.end_markers_seen > 0 {
                        debug!(
                            "Page {}: {} end marker span(s) but no closing line in text ({:?})",
                            page_num, acc.end_markers_seen, outcome
                        );
                    }
                    if acc.pages_open >= self.max_open_pages {
                        let cause = FlushCause::PageLimit {
                            limit: self.max_open_pages,
                        };
                        let (article, warning) = self.force_flush(acc, cause);
                        articles.push(article);
                        warnings.push(warning);
                        return Step {
                            state: AssemblerState::Idle,
                            outcome: PageOutcome::Closed,
                            articles,
                            warnings,
                        };
                    }
                    debug!("Page {}: article continues ({:?})", page_num, outcome);
                    return Step {
                        state: AssemblerState::Open(Box::new(acc)),
                        outcome: PageOutcome::NeedNextPage,
                        articles,
                        warnings,
                    };
                }
            };

            let anchor = acc.pending_start_markers.first().cloned().unwrap_or_default();
            if !stray_markers.is_empty() {
                warn!(
                    "Page {}: start marker(s) {:?} inside article anchored at {:?}",
                    page_num, stray_markers, anchor
                );
                warnings.push(SegmentationWarning::AmbiguousSegmentation {
                    page: page_num,
                    anchor: anchor.clone(),
                    stray_markers: stray_markers.clone(),
                });
            }

            let unused: Vec<String> = acc
                .pending_start_markers
                .iter()
                .skip(1)
                .filter(|m| !stray_markers.contains(m))
                .cloned()
                .collect();
            let candidates: Vec<String> = unused.iter().cloned().chain(page_markers.drain(..)).collect();
            let next_anchor = candidates
                .iter()
                .position(|m| remainder.lines().any(|line| line.trim() == m.as_str()));
            let dropped: Vec<String> = unused
                .iter()
                .take(next_anchor.unwrap_or(unused.len()))
                .cloned()
                .collect();
            if !dropped.is_empty() {
                warn!(
                    "Page {}: start marker(s) {:?} left over after article anchored at {:?}",
                    page_num, dropped, anchor
                );
                warnings.push(SegmentationWarning::AmbiguousSegmentation {
                    page: page_num,
                    anchor,
                    stray_markers: dropped,
                });
            }

            let next = next_anchor.map(|k| acc.reopen(page, remainder, candidates[k..].to_vec()));
            info!(
                "Article '{}' closed on page {} ({} page(s))",
                acc.title(),
                page_num,
                acc.pages_open
            );
            articles.push(acc.into_article(text, Termination::Complete));

            match next {
                Some(reopened) => {
                    debug!(
                        "Page {}: next article starts at {:?} after the end glyph",
                        page_num, reopened.pending_start_markers[0]
                    );
                    acc = reopened;
                }
                None => {
                    return Step {
                        state: AssemblerState::Idle,
                        outcome: PageOutcome::Closed,
                        articles,
                        warnings,
                    };
                }
            }
        }
    }

    fn force_flush(&self, acc: AccumulationState, cause: FlushCause) -> (Article, SegmentationWarning) {
        let body = self
            .normalizer
            .flush(&acc.pending_raw_text, &acc.pending_start_markers);
        let warning = SegmentationWarning::UnterminatedArticle {
            first_page: acc.first_page,
            last_page: acc.last_page,
            title: acc.title(),
            cause: cause.clone(),
        };
        warn!("{}", warning);
        (acc.into_article(body, Termination::ForcedFlush { cause }), warning)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
