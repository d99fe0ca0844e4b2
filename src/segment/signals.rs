//! Headline and marker extraction: fold one page's classified spans into
//! [`PageSignals`].
//!
//! Carried-in headlines and start markers are extended, never replaced, so
//! an article open across several pages keeps everything seen so far. While
//! an article is open, newly detected start markers are discarded: a
//! continuation page's decorative initials must not look like a second
//! article starting.

use crate::config::LayoutProfile;
use crate::model::{PageSignals, Span, SpanRole};
use crate::segment::classify::SpanClassifier;
use tracing::debug;

/// Builds [`PageSignals`] from a page's spans.
#[derive(Debug, Clone, Copy)]
pub struct SignalExtractor<'p> {
    classifier: SpanClassifier<'p>,
}

impl<'p> SignalExtractor<'p> {
    pub fn new(profile: &'p LayoutProfile) -> Self {
        Self {
            classifier: SpanClassifier::new(profile),
        }
    }

    /// Signals of a page seen on its own, with nothing carried in.
    pub fn extract_fresh(&self, spans: &[Span]) -> PageSignals {
        self.extract(spans, &[], &[], false)
    }

    /// Fold `spans` onto the carried lists.
    ///
    /// The returned `end_marker_count` covers this page only.
    pub fn extract(
        &self,
        spans: &[Span],
        carried_start_markers: &[String],
        carried_headlines: &[String],
        suppress_new_markers: bool,
    ) -> PageSignals {
        let mut signals = PageSignals {
            headlines: carried_headlines.to_vec(),
            start_markers: carried_start_markers.to_vec(),
            end_marker_count: 0,
        };

        for classified in self.classifier.classify_all(spans) {
            let text = classified.span.text.trim();
            match classified.role {
                SpanRole::StartMarker if suppress_new_markers => {
                    debug!("Ignoring start marker {:?} on continuation page", text);
                }
                SpanRole::StartMarker => {
                    debug!("Start marker {:?}", text);
                    signals.start_markers.push(text.to_string());
                }
                SpanRole::EndMarker => {
                    signals.end_marker_count += 1;
                }
                SpanRole::Headline if !text.is_empty() => {
                    debug!("Headline span {:?}", text);
                    signals.headlines.push(text.to_string());
                }
                SpanRole::Headline | SpanRole::Body => {}
            }
        }

        signals
    }
}
