//! Span classification: decide what a single styled span means.
//!
//! Rules, first match wins:
//!
//! 1. coloured ink (not in [`LayoutProfile::ignored_ink_colors`]), short,
//!    non-numeric and not the end glyph → [`SpanRole::StartMarker`]
//! 2. coloured ink containing the end glyph → [`SpanRole::EndMarker`]
//! 3. larger than the headline size, or set in a bold display face →
//!    [`SpanRole::Headline`]
//! 4. anything else → [`SpanRole::Body`]
//!
//! Spans without usable font metadata get no role at all.

use crate::config::LayoutProfile;
use crate::model::{ClassifiedSpan, Span, SpanRole};

/// Applies a [`LayoutProfile`] to individual spans.
#[derive(Debug, Clone, Copy)]
pub struct SpanClassifier<'p> {
    profile: &'p LayoutProfile,
}

impl<'p> SpanClassifier<'p> {
    pub fn new(profile: &'p LayoutProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &'p LayoutProfile {
        self.profile
    }

    /// Classify one span, or `None` when its font metadata is missing or
    /// unusable.
    pub fn classify(&self, span: &Span) -> Option<SpanRole> {
        let font_name = span.font_name.as_deref()?;
        let font_size = span.font_size.filter(|s| s.is_finite() && *s > 0.0)?;
        let text = span.text.trim();
        if text.is_empty() {
            return Some(SpanRole::Body);
        }

        if !self.profile.is_ignored_ink(span.color) {
            if self.is_start_marker_text(&span.text, text) {
                return Some(SpanRole::StartMarker);
            }
            if text.contains(self.profile.end_marker) {
                return Some(SpanRole::EndMarker);
            }
        }

        if font_size > self.profile.headline_min_font_size || self.profile.is_bold_face(font_name) {
            return Some(SpanRole::Headline);
        }

        Some(SpanRole::Body)
    }

    /// Classify every span of a page, dropping the ones without a role.
    pub fn classify_all<'s>(&self, spans: &'s [Span]) -> impl Iterator<Item = ClassifiedSpan<'s>> + 's
    where
        'p: 's,
    {
        let classifier: SpanClassifier<'s> = *self;
        spans
            .iter()
            .filter_map(move |span| classifier.classify(span).map(|role| ClassifiedSpan { span, role }))
    }

    fn is_start_marker_text(&self, raw: &str, trimmed: &str) -> bool {
        let short = raw.chars().count() < self.profile.start_marker_max_len;
        let numeric = trimmed.chars().all(char::is_numeric);
        let is_glyph = trimmed.chars().eq(std::iter::once(self.profile.end_marker));
        short && !numeric && !is_glyph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Rgb};

    const ACCENT: Rgb = Rgb(0xe30613);
    const BODY_INK: Rgb = Rgb(0x2e2013);

    fn span(text: &str, font: &str, size: f32, color: Rgb) -> Span {
        Span::new(text, font, size, color, BBox::default())
    }

    fn classify(s: &Span) -> Option<SpanRole> {
        let profile = LayoutProfile::default();
        SpanClassifier::new(&profile).classify(s)
    }

    #[test]
    fn coloured_drop_capital_is_start_marker() {
        assert_eq!(
            classify(&span("A", "AmasisMTStd", 48.0, ACCENT)),
            Some(SpanRole::StartMarker)
        );
        assert_eq!(
            classify(&span("Ü ", "AmasisMTStd", 9.0, ACCENT)),
            Some(SpanRole::StartMarker)
        );
    }

    #[test]
    fn coloured_digits_are_not_start_markers() {
        assert_eq!(classify(&span("12", "Frutiger", 9.0, ACCENT)), Some(SpanRole::Body));
    }

    #[test]
    fn long_coloured_text_is_not_start_marker() {
        assert_eq!(classify(&span("Abo", "Frutiger", 9.0, ACCENT)), Some(SpanRole::Body));
    }

    #[test]
    fn coloured_glyph_is_end_marker() {
        assert_eq!(classify(&span("■", "ZapfDingbats", 9.0, ACCENT)), Some(SpanRole::EndMarker));
        assert_eq!(classify(&span("■ ", "ZapfDingbats", 9.0, ACCENT)), Some(SpanRole::EndMarker));
        assert_eq!(
            classify(&span("und das war es. ■", "Frutiger", 9.0, ACCENT)),
            Some(SpanRole::EndMarker)
        );
    }

    #[test]
    fn glyph_in_body_ink_is_ignored() {
        assert_eq!(classify(&span("■", "ZapfDingbats", 9.0, BODY_INK)), Some(SpanRole::Body));
        assert_eq!(classify(&span("A", "Frutiger", 9.0, Rgb::BLACK)), Some(SpanRole::Body));
    }

    #[test]
    fn oversize_or_display_face_is_headline() {
        assert_eq!(
            classify(&span("Leben am Rand", "Frutiger", 24.0, BODY_INK)),
            Some(SpanRole::Headline)
        );
        assert_eq!(
            classify(&span("Leben am Rand", "AmasisMTStd-Bold", 10.0, BODY_INK)),
            Some(SpanRole::Headline)
        );
    }

    #[test]
    fn subset_prefixed_display_face_is_headline() {
        assert_eq!(
            classify(&span("Leben am Rand", "ABCDEF+AmasisMTStd-Bold", 11.0, BODY_INK)),
            Some(SpanRole::Headline)
        );
        assert_eq!(
            classify(&span("Leben am Rand", "ABCDEF+Frutiger", 11.0, BODY_INK)),
            Some(SpanRole::Body)
        );
    }

    #[test]
    fn headline_threshold_is_strict() {
        assert_eq!(classify(&span("Genau zwölf", "Frutiger", 12.0, BODY_INK)), Some(SpanRole::Body));
    }

    #[test]
    fn start_marker_wins_over_headline() {
        // A drop capital is both coloured and oversize.
        assert_eq!(classify(&span("W", "AmasisMTStd-Bold", 60.0, ACCENT)), Some(SpanRole::StartMarker));
    }

    #[test]
    fn missing_font_metadata_is_skipped() {
        let mut s = span("Titel", "Frutiger", 20.0, BODY_INK);
        s.font_name = None;
        assert_eq!(classify(&s), None);

        let mut s = span("Titel", "Frutiger", 20.0, BODY_INK);
        s.font_size = Some(f32::NAN);
        assert_eq!(classify(&s), None);

        let mut s = span("Titel", "Frutiger", 20.0, BODY_INK);
        s.font_size = None;
        assert_eq!(classify(&s), None);
    }

    #[test]
    fn custom_profile_is_honoured() {
        let profile = LayoutProfile {
            end_marker: '◆',
            headline_min_font_size: 20.0,
            ..LayoutProfile::default()
        };
        let c = SpanClassifier::new(&profile);
        assert_eq!(c.classify(&span("◆", "X", 9.0, ACCENT)), Some(SpanRole::EndMarker));
        assert_eq!(c.classify(&span("■", "X", 9.0, ACCENT)), Some(SpanRole::StartMarker));
        assert_eq!(c.classify(&span("Titel", "X", 16.0, BODY_INK)), Some(SpanRole::Body));
    }

    #[test]
    fn classify_all_drops_unusable_spans() {
        let profile = LayoutProfile::default();
        let mut broken = span("?", "X", 9.0, ACCENT);
        broken.font_name = None;
        let spans = vec![span("A", "X", 40.0, ACCENT), broken, span("text", "X", 9.0, BODY_INK)];
        let roles: Vec<SpanRole> = SpanClassifier::new(&profile)
            .classify_all(&spans)
            .map(|c| c.role)
            .collect();
        assert_eq!(roles, vec![SpanRole::StartMarker, SpanRole::Body]);
    }
}
