//! Text normalisation: turn a page's raw, print-wrapped text into prose.
//!
//! Capture starts at the line that equals the first start marker (the drop
//! capital anchoring the body) and stops at the first line containing the
//! end glyph; text from the glyph onward is handed back as the remainder.
//! Lines are compared to the marker after trimming, so a drop capital that
//! pdfium reports with surrounding spaces still anchors. Within the capture each
//! line is re-joined to its successor:
//!
//! | line ends with            | action                                    |
//! |---------------------------|-------------------------------------------|
//! | `.` `!` `?` `:`           | keep, then a line break (paragraph end)   |
//! | whitespace                | keep one space (word boundary)            |
//! | `-` after a letter        | drop the hyphen, glue the next line on    |
//! | `-` after a space         | deliberate dash, keep it and a space      |
//! | anything else             | glue the next line on directly            |
//!
//! Blank lines are skipped without ending the capture. Afterwards
//! [`tidy`] removes invisible characters and collapses runs of spaces.

use once_cell::sync::Lazy;
use regex::Regex;

const PARAGRAPH_END: [char; 4] = ['.', '!', '?', ':'];

/// Outcome of normalising a buffer that must contain a whole article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    /// Anchor and end glyph were both found.
    Complete {
        text: String,
        /// Later start markers that appeared as lines inside the body.
        stray_markers: Vec<String>,
        /// Raw text after the end glyph; another article may start there.
        remainder: String,
    },
    /// The anchor line was found but no end glyph followed it.
    Unterminated,
    /// No line matched the anchoring start marker.
    AnchorNotFound,
}

/// Re-joins captured article lines into continuous text.
#[derive(Debug, Clone, Copy)]
pub struct TextNormalizer {
    end_marker: char,
}

impl TextNormalizer {
    pub fn new(end_marker: char) -> Self {
        Self { end_marker }
    }

    /// Cleaned article text, or an empty string when the article does not
    /// end in `raw_text` (it continues on a later page).
    pub fn normalize(&self, raw_text: &str, start_markers: &[String]) -> String {
        match self.segment(raw_text, start_markers) {
            Normalization::Complete { text, .. } => text,
            Normalization::Unterminated | Normalization::AnchorNotFound => String::new(),
        }
    }

    /// Normalise `raw_text`, reporting why nothing was produced.
    pub fn segment(&self, raw_text: &str, start_markers: &[String]) -> Normalization {
        let raw = normalise_line_endings(raw_text);
        let lines: Vec<&str> = raw.split('\n').collect();

        let Some(anchor_idx) = find_anchor(&lines, start_markers) else {
            return Normalization::AnchorNotFound;
        };

        let capture = self.capture(&lines[anchor_idx..], start_markers);
        if !capture.end_found {
            return Normalization::Unterminated;
        }
        Normalization::Complete {
            text: tidy(&capture.body, self.end_marker),
            stray_markers: capture.stray_markers,
            remainder: capture.remainder,
        }
    }

    /// Best-effort text for an article flushed without its end marker.
    ///
    /// Captures from the anchor line (or the start of the buffer when the
    /// anchor never matched) up to the end glyph or the end of the buffer.
    pub fn flush(&self, raw_text: &str, start_markers: &[String]) -> String {
        let raw = normalise_line_endings(raw_text);
        let lines: Vec<&str> = raw.split('\n').collect();
        let capture = match find_anchor(&lines, start_markers) {
            Some(idx) => self.capture(&lines[idx..], start_markers),
            None => self.capture_lines(&lines, String::new(), &[]),
        };
        tidy(&capture.body, self.end_marker)
    }

    /// `lines[0]` is the anchor line.
    fn capture(&self, lines: &[&str], start_markers: &[String]) -> Capture {
        let body = lines.first().map(|l| l.trim().to_string()).unwrap_or_default();
        let later = start_markers.get(1..).unwrap_or(&[]);
        self.capture_lines(lines.get(1..).unwrap_or(&[]), body, later)
    }

    fn capture_lines(&self, lines: &[&str], mut body: String, later_markers: &[String]) -> Capture {
        let mut stray_markers = Vec::new();
        let mut end_found = false;
        let mut remainder = String::new();

        for (i, line) in lines.iter().enumerate() {
            if let Some(pos) = line.find(self.end_marker) {
                let before = &line[..pos];
                if !before.trim().is_empty() {
                    push_line(&mut body, before, None);
                }
                let after = &line[pos + self.end_marker.len_utf8()..];
                remainder = std::iter::once(after)
                    .chain(lines[i + 1..].iter().copied())
                    .collect::<Vec<_>>()
                    .join("\n");
                end_found = true;
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if later_markers.iter().any(|m| m == trimmed) && !stray_markers.iter().any(|m| m == trimmed) {
                stray_markers.push(trimmed.to_string());
            }

            let next = lines[i + 1..].iter().copied().find(|l| !l.trim().is_empty());
            push_line(&mut body, line, next);
        }

        Capture {
            body,
            end_found,
            stray_markers,
            remainder,
        }
    }
}

struct Capture {
    body: String,
    end_found: bool,
    stray_markers: Vec<String>,
    remainder: String,
}

fn find_anchor(lines: &[&str], start_markers: &[String]) -> Option<usize> {
    let anchor = start_markers.first()?.trim();
    if anchor.is_empty() {
        return None;
    }
    lines.iter().position(|l| l.trim() == anchor)
}

/// Append one wrapped line to `body`, deciding how it joins the next one.
fn push_line(body: &mut String, line: &str, next: Option<&str>) {
    let trimmed = line.trim_end();
    let trailing_space = trimmed.len() < line.len();

    if trimmed.ends_with(PARAGRAPH_END) {
        body.push_str(trimmed);
        body.push('\n');
    } else if trailing_space {
        body.push_str(trimmed);
        body.push(' ');
    } else if let Some(stem) = trimmed.strip_suffix('-') {
        if is_deliberate_hyphen(stem) {
            body.push_str(trimmed);
            if !next.is_some_and(|n| n.starts_with(char::is_whitespace)) {
                body.push(' ');
            }
        } else {
            body.push_str(stem);
        }
    } else {
        body.push_str(trimmed);
    }
}

/// A dash preceded by a space is typeset on purpose; a justification
/// hyphen always directly follows a letter. The line break stands in for
/// the space after it.
fn is_deliberate_hyphen(stem: &str) -> bool {
    stem.is_empty() || stem.ends_with(char::is_whitespace)
}

/// Re-join already split lines; exposed for line-level callers and tests.
pub fn reflow(text: &str) -> String {
    let raw = normalise_line_endings(text);
    let lines: Vec<&str> = raw.split('\n').collect();
    let mut body = String::new();
    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let next = lines[i + 1..].iter().copied().find(|l| !l.trim().is_empty());
        push_line(&mut body, line, next);
    }
    collapse_spaces(&body).trim_end().to_string()
}

// ── Final pass ───────────────────────────────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Final cleanup: cut at the end glyph, strip invisible characters
/// (soft hyphens, zero-width spaces, BOM), collapse space runs, trim the end.
///
/// Idempotent: `tidy(tidy(s)) == tidy(s)`.
pub fn tidy(text: &str, end_marker: char) -> String {
    let cut = match text.find(end_marker) {
        Some(pos) => &text[..pos],
        None => text,
    };
    let visible = remove_invisible_chars(cut);
    collapse_spaces(&visible).trim_end().to_string()
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

fn collapse_spaces(input: &str) -> String {
    RE_SPACES.replace_all(input, " ").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn markers(m: &[&str]) -> Vec<String> {
        m.iter().map(|s| s.to_string()).collect()
    }

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new('■')
    }

    #[test]
    fn test_wrap_hyphen_removed() {
        assert_eq!(reflow("exam-\nple"), "example");
    }

    #[test]
    fn test_deliberate_hyphen_kept() {
        assert_eq!(reflow("wait - one"), "wait - one");
        assert_eq!(reflow("wait -\none"), "wait - one");
        assert_eq!(reflow("wait -\n one"), "wait - one");
    }

    #[test]
    fn test_suspended_hyphen_with_trailing_space_kept() {
        assert_eq!(reflow("Ein- \nund Ausgang"), "Ein- und Ausgang");
    }

    #[test]
    fn test_paragraph_end_keeps_break() {
        assert_eq!(reflow("Ende.\nNeu!\nFrage?\nAlso:\nweiter"), "Ende.\nNeu!\nFrage?\nAlso:\nweiter");
    }

    #[test]
    fn test_trailing_space_keeps_word_gap() {
        assert_eq!(reflow("zwei \nWörter"), "zwei Wörter");
        assert_eq!(reflow("Satz. \nNächster"), "Satz.\nNächster");
    }

    #[test]
    fn test_plain_line_glued() {
        assert_eq!(reflow("Wort\nteil"), "Wortteil");
    }

    #[test]
    fn test_double_space_collapse() {
        assert_eq!(tidy("foo  bar", '■'), "foo bar");
        assert_eq!(tidy("a     b  c", '■'), "a b c");
    }

    #[test]
    fn test_tidy_cuts_at_glyph_and_strips_invisible() {
        assert_eq!(tidy("Text.\u{00AD} ■ Werbung", '■'), "Text.");
        assert_eq!(tidy("Zeit\u{00AD}ung", '■'), "Zeitung");
    }

    #[test]
    fn test_normalize_from_anchor_to_glyph() {
        let raw = "augustiner:in\nWohnen\nA\nnstatt zu warten, \nhandeln wir jetzt.\nDas ist \nwich-\ntig. ■ Impressum\nNächste Seite";
        let text = normalizer().normalize(raw, &markers(&["A"]));
        assert_eq!(text, "Anstatt zu warten, handeln wir jetzt.\nDas ist wichtig.");
    }

    #[test]
    fn test_crlf_input() {
        let raw = "A\r\nnders \r\nals gedacht.\r\n■\r\n";
        assert_eq!(normalizer().normalize(raw, &markers(&["A"])), "Anders als gedacht.");
    }

    #[test]
    fn test_blank_lines_do_not_stop_capture() {
        let raw = "A\nlles \n\n   \nbleibt.\n■";
        assert_eq!(normalizer().normalize(raw, &markers(&["A"])), "Alles bleibt.");
    }

    #[test]
    fn test_missing_glyph_returns_empty() {
        let raw = "A\nnfang ohne \nEnde";
        assert_eq!(normalizer().normalize(raw, &markers(&["A"])), "");
        assert_eq!(normalizer().segment(raw, &markers(&["A"])), Normalization::Unterminated);
    }

    #[test]
    fn test_missing_anchor() {
        let raw = "Kein Anker hier.\n■";
        assert_eq!(normalizer().segment(raw, &markers(&["A"])), Normalization::AnchorNotFound);
        assert_eq!(normalizer().segment(raw, &[]), Normalization::AnchorNotFound);
    }

    #[test]
    fn test_first_marker_anchors_and_later_ones_are_stray() {
        let raw = "D\nas erste. \nB\neginnt zu früh.\n■";
        match normalizer().segment(raw, &markers(&["D", "B"])) {
            Normalization::Complete { text, stray_markers, .. } => {
                assert!(text.starts_with("Das erste."));
                assert_eq!(stray_markers, vec!["B"]);
            }
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn test_marker_after_glyph_is_not_stray() {
        let raw = "D\nas erste.\n■\nB\neginnt danach.\n■";
        match normalizer().segment(raw, &markers(&["D", "B"])) {
            Normalization::Complete { text, stray_markers, .. } => {
                assert_eq!(text, "Das erste.");
                assert!(stray_markers.is_empty());
            }
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn test_remainder_after_glyph_is_returned() {
        let raw = "D\nas erste. ■ Kasten\nZwei\nB\neginnt danach.\n■";
        match normalizer().segment(raw, &markers(&["D", "B"])) {
            Normalization::Complete { text, remainder, .. } => {
                assert_eq!(text, "Das erste.");
                assert_eq!(remainder, " Kasten\nZwei\nB\neginnt danach.\n■");
            }
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn test_anchor_line_matched_after_trimming() {
        let raw = "  A \nlles da.\n■";
        assert_eq!(normalizer().normalize(raw, &markers(&["A"])), "Alles da.");
    }

    #[test]
    fn test_flush_without_glyph_takes_rest_of_buffer() {
        let raw = "Kopf\nA\nbgebrochen \nmitten im Satz";
        assert_eq!(normalizer().flush(raw, &markers(&["A"])), "Abgebrochen mitten im Satz");
    }

    #[test]
    fn test_flush_without_anchor_takes_whole_buffer() {
        let raw = "ohne \nAnker";
        assert_eq!(normalizer().flush(raw, &markers(&["X"])), "ohne Anker");
    }

    #[test]
    fn test_second_pass_on_clean_text_is_stable() {
        let raw = "A\nlles ist \nklar.\nNoch ein \nSatz!\n■";
        let once = normalizer().normalize(raw, &markers(&["A"]));
        let again = normalizer().normalize(&format!("A\n{}\n■", &once[1..]), &markers(&["A"]));
        assert_eq!(once, again);
    }

    proptest! {
        #[test]
        fn prop_tidy_idempotent(s in "[a-zA-Z .\u{00AD}\n■-]{0,60}") {
            let once = tidy(&s, '■');
            prop_assert_eq!(tidy(&once, '■'), once.clone());
            prop_assert!(!once.contains("  "));
            prop_assert!(!once.contains('■'));
        }

        #[test]
        fn prop_normalize_idempotent_on_clean_sentences(
            sentences in proptest::collection::vec("[a-z]{1,8}( [a-z]{1,8}){0,4}[.!?]", 1..6)
        ) {
            let anchor = markers(&["A"]);
            let raw = format!("A\n{}\n■", sentences.join("\n"));
            let once = normalizer().normalize(&raw, &anchor);
            let again = normalizer().normalize(&format!("A\n{}\n■", &once[1..]), &anchor);
            prop_assert_eq!(&once, &again);
            prop_assert!(!once.contains("  "));
        }
    }
}
