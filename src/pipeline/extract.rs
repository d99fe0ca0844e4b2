//! Page text extraction: read every character of every page via pdfium and
//! turn it into logical pages of styled spans plus raw text.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps a C++ library with thread-local state; it must not
//! run on a Tokio worker. The whole document is read on one blocking thread
//! and handed back as plain data, so everything after this stage is pure.
//!
//! ## Spreads
//!
//! A landscape page is an A3 spread of two magazine pages. With
//! `split_spreads` on, its characters are split at the horizontal midpoint
//! into a left and a right logical page (the right one shifted so both use
//! the same coordinates). Halves without visible text are dropped.
//!
//! All geometry leaving this module is top-left origin in points; pdfium's
//! own origin is bottom-left.

use crate::config::SegmentationConfig;
use crate::error::IssueError;
use crate::model::{base_font_name, BBox, Rgb, Span};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One character as pdfium reports it, already in top-left coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CharInfo {
    pub ch: char,
    pub font_name: Option<String>,
    pub font_size: Option<f32>,
    pub color: Rgb,
    pub bold: bool,
    /// `None` for characters pdfium generates itself (line breaks).
    pub bbox: Option<BBox>,
}

impl CharInfo {
    fn is_line_break(&self) -> bool {
        self.ch == '\n' || self.ch == '\r'
    }

    fn is_visible(&self) -> bool {
        !self.ch.is_whitespace() && !self.ch.is_control()
    }
}

/// One logical page: a portrait page or one half of a spread.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalPage {
    /// 0-indexed, counted after spread splitting.
    pub page_num: usize,
    /// 0-indexed page in the PDF.
    pub physical_page: usize,
    pub width: f32,
    pub height: f32,
    pub chars: Vec<CharInfo>,
    /// Why pdfium could not produce this page's text layer.
    pub malformed: Option<String>,
}

impl LogicalPage {
    pub fn spans(&self) -> Vec<Span> {
        build_spans(&self.chars)
    }

    pub fn raw_text(&self) -> String {
        raw_text(&self.chars)
    }

    pub fn has_text(&self) -> bool {
        self.chars.iter().any(CharInfo::is_visible)
    }

    /// Keep only the top `fraction` of the page.
    pub fn cropped_to_top(&self, fraction: f32) -> LogicalPage {
        let limit = self.height * fraction;
        LogicalPage {
            chars: keep_chars(&self.chars, |b| b.y0 < limit),
            height: limit,
            ..self.clone()
        }
    }
}

/// Text layer of a whole issue.
#[derive(Debug)]
pub struct ExtractedIssue {
    pub physical_pages: usize,
    /// Logical pages in order; an `Err` ends the list.
    pub pages: Vec<Result<LogicalPage, IssueError>>,
}

/// Extract the text layer of every page.
///
/// Document-level failures (binding, password, corrupt file) are returned
/// as `Err`; a page pdfium cannot open ends `pages` with an
/// [`IssueError::Extraction`].
pub async fn extract_issue(pdf_path: &Path, config: &SegmentationConfig) -> Result<ExtractedIssue, IssueError> {
    let path = pdf_path.to_path_buf();
    let password = config.password.clone();
    let split_spreads = config.split_spreads;

    tokio::task::spawn_blocking(move || extract_issue_blocking(&path, password.as_deref(), split_spreads))
        .await
        .map_err(|e| IssueError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Bind pdfium, honouring `PDFIUM_LIB_PATH` (a library file or its directory).
pub fn bind_pdfium() -> Result<Pdfium, IssueError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(custom) => {
            let custom = PathBuf::from(custom);
            let lib = if custom.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&custom)
            } else {
                custom
            };
            Pdfium::bind_to_library(lib)
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| IssueError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn extract_issue_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    split_spreads: bool,
) -> Result<ExtractedIssue, IssueError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path, password, e))?;

    let pages = document.pages();
    let physical_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", physical_pages);

    let mut logical = Vec::with_capacity(physical_pages);
    let mut next_num = 0usize;

    for idx in 0..physical_pages {
        let page = match pages.get(idx as u16) {
            Ok(page) => page,
            Err(e) => {
                logical.push(Err(IssueError::Extraction {
                    page: idx,
                    detail: format!("{:?}", e),
                }));
                break;
            }
        };

        let width = page.width().value;
        let height = page.height().value;
        let (chars, malformed) = match page_chars(&page, height) {
            Ok(chars) => (chars, None),
            Err(e) => {
                warn!("Page {}: no usable text layer: {:?}", idx, e);
                (Vec::new(), Some(format!("{:?}", e)))
            }
        };

        let whole = LogicalPage {
            page_num: 0,
            physical_page: idx,
            width,
            height,
            chars,
            malformed,
        };

        let parts = if split_spreads && width > height && whole.malformed.is_none() {
            let halves: Vec<LogicalPage> = split_spread(&whole).into_iter().filter(LogicalPage::has_text).collect();
            debug!("Page {}: spread split into {} logical page(s)", idx, halves.len());
            halves
        } else {
            vec![whole]
        };

        for mut part in parts {
            part.page_num = next_num;
            next_num += 1;
            logical.push(Ok(part));
        }
    }

    Ok(ExtractedIssue {
        physical_pages,
        pages: logical,
    })
}

fn load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> IssueError {
    let detail = format!("{:?}", e);
    if detail.to_lowercase().contains("password") {
        if password.is_some() {
            IssueError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            IssueError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        IssueError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

/// Every character of `page` in content order.
fn page_chars(page: &PdfPage, page_height: f32) -> Result<Vec<CharInfo>, PdfiumError> {
    let text = page.text()?;
    let mut chars = Vec::new();

    for c in text.chars().iter() {
        let Some(ch) = c.unicode_char() else {
            continue;
        };

        let font_name = base_font_name(&c.font_name()).to_string();
        let font_size = c.scaled_font_size().value;
        let color = c
            .fill_color()
            .map(|col| Rgb::from_components(col.red(), col.green(), col.blue()))
            .unwrap_or_default();
        let bold = matches!(
            c.font_weight(),
            Some(PdfFontWeight::Weight700Bold | PdfFontWeight::Weight800 | PdfFontWeight::Weight900)
        );
        let bbox = c.loose_bounds().ok().map(|r| {
            BBox::new(
                r.left().value,
                page_height - r.top().value,
                r.right().value,
                page_height - r.bottom().value,
            )
        });

        chars.push(CharInfo {
            ch,
            font_name: (!font_name.is_empty()).then_some(font_name),
            font_size: (font_size > 0.0).then_some(font_size),
            color,
            bold,
            bbox,
        });
    }

    Ok(chars)
}

/// Left and right half of a spread, right half moved to the origin.
pub fn split_spread(page: &LogicalPage) -> [LogicalPage; 2] {
    let mid = page.width / 2.0;
    let left = LogicalPage {
        width: mid,
        chars: keep_chars(&page.chars, |b| b.center_x() < mid),
        ..page.clone()
    };
    let right_chars = keep_chars(&page.chars, |b| b.center_x() >= mid)
        .into_iter()
        .map(|mut c| {
            c.bbox = c.bbox.map(|b| b.shifted_left(mid));
            c
        })
        .collect();
    let right = LogicalPage {
        width: page.width - mid,
        chars: right_chars,
        ..page.clone()
    };
    [left, right]
}

/// Keep line breaks and the characters whose box passes `keep`.
fn keep_chars(chars: &[CharInfo], keep: impl Fn(&BBox) -> bool) -> Vec<CharInfo> {
    chars
        .iter()
        .filter(|c| c.is_line_break() || c.bbox.as_ref().is_some_and(&keep))
        .cloned()
        .collect()
}

/// Group consecutive characters sharing font, size, colour and weight into
/// spans. Line breaks always end a span.
pub fn build_spans(chars: &[CharInfo]) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let mut open = false;

    for c in chars {
        if c.is_line_break() {
            open = false;
            continue;
        }
        if c.ch.is_control() {
            continue;
        }

        let extends = open
            && spans.last().is_some_and(|s| {
                s.font_name == c.font_name && s.font_size == c.font_size && s.color == c.color && s.bold == c.bold
            });

        if extends {
            if let Some(span) = spans.last_mut() {
                span.text.push(c.ch);
                if let Some(b) = c.bbox {
                    span.bbox = union(span.bbox, b);
                }
            }
        } else {
            spans.push(Span {
                text: c.ch.to_string(),
                font_name: c.font_name.clone(),
                font_size: c.font_size,
                color: c.color,
                bbox: c.bbox.unwrap_or_default(),
                bold: c.bold,
            });
            open = true;
        }
    }

    spans.retain(|s| !s.text.trim().is_empty());
    spans
}

fn union(a: BBox, b: BBox) -> BBox {
    if a == BBox::default() {
        return b;
    }
    BBox::new(a.x0.min(b.x0), a.y0.min(b.y0), a.x1.max(b.x1), a.y1.max(b.y1))
}

/// Page text with pdfium's generated `\r\n` reduced to `\n`.
pub fn raw_text(chars: &[CharInfo]) -> String {
    let mut out = String::with_capacity(chars.len());
    for c in chars {
        match c.ch {
            '\r' => {}
            '\n' => out.push('\n'),
            ch if ch.is_control() && ch != '\t' => {}
            ch => out.push(ch),
        }
    }
    out
}
