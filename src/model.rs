//! Page-level input types shared by the segmentation stages.
//!
//! A [`PageInput`] is what the text-extraction collaborator hands to the
//! article assembler: every styled [`Span`] on one logical page plus the
//! page's raw text, its category and its image reference. All of these are
//! immutable once built; the only mutable state in the crate lives inside
//! [`crate::segment::assemble`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned box in page space: points, origin top-left, `y` grows down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// True when `other` lies completely inside `self` (edges inclusive).
    pub fn contains(&self, other: &BBox) -> bool {
        self.x0 <= other.x0 && other.x1 <= self.x1 && self.y0 <= other.y0 && other.y1 <= self.y1
    }

    /// Shift the box left by `dx` points.
    pub fn shifted_left(&self, dx: f32) -> BBox {
        BBox::new(self.x0 - dx, self.y0, self.x1 - dx, self.y1)
    }
}

/// A 24-bit RGB ink colour.
///
/// Serialised as a `#rrggbb` string so layout profiles stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x000000);

    pub fn from_components(r: u8, g: u8, b: u8) -> Self {
        Rgb(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Parse `#rrggbb` or `rrggbb`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Rgb)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0 & 0xFF_FFFF)
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse_hex(&value).ok_or_else(|| format!("invalid colour '{value}', expected #rrggbb"))
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// One run of text sharing a single font, size and colour.
///
/// Font metadata is optional because some content streams carry spans whose
/// font dictionary could not be resolved; the classifier skips those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    #[serde(default)]
    pub font_name: Option<String>,
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub color: Rgb,
    #[serde(default)]
    pub bbox: BBox,
    #[serde(default)]
    pub bold: bool,
}

impl Span {
    /// A span with complete font metadata.
    pub fn new(
        text: impl Into<String>,
        font_name: impl Into<String>,
        font_size: f32,
        color: Rgb,
        bbox: BBox,
    ) -> Self {
        Self {
            text: text.into(),
            font_name: Some(font_name.into()),
            font_size: Some(font_size),
            color,
            bbox,
            bold: false,
        }
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }
}

/// Font name without the subset tag of an embedded subset font
/// (`ABCDEF+AmasisMTStd-Bold` becomes `AmasisMTStd-Bold`).
pub fn base_font_name(font_name: &str) -> &str {
    match font_name.split_once('+') {
        Some((tag, base)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => base,
        _ => font_name,
    }
}

/// What a span means to the segmenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanRole {
    Headline,
    StartMarker,
    EndMarker,
    Body,
}

/// A span together with the role the classifier gave it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedSpan<'a> {
    pub span: &'a Span,
    pub role: SpanRole,
}

/// Signals gathered from one page, folded onto whatever was carried in.
///
/// `headlines` and `start_markers` include the carried-in entries;
/// `end_marker_count` counts this page only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSignals {
    pub headlines: Vec<String>,
    pub start_markers: Vec<String>,
    pub end_marker_count: usize,
}

/// Image reference for a page, as resolved by an image collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// Identifier of the lead image, if the page has one.
    pub image_id: Option<String>,
    /// Markup embedding any further images; attached verbatim.
    pub image_html: String,
}

impl PageImage {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            image_id: Some(id.into()),
            image_html: String::new(),
        }
    }
}

/// Everything the assembler needs to know about one logical page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageInput {
    /// 0-indexed logical page number (after spread splitting).
    pub page_num: usize,
    pub category: String,
    pub spans: Vec<Span>,
    pub raw_text: String,
    #[serde(default)]
    pub image: PageImage,
    /// Set when the page's span dictionary was absent or unparsable.
    #[serde(default)]
    pub malformed: Option<String>,
}

impl PageInput {
    pub fn new(page_num: usize, category: impl Into<String>) -> Self {
        Self {
            page_num,
            category: category.into(),
            ..Self::default()
        }
    }

    pub fn with_spans(mut self, spans: Vec<Span>) -> Self {
        self.spans = spans;
        self
    }

    pub fn with_raw_text(mut self, raw_text: impl Into<String>) -> Self {
        self.raw_text = raw_text.into();
        self
    }

    pub fn with_image(mut self, image: PageImage) -> Self {
        self.image = image;
        self
    }

    pub fn malformed(page_num: usize, category: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            page_num,
            category: category.into(),
            malformed: Some(reason.into()),
            ..Self::default()
        }
    }

    /// A page with nothing the segmenter can read.
    pub fn is_blank(&self) -> bool {
        self.malformed.is_some() || self.spans.is_empty()
    }
}
