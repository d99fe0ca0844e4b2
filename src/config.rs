//! Configuration types for issue segmentation.
//!
//! Two layers live here:
//!
//! * [`LayoutProfile`]: the typographic constants of one magazine template
//!   (ink colours, headline size, display face, end-marker glyph, category
//!   regions). Serialisable, so another publication is a JSON file away.
//! * [`SegmentationConfig`]: how a run behaves (page ceiling for open
//!   articles, cover handling, spread splitting, progress, cancellation),
//!   built via its [`SegmentationConfigBuilder`].

use crate::error::IssueError;
use crate::model::{base_font_name, BBox, Rgb};
use crate::pipeline::category::CategoryIdentifier;
use crate::pipeline::images::ImageResolver;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ── Layout profile ───────────────────────────────────────────────────────

/// Typographic grammar of one magazine template.
///
/// The defaults describe the template the heuristics were tuned on.
///
/// # Example
/// ```rust
/// use pdf2articles::LayoutProfile;
///
/// let profile = LayoutProfile::from_json(r##"{ "headline_min_font_size": 14.0 }"##).unwrap();
/// assert_eq!(profile.headline_min_font_size, 14.0);
/// assert_eq!(profile.end_marker, '■');
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutProfile {
    /// Ink colours that never carry start or end markers (body ink, black).
    pub ignored_ink_colors: Vec<Rgb>,
    /// Spans strictly larger than this (points) are headline candidates.
    pub headline_min_font_size: f32,
    /// Font names of the display face used for headlines.
    pub bold_faces: Vec<String>,
    /// Glyph terminating an article body.
    pub end_marker: char,
    /// Start markers are strictly shorter than this many characters.
    pub start_marker_max_len: usize,
    /// Where the running category label is printed.
    pub category_regions: CategoryRegions,
    /// Category used when no region yields any text (full-page adverts).
    pub fallback_category: String,
    /// Category of the editorial pages.
    pub editorial_category: String,
    /// Fraction of the page height kept on editorial pages.
    pub editorial_crop_fraction: f32,
}

impl Default for LayoutProfile {
    fn default() -> Self {
        Self {
            ignored_ink_colors: vec![Rgb(0x2e2013), Rgb::BLACK],
            headline_min_font_size: 12.0,
            bold_faces: vec!["AmasisMTStd-Bold".to_string()],
            end_marker: '■',
            start_marker_max_len: 3,
            category_regions: CategoryRegions::default(),
            fallback_category: "keine kategorie gefunden".to_string(),
            editorial_category: "editorial".to_string(),
            editorial_crop_fraction: 0.4,
        }
    }
}

impl LayoutProfile {
    /// Parse a profile from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, IssueError> {
        let profile: LayoutProfile = serde_json::from_str(json).map_err(|e| IssueError::ProfileLoad {
            path: "<inline>".into(),
            detail: e.to_string(),
        })?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a profile from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IssueError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| IssueError::ProfileLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let profile: LayoutProfile = serde_json::from_str(&json).map_err(|e| IssueError::ProfileLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn is_ignored_ink(&self, color: Rgb) -> bool {
        self.ignored_ink_colors.contains(&color)
    }

    /// Subset tags are ignored on both sides.
    pub fn is_bold_face(&self, font_name: &str) -> bool {
        let font_name = base_font_name(font_name);
        self.bold_faces.iter().any(|f| base_font_name(f) == font_name)
    }

    fn validate(&self) -> Result<(), IssueError> {
        if !self.headline_min_font_size.is_finite() || self.headline_min_font_size <= 0.0 {
            return Err(IssueError::InvalidConfig(format!(
                "headline_min_font_size must be a positive number, got {}",
                self.headline_min_font_size
            )));
        }
        if self.start_marker_max_len < 2 {
            return Err(IssueError::InvalidConfig(
                "start_marker_max_len must be ≥ 2 so single glyphs qualify".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.editorial_crop_fraction) || self.editorial_crop_fraction == 0.0 {
            return Err(IssueError::InvalidConfig(format!(
                "editorial_crop_fraction must be in (0, 1], got {}",
                self.editorial_crop_fraction
            )));
        }
        Ok(())
    }
}

/// Regions scanned for the running category label.
///
/// Odd logical pages are left-hand pages, even ones right-hand pages.
/// The side strips are only consulted when the top strip is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRegions {
    pub top_odd: BBox,
    pub top_even: BBox,
    pub side_odd: BBox,
    pub side_even: BBox,
}

impl Default for CategoryRegions {
    fn default() -> Self {
        Self {
            top_odd: BBox::new(60.0, 30.0, 200.0, 60.0),
            top_even: BBox::new(400.0, 30.0, 580.0, 60.0),
            side_odd: BBox::new(10.0, 55.0, 80.0, 450.0),
            side_even: BBox::new(450.0, 55.0, 580.0, 350.0),
        }
    }
}

// ── Run configuration ────────────────────────────────────────────────────

/// Shared flag the page loop polls between pages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configuration for segmenting one issue.
///
/// # Example
/// ```rust
/// use pdf2articles::SegmentationConfig;
///
/// let config = SegmentationConfig::builder()
///     .max_open_pages(6)
///     .skip_cover_page(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_open_pages, 6);
/// ```
#[derive(Clone)]
pub struct SegmentationConfig {
    /// Template constants driving the span classifier.
    pub profile: LayoutProfile,

    /// Pages an article may stay open without an end marker before it is
    /// flushed as unterminated. Default: 10.
    pub max_open_pages: usize,

    /// Do not segment logical page 0; keep its image as the issue cover.
    /// Default: true.
    pub skip_cover_page: bool,

    /// Split landscape spreads into left and right logical pages. Default: true.
    pub split_spreads: bool,

    /// Image id used for pages without an image of their own.
    pub fallback_image_id: Option<String>,

    /// PDF user password for encrypted issues.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Replaces the header-region category scan.
    pub category_identifier: Option<Arc<dyn CategoryIdentifier>>,

    /// Supplies page images; defaults to `fallback_image_id` for every page.
    pub image_resolver: Option<Arc<dyn ImageResolver>>,

    /// Cancellation honoured at page boundaries.
    pub cancel: Option<CancelFlag>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            profile: LayoutProfile::default(),
            max_open_pages: 10,
            skip_cover_page: true,
            split_spreads: true,
            fallback_image_id: None,
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
            category_identifier: None,
            image_resolver: None,
            cancel: None,
        }
    }
}

impl fmt::Debug for SegmentationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentationConfig")
            .field("profile", &self.profile)
            .field("max_open_pages", &self.max_open_pages)
            .field("skip_cover_page", &self.skip_cover_page)
            .field("split_spreads", &self.split_spreads)
            .field("fallback_image_id", &self.fallback_image_id)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn IssueProgressCallback>"),
            )
            .field(
                "category_identifier",
                &self.category_identifier.as_ref().map(|_| "<dyn CategoryIdentifier>"),
            )
            .field("image_resolver", &self.image_resolver.as_ref().map(|_| "<dyn ImageResolver>"))
            .field("cancel", &self.cancel.as_ref().map(CancelFlag::is_cancelled))
            .finish()
    }
}

impl SegmentationConfig {
    pub fn builder() -> SegmentationConfigBuilder {
        SegmentationConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}

/// Builder for [`SegmentationConfig`].
#[derive(Debug)]
pub struct SegmentationConfigBuilder {
    config: SegmentationConfig,
}

impl SegmentationConfigBuilder {
    pub fn profile(mut self, profile: LayoutProfile) -> Self {
        self.config.profile = profile;
        self
    }

    pub fn max_open_pages(mut self, n: usize) -> Self {
        self.config.max_open_pages = n;
        self
    }

    pub fn skip_cover_page(mut self, v: bool) -> Self {
        self.config.skip_cover_page = v;
        self
    }

    pub fn split_spreads(mut self, v: bool) -> Self {
        self.config.split_spreads = v;
        self
    }

    pub fn fallback_image_id(mut self, id: impl Into<String>) -> Self {
        self.config.fallback_image_id = Some(id.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn category_identifier(mut self, identifier: Arc<dyn CategoryIdentifier>) -> Self {
        self.config.category_identifier = Some(identifier);
        self
    }

    pub fn image_resolver(mut self, resolver: Arc<dyn ImageResolver>) -> Self {
        self.config.image_resolver = Some(resolver);
        self
    }

    pub fn cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.config.cancel = Some(flag);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SegmentationConfig, IssueError> {
        let c = &self.config;
        if c.max_open_pages == 0 {
            return Err(IssueError::InvalidConfig(
                "max_open_pages must be ≥ 1".into(),
            ));
        }
        c.profile.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_matches_template() {
        let p = LayoutProfile::default();
        assert!(p.is_ignored_ink(Rgb(0x2e2013)));
        assert!(p.is_ignored_ink(Rgb::BLACK));
        assert!(!p.is_ignored_ink(Rgb(0xe30613)));
        assert!(p.is_bold_face("AmasisMTStd-Bold"));
        assert!(!p.is_bold_face("AmasisMTStd"));
        assert_eq!(p.end_marker, '\u{25A0}');
    }

    #[test]
    fn profile_json_overrides_selected_fields() {
        let p = LayoutProfile::from_json(
            r##"{ "ignored_ink_colors": ["#111111"], "bold_faces": ["Foo-Black"], "end_marker": "◆" }"##,
        )
        .unwrap();
        assert_eq!(p.ignored_ink_colors, vec![Rgb(0x111111)]);
        assert_eq!(p.bold_faces, vec!["Foo-Black".to_string()]);
        assert_eq!(p.end_marker, '◆');
        assert_eq!(p.start_marker_max_len, 3);
    }

    #[test]
    fn profile_rejects_bad_values() {
        assert!(LayoutProfile::from_json(r#"{ "headline_min_font_size": -1.0 }"#).is_err());
        assert!(LayoutProfile::from_json(r#"{ "start_marker_max_len": 1 }"#).is_err());
        assert!(LayoutProfile::from_json(r#"{ "ignored_ink_colors": ["blue"] }"#).is_err());
    }

    #[test]
    fn profile_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, r#"{ "headline_min_font_size": 16.0 }"#).unwrap();
        let p = LayoutProfile::from_file(&path).unwrap();
        assert_eq!(p.headline_min_font_size, 16.0);

        let missing = LayoutProfile::from_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(IssueError::ProfileLoad { .. })));
    }

    #[test]
    fn builder_rejects_zero_page_ceiling() {
        let err = SegmentationConfig::builder().max_open_pages(0).build();
        assert!(matches!(err, Err(IssueError::InvalidConfig(_))));
    }

    #[test]
    fn cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let config = SegmentationConfig::builder()
            .cancel_flag(flag.clone())
            .build()
            .unwrap();
        assert!(!config.is_cancelled());
        flag.cancel();
        assert!(config.is_cancelled());
    }

    #[test]
    fn debug_redacts_password() {
        let config = SegmentationConfig::builder().password("secret").build().unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("secret"));
    }
}
