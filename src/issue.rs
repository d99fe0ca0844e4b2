//! Issue-level entry points: run a whole magazine through the segmenter.
//!
//! Two layers:
//!
//! * [`segment_pages`] / [`segment_pages_into`] are synchronous and work on
//!   already extracted [`PageInput`]s, so tests and hosts with their own
//!   PDF stack never touch pdfium.
//! * [`segment_issue`] and friends resolve a path or URL, extract the text
//!   layer with pdfium and feed the result to the same page loop.
//!
//! Pages are visited strictly in order. Cancellation is honoured between
//! pages; an extraction failure aborts the issue and drops whatever article
//! was still open, so nothing half-formed is ever published.

use crate::config::SegmentationConfig;
use crate::error::IssueError;
use crate::model::{PageImage, PageInput};
use crate::output::{IssueOutput, IssueStats, PageCategory, PageReport};
use crate::pipeline::category::{CategoryIdentifier, RegionCategoryIdentifier};
use crate::pipeline::extract::{self, ExtractedIssue, LogicalPage};
use crate::pipeline::images::{FallbackImageResolver, ImageResolver};
use crate::pipeline::input;
use crate::pipeline::publish::{ArticleSink, DiscardSink};
use crate::segment::{ArticleAssembler, AssemblerState, Step};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

// ── Page loop ────────────────────────────────────────────────────────────

/// Segment pages that were already extracted.
///
/// # Errors
/// The first `Err` page aborts the run and is returned as-is; the article
/// open at that point is dropped. [`IssueError::Cancelled`] when the
/// configured cancel flag is raised between two pages.
///
/// # Example
/// ```rust
/// use pdf2articles::{segment_pages, BBox, PageInput, Rgb, SegmentationConfig, Span};
///
/// let accent = Rgb(0xe30613);
/// let page = PageInput::new(1, "wohnen")
///     .with_spans(vec![
///         Span::new("Daheim", "AmasisMTStd-Bold", 28.0, Rgb::BLACK, BBox::default()),
///         Span::new("D", "AmasisMTStd", 48.0, accent, BBox::default()),
///         Span::new("■", "ZapfDingbats", 9.0, accent, BBox::default()),
///     ])
///     .with_raw_text("Daheim\nD\nrinnen ist es warm.\n■");
///
/// let output = segment_pages(vec![Ok(page)], &SegmentationConfig::default()).unwrap();
/// assert_eq!(output.articles[0].title, "Daheim");
/// assert_eq!(output.articles[0].body, "Drinnen ist es warm.");
/// ```
pub fn segment_pages<I>(pages: I, config: &SegmentationConfig) -> Result<IssueOutput, IssueError>
where
    I: IntoIterator<Item = Result<PageInput, IssueError>>,
{
    segment_pages_into(pages, config, &mut DiscardSink)
}

/// Like [`segment_pages`], handing each article to `sink` as soon as it
/// closes.
pub fn segment_pages_into<I>(
    pages: I,
    config: &SegmentationConfig,
    sink: &mut dyn ArticleSink,
) -> Result<IssueOutput, IssueError>
where
    I: IntoIterator<Item = Result<PageInput, IssueError>>,
{
    let start = Instant::now();
    let pages = pages.into_iter();
    let total = pages.size_hint().0;
    let assembler = ArticleAssembler::new(config);
    let mut run = Run::new(config, sink);

    if let Some(cb) = &config.progress_callback {
        cb.on_issue_start(total);
    }

    let mut state = AssemblerState::Idle;
    for (idx, page) in pages.enumerate() {
        if config.is_cancelled() {
            info!("Cancelled before page {}", idx);
            return Err(IssueError::Cancelled { next_page: idx });
        }
        let page = page?;

        if let Some(cb) = &config.progress_callback {
            cb.on_page_start(page.page_num, total);
        }

        let step = assembler.step(state, &page);
        info!(
            "Page {} [{}]: {:?}{}",
            page.page_num,
            page.category,
            step.outcome,
            if step.articles.is_empty() {
                String::new()
            } else {
                format!(", {} article(s)", step.articles.len())
            }
        );

        let segmented = !page.is_blank();
        run.output.pages.push(PageCategory {
            page_num: page.page_num,
            category: page.category.clone(),
            segmented,
        });
        run.output.stats.total_pages += 1;
        if segmented {
            run.output.stats.segmented_pages += 1;
        } else {
            run.output.stats.skipped_pages += 1;
        }

        state = run.absorb(step)?;

        if let Some(cb) = &config.progress_callback {
            cb.on_page_complete(page.page_num, total, &page.category);
        }
    }

    let step = assembler.finish(state);
    run.absorb(step)?;
    run.sink.finish()?;

    let mut output = run.output;
    output.metadata.logical_pages = output.stats.total_pages;
    output.stats.total_duration_ms = start.elapsed().as_millis() as u64;

    if let Some(cb) = &config.progress_callback {
        cb.on_issue_complete(output.stats.total_pages, output.stats.articles);
    }
    info!(
        "Segmentation complete: {} article(s) ({} complete) from {} page(s), {} warning(s)",
        output.stats.articles, output.stats.complete_articles, output.stats.total_pages, output.stats.warnings
    );
    Ok(output)
}

/// Output being collected by one page loop.
struct Run<'a> {
    config: &'a SegmentationConfig,
    sink: &'a mut dyn ArticleSink,
    output: IssueOutput,
}

impl<'a> Run<'a> {
    fn new(config: &'a SegmentationConfig, sink: &'a mut dyn ArticleSink) -> Self {
        Self {
            config,
            sink,
            output: IssueOutput::default(),
        }
    }

    /// Publish a step's articles, record its warnings, return its state.
    fn absorb(&mut self, step: Step) -> Result<AssemblerState, IssueError> {
        for warning in step.warnings {
            if let Some(cb) = &self.config.progress_callback {
                cb.on_warning(&warning);
            }
            self.output.stats.warnings += 1;
            self.output.warnings.push(warning);
        }

        for article in step.articles {
            self.sink.publish(&article)?;
            if let Some(cb) = &self.config.progress_callback {
                cb.on_article(&article);
            }
            let stats = &mut self.output.stats;
            stats.articles += 1;
            if article.is_complete() {
                stats.complete_articles += 1;
            } else {
                stats.forced_flushes += 1;
            }
            self.output.articles.push(article);
        }

        Ok(step.state)
    }
}

/// Signals of every page seen in isolation, without running the state
/// machine. Useful when tuning a [`crate::LayoutProfile`].
pub fn inspect_pages(pages: &[PageInput], config: &SegmentationConfig) -> Vec<PageReport> {
    let assembler = ArticleAssembler::new(config);
    pages
        .iter()
        .map(|page| {
            let signals = assembler.signals(page);
            PageReport {
                page_num: page.page_num,
                category: page.category.clone(),
                span_count: page.spans.len(),
                headlines: signals.headlines,
                start_markers: signals.start_markers,
                end_marker_count: signals.end_marker_count,
                malformed: page.malformed.clone(),
            }
        })
        .collect()
}

// ── PDF entry points ─────────────────────────────────────────────────────

/// Segment a PDF file or URL into articles.
///
/// # Errors
/// Input, pdfium and extraction failures, and [`IssueError::Cancelled`].
/// Non-fatal problems are returned in [`IssueOutput::warnings`] instead.
pub async fn segment_issue(
    input_str: impl AsRef<str>,
    config: &SegmentationConfig,
) -> Result<IssueOutput, IssueError> {
    segment_issue_into(input_str, config, &mut DiscardSink).await
}

/// Like [`segment_issue`], publishing each article to `sink` as it closes.
pub async fn segment_issue_into(
    input_str: impl AsRef<str>,
    config: &SegmentationConfig,
    sink: &mut dyn ArticleSink,
) -> Result<IssueOutput, IssueError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting segmentation: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let issue_number = resolved.issue_number();

    let extract_start = Instant::now();
    let extracted = extract::extract_issue(resolved.path(), config).await?;
    let extraction_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} physical page(s) in {}ms",
        extracted.physical_pages, extraction_duration_ms
    );

    let physical_pages = extracted.physical_pages;
    let prepared = prepare_pages(extracted, config);
    let cover_image_id = prepared.cover_image_id.clone();

    let mut output = segment_pages_into(prepared.pages, config, sink)?;
    output.metadata.issue_number = issue_number;
    output.metadata.physical_pages = physical_pages;
    output.metadata.cover_image_id = cover_image_id;
    output.stats.extraction_duration_ms = extraction_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Synchronous wrapper around [`segment_issue`].
///
/// Creates a temporary tokio runtime internally.
pub fn segment_issue_sync(
    input_str: impl AsRef<str>,
    config: &SegmentationConfig,
) -> Result<IssueOutput, IssueError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| IssueError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(segment_issue(input_str, config))
}

/// Segment an issue and write the whole [`IssueOutput`] as pretty JSON.
///
/// Writes to a temp file next to `output_path` and renames it, so readers
/// never see a partial file.
pub async fn segment_issue_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &SegmentationConfig,
) -> Result<IssueStats, IssueError> {
    let output = segment_issue(input_str, config).await?;
    let path = output_path.as_ref();
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| IssueError::Internal(format!("Serialising output: {}", e)))?;
    write_atomic(path, json.as_bytes()).await?;
    info!("Wrote {} article(s) to {}", output.articles.len(), path.display());
    Ok(output.stats)
}

/// Per-page classification report of a PDF; nothing is assembled.
pub async fn inspect(input_str: impl AsRef<str>, config: &SegmentationConfig) -> Result<Vec<PageReport>, IssueError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let extracted = extract::extract_issue(resolved.path(), config).await?;
    let pages = prepare_pages(extracted, config)
        .pages
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(inspect_pages(&pages, config))
}

pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IssueError> {
    let write_err = |e| IssueError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Logical pages → PageInput ────────────────────────────────────────────

struct PreparedPages {
    pages: Vec<Result<PageInput, IssueError>>,
    cover_image_id: Option<String>,
}

/// Attach category and image to every logical page.
///
/// * Page 0 is the cover; with `skip_cover_page` it is passed on without
///   spans so the assembler ignores it. Its image id becomes the cover id.
/// * Editorial pages are cropped to the top of the page and illustrated
///   with the cover image.
fn prepare_pages(extracted: ExtractedIssue, config: &SegmentationConfig) -> PreparedPages {
    let profile = &config.profile;
    let identifier: Arc<dyn CategoryIdentifier> = config
        .category_identifier
        .clone()
        .unwrap_or_else(|| Arc::new(RegionCategoryIdentifier::new(profile)));
    let images: Arc<dyn ImageResolver> = config
        .image_resolver
        .clone()
        .unwrap_or_else(|| Arc::new(FallbackImageResolver::new(config.fallback_image_id.clone())));
    let editorial = profile.editorial_category.to_lowercase();

    let mut cover_image_id = None;
    let mut pages = Vec::with_capacity(extracted.pages.len());

    for logical in extracted.pages {
        let logical = match logical {
            Ok(page) => page,
            Err(e) => {
                pages.push(Err(e));
                break;
            }
        };
        let page_num = logical.page_num;

        if page_num == 0 {
            cover_image_id = images.resolve(&logical).image_id;
        }

        if let Some(reason) = &logical.malformed {
            pages.push(Ok(PageInput::malformed(
                page_num,
                profile.fallback_category.clone(),
                reason.clone(),
            )));
            continue;
        }

        let spans = logical.spans();
        let category = identifier.identify(page_num, &spans);

        if page_num == 0 && config.skip_cover_page {
            debug!("Page 0: cover, not segmented");
            pages.push(Ok(PageInput::new(0, category).with_image(images.resolve(&logical))));
            continue;
        }

        let page = if category.to_lowercase().contains(&editorial) {
            editorial_page(&logical, category, profile.editorial_crop_fraction, cover_image_id.as_deref())
        } else {
            PageInput::new(page_num, category)
                .with_spans(spans)
                .with_raw_text(logical.raw_text())
                .with_image(images.resolve(&logical))
        };
        pages.push(Ok(page));
    }

    PreparedPages { pages, cover_image_id }
}

fn editorial_page(logical: &LogicalPage, category: String, fraction: f32, cover_image_id: Option<&str>) -> PageInput {
    let cropped = logical.cropped_to_top(fraction);
    debug!(
        "Page {}: editorial, cropped to top {:.0}%",
        logical.page_num,
        fraction * 100.0
    );
    PageInput::new(logical.page_num, category)
        .with_spans(cropped.spans())
        .with_raw_text(cropped.raw_text())
        .with_image(PageImage {
            image_id: cover_image_id.map(str::to_string),
            image_html: String::new(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CancelFlag;
    use crate::error::{FlushCause, SegmentationWarning};
    use crate::model::{BBox, Rgb, Span};
    use crate::output::Article;
    use crate::pipeline::extract::CharInfo;

    const ACCENT: Rgb = Rgb(0xe30613);

    /// The end glyph gets a coloured span whenever `raw` prints one.
    fn article_page(n: usize, category: &str, raw: &str) -> PageInput {
        let mut spans = vec![
            Span::new("Titel", "AmasisMTStd-Bold", 24.0, Rgb::BLACK, BBox::default()),
            Span::new("A", "AmasisMTStd", 48.0, ACCENT, BBox::default()),
        ];
        if raw.contains('■') {
            spans.push(Span::new("■", "ZapfDingbats", 9.0, ACCENT, BBox::default()));
        }
        PageInput::new(n, category).with_spans(spans).with_raw_text(raw)
    }

    #[test]
    fn stats_and_page_categories() {
        let pages = vec![
            Ok(PageInput::new(0, "cover")),
            Ok(article_page(1, "wohnen", "A\nlles.\n■")),
            Ok(PageInput::malformed(2, "wohnen", "broken")),
        ];
        let out = segment_pages(pages, &SegmentationConfig::default()).unwrap();
        assert_eq!(out.articles.len(), 1);
        assert_eq!(out.stats.total_pages, 3);
        assert_eq!(out.stats.segmented_pages, 1);
        assert_eq!(out.stats.skipped_pages, 2);
        assert_eq!(out.stats.complete_articles, 1);
        assert_eq!(out.stats.warnings, 1);
        assert_eq!(out.metadata.logical_pages, 3);
        assert_eq!(out.pages[1].category, "wohnen");
        assert!(!out.pages[0].segmented);
    }

    #[test]
    fn extraction_error_aborts_and_drops_open_article() {
        let mut sink: Vec<Article> = Vec::new();
        let pages = vec![
            Ok(article_page(1, "wohnen", "A\nber")),
            Err(IssueError::Extraction {
                page: 2,
                detail: "boom".into(),
            }),
        ];
        let err = segment_pages_into(pages, &SegmentationConfig::default(), &mut sink).unwrap_err();
        assert!(matches!(err, IssueError::Extraction { page: 2, .. }));
        assert!(sink.is_empty());
    }

    #[test]
    fn cancellation_between_pages() {
        let flag = CancelFlag::new();
        flag.cancel();
        let config = SegmentationConfig::builder().cancel_flag(flag).build().unwrap();
        let err = segment_pages(vec![Ok(article_page(1, "wohnen", "A\nb.\n■"))], &config).unwrap_err();
        assert!(matches!(err, IssueError::Cancelled { next_page: 0 }));
    }

    #[test]
    fn open_article_flushed_at_end_of_issue() {
        let mut sink: Vec<Article> = Vec::new();
        let out = segment_pages_into(
            vec![Ok(article_page(4, "reise", "A\nm Meer"))],
            &SegmentationConfig::default(),
            &mut sink,
        )
        .unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].body, "Am Meer");
        assert_eq!(out.stats.forced_flushes, 1);
        assert!(matches!(
            &out.warnings[0],
            SegmentationWarning::UnterminatedArticle {
                cause: FlushCause::EndOfIssue,
                ..
            }
        ));
    }

    #[test]
    fn inspect_reports_signals() {
        let pages = vec![article_page(1, "wohnen", "A\nx")];
        let reports = inspect_pages(&pages, &SegmentationConfig::default());
        assert_eq!(reports[0].headlines, vec!["Titel"]);
        assert_eq!(reports[0].start_markers, vec!["A"]);
        assert_eq!(reports[0].span_count, 2);
        assert_eq!(reports[0].end_marker_count, 0);
    }

    fn chars(text: &str, font: &str, size: f32, color: Rgb, x: f32, y: f32) -> Vec<CharInfo> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| CharInfo {
                ch,
                font_name: Some(font.into()),
                font_size: Some(size),
                color,
                bold: false,
                bbox: Some(BBox::new(x + i as f32 * 4.0, y, x + i as f32 * 4.0 + 4.0, y + size)),
            })
            .collect()
    }

    fn line_break() -> CharInfo {
        CharInfo {
            ch: '\n',
            font_name: None,
            font_size: None,
            color: Rgb::BLACK,
            bold: false,
            bbox: None,
        }
    }

    fn logical(page_num: usize, chars: Vec<CharInfo>) -> LogicalPage {
        LogicalPage {
            page_num,
            physical_page: page_num,
            width: 595.0,
            height: 842.0,
            chars,
            malformed: None,
        }
    }

    #[test]
    fn prepare_pages_handles_cover_and_editorial() {
        let mut editorial = chars("Editorial", "Frutiger", 10.0, Rgb::BLACK, 70.0, 35.0);
        editorial.push(line_break());
        editorial.extend(chars("L", "Amasis", 30.0, ACCENT, 60.0, 100.0));
        editorial.push(line_break());
        editorial.extend(chars("iebe Leser.", "Frutiger", 9.0, Rgb(0x2e2013), 90.0, 100.0));
        editorial.push(line_break());
        editorial.extend(chars("Fusszeile", "Frutiger", 9.0, Rgb(0x2e2013), 60.0, 800.0));

        let extracted = ExtractedIssue {
            physical_pages: 2,
            pages: vec![
                Ok(logical(0, chars("Titelbild", "Frutiger", 40.0, Rgb::BLACK, 100.0, 300.0))),
                Ok(logical(1, editorial)),
            ],
        };
        let config = SegmentationConfig::builder().fallback_image_id("cover-img").build().unwrap();
        let prepared = prepare_pages(extracted, &config);

        assert_eq!(prepared.cover_image_id.as_deref(), Some("cover-img"));
        let pages: Vec<PageInput> = prepared.pages.into_iter().map(Result::unwrap).collect();
        assert!(pages[0].spans.is_empty(), "cover is not segmented");
        assert_eq!(pages[1].category, "editorial");
        assert!(!pages[1].raw_text.contains("Fusszeile"), "cropped to top of page");
        assert_eq!(pages[1].image.image_id.as_deref(), Some("cover-img"));
    }

    #[test]
    fn prepare_pages_stops_at_extraction_error() {
        let extracted = ExtractedIssue {
            physical_pages: 3,
            pages: vec![
                Ok(logical(0, Vec::new())),
                Err(IssueError::Extraction {
                    page: 1,
                    detail: "x".into(),
                }),
            ],
        };
        let prepared = prepare_pages(extracted, &SegmentationConfig::default());
        assert_eq!(prepared.pages.len(), 2);
        assert!(prepared.pages[1].is_err());
    }

    #[tokio::test]
    async fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("issue.json");
        write_atomic(&path, b"{}").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(!path.with_extension("json.tmp").exists());
    }
}
