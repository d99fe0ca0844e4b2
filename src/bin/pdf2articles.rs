//! CLI binary for pdf2articles.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SegmentationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2articles::{
    inspect, segment_issue_into, Article, ArticleSink, DiscardSink, IssueOutput,
    IssueProgressCallback, JsonLinesSink, LayoutProfile, PageReport, ProgressCallback,
    SegmentationConfig, SegmentationWarning,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar over logical pages plus one log
/// line per published article and per warning.
struct CliProgressCallback {
    bar: ProgressBar,
    warnings: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_issue_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Extracting");
        bar.set_message("Reading text layer…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            warnings: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Segmenting");
        self.bar.reset_eta();
    }
}

impl IssueProgressCallback for CliProgressCallback {
    fn on_issue_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Segmenting {total_pages} logical pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, _page_num: usize, _total: usize, category: &str) {
        self.bar.set_message(category.to_string());
        self.bar.inc(1);
    }

    fn on_article(&self, article: &Article) {
        let pages = if article.first_page == article.last_page {
            format!("p.{}", article.first_page)
        } else {
            format!("p.{}-{}", article.first_page, article.last_page)
        };
        let mark = if article.is_complete() {
            green("✓")
        } else {
            yellow("…")
        };
        self.bar.println(format!(
            "  {} {:<9} {:<14} {}  {}",
            mark,
            dim(&pages),
            cyan(&article.category),
            article.title,
            dim(&format!("{} chars", article.body.chars().count())),
        ));
    }

    fn on_warning(&self, warning: &SegmentationWarning) {
        self.warnings.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("  {} {}", yellow("⚠"), dim(&warning.to_string())));
    }

    fn on_issue_complete(&self, total_pages: usize, articles: usize) {
        self.bar.finish_and_clear();
        let warnings = self.warnings.load(Ordering::SeqCst);
        eprintln!(
            "{} {} articles from {} pages{}",
            if warnings == 0 { green("✔") } else { cyan("⚠") },
            bold(&articles.to_string()),
            total_pages,
            if warnings == 0 {
                String::new()
            } else {
                format!("  ({} warnings for review)", yellow(&warnings.to_string()))
            },
        );
    }
}

const AFTER_HELP: &str = r##"EXAMPLES:
  # Segment an issue, full JSON report on stdout
  pdf2articles augustiner_42.pdf

  # Write the report to a file (atomic rename)
  pdf2articles augustiner_42.pdf -o issue_42.json

  # Stream articles as JSON lines while segmenting
  pdf2articles augustiner_42.pdf --jsonl articles.jsonl
  pdf2articles augustiner_42.pdf --jsonl - | jq .title

  # Segment from URL
  pdf2articles https://example.org/archive/issue_17.pdf -o issue_17.json

  # Another publication's layout
  pdf2articles --profile stadtblatt.json stadtblatt_9.pdf

  # What does the classifier see on each page?
  pdf2articles --inspect-only augustiner_42.pdf

LAYOUT PROFILE:
  A JSON file overriding any of the typographic thresholds:
    {
      "ignored_ink_colors": ["#2e2013", "#000000"],
      "headline_min_font_size": 12.0,
      "bold_faces": ["AmasisMTStd-Bold"],
      "end_marker": "■",
      "start_marker_max_len": 3,
      "fallback_category": "keine kategorie gefunden",
      "editorial_category": "editorial",
      "editorial_crop_fraction": 0.4
    }
  (the defaults shown). Missing keys keep their defaults.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                tracing filter, overrides -v/-q
  PDF2ARTICLES_*          Every flag, e.g. PDF2ARTICLES_MAX_OPEN_PAGES=6
"##;

/// Segment magazine PDFs into publishable articles.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2articles",
    version,
    about = "Segment typeset magazine PDFs into publishable articles",
    long_about = "Read the text layer of a magazine issue (local file or URL) and rebuild its \
articles from typography alone: coloured drop-capital start markers, oversize headlines, and \
the square end-of-article glyph. Articles are emitted with title, body, category and image \
reference; anything that needs a human look is reported as a warning.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the JSON report to this file instead of stdout.
    #[arg(short, long, env = "PDF2ARTICLES_OUTPUT")]
    output: Option<PathBuf>,

    /// Stream each article as one JSON line to this file ("-" for stdout).
    #[arg(long, env = "PDF2ARTICLES_JSONL")]
    jsonl: Option<String>,

    /// Layout profile JSON (thresholds, colours, marker glyph, regions).
    #[arg(long, env = "PDF2ARTICLES_PROFILE")]
    profile: Option<PathBuf>,

    /// Force-flush an article after it stayed open this many pages.
    #[arg(long, env = "PDF2ARTICLES_MAX_OPEN_PAGES", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..=64))]
    max_open_pages: u64,

    /// Segment the cover page too.
    #[arg(long, env = "PDF2ARTICLES_NO_SKIP_COVER")]
    no_skip_cover: bool,

    /// Keep landscape spreads as one logical page.
    #[arg(long, env = "PDF2ARTICLES_NO_SPLIT_SPREADS")]
    no_split_spreads: bool,

    /// Image id for articles whose pages carry no image.
    #[arg(long, env = "PDF2ARTICLES_FALLBACK_IMAGE_ID")]
    fallback_image_id: Option<String>,

    /// PDF user password for encrypted issues.
    #[arg(long, env = "PDF2ARTICLES_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2ARTICLES_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the per-page classification report, assemble nothing.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2ARTICLES_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2ARTICLES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2ARTICLES_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The bar already reports pages, articles and warnings; library INFO
    // logs would only interleave with it.
    let jsonl_to_stdout = cli.jsonl.as_deref() == Some("-");
    let report_to_stdout = cli.output.is_none() && !jsonl_to_stdout;
    let show_progress = !cli.quiet && !cli.no_progress && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn IssueProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let reports = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;
        print_reports(&cli.input, &reports);
        return Ok(());
    }

    // ── Run segmentation ─────────────────────────────────────────────────
    let mut sink: Box<dyn ArticleSink> = match cli.jsonl.as_deref() {
        None => Box::new(DiscardSink),
        Some("-") => Box::new(JsonLinesSink::new(io::stdout())),
        Some(path) => Box::new(
            JsonLinesSink::create(path)
                .with_context(|| format!("Failed to open article stream {path}"))?,
        ),
    };

    let output = segment_issue_into(&cli.input, &config, sink.as_mut())
        .await
        .context("Segmentation failed")?;
    drop(sink);

    if let Some(ref output_path) = cli.output {
        write_report(output_path, &output).await?;
    } else if report_to_stdout {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        print_summary(&output, cli.output.as_deref(), show_progress);
    }

    Ok(())
}

/// Map CLI args to `SegmentationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SegmentationConfig> {
    let mut builder = SegmentationConfig::builder()
        .max_open_pages(cli.max_open_pages as usize)
        .skip_cover_page(!cli.no_skip_cover)
        .split_spreads(!cli.no_split_spreads)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.profile {
        let profile = LayoutProfile::from_file(path)
            .with_context(|| format!("Failed to load layout profile {}", path.display()))?;
        builder = builder.profile(profile);
    }
    if let Some(ref id) = cli.fallback_image_id {
        builder = builder.fallback_image_id(id.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn write_report(path: &Path, output: &IssueOutput) -> Result<()> {
    let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
    let tmp = path.with_extension("json.tmp");
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(&tmp, json.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move report into {}", path.display()))?;
    Ok(())
}

fn print_summary(output: &IssueOutput, output_path: Option<&Path>, show_progress: bool) {
    let stats = &output.stats;
    if !show_progress {
        eprintln!(
            "Segmented {} articles from {} pages in {}ms",
            stats.articles, stats.total_pages, stats.total_duration_ms
        );
        for warning in &output.warnings {
            eprintln!("  review: {warning}");
        }
    }
    eprintln!(
        "   {} complete  /  {} forced  /  {} skipped pages  /  {}ms",
        dim(&stats.complete_articles.to_string()),
        dim(&stats.forced_flushes.to_string()),
        dim(&stats.skipped_pages.to_string()),
        stats.total_duration_ms,
    );
    if let Some(path) = output_path {
        eprintln!("   {} {}", green("→"), bold(&path.display().to_string()));
    }
}

fn print_reports(input: &str, reports: &[PageReport]) {
    println!("File:   {input}");
    println!("Pages:  {}", reports.len());
    for report in reports {
        println!();
        println!(
            "{} {:>3}  {}  {}",
            bold("Page"),
            report.page_num,
            cyan(&report.category),
            dim(&format!("{} spans", report.span_count)),
        );
        if let Some(ref reason) = report.malformed {
            println!("   {} {}", yellow("malformed:"), reason);
            continue;
        }
        for headline in &report.headlines {
            println!("   headline  {headline}");
        }
        if !report.start_markers.is_empty() {
            println!("   start     {}", report.start_markers.join(" "));
        }
        if report.end_marker_count > 0 {
            println!("   end       ×{}", report.end_marker_count);
        }
    }
}
