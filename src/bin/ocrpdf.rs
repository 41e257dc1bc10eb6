//! CLI binary for ocrpdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocrpdf::{
    convert_to_file, inspect, ConversionConfig, ConversionPhase, ConversionProgressCallback,
    ProgressCallback,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while pages render, then a bar
/// over the OCR working set with one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Self::with_bar(ProgressBar::new(0))
    }

    fn with_bar(bar: ProgressBar) -> Arc<Self> {
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER_TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    /// indicatif draws nothing, not even `println`, when stderr is not a
    /// terminal. Progress lines then go to stderr directly.
    fn plain_output(&self) -> bool {
        self.bar.is_hidden()
    }

    fn emit(&self, line: String) {
        if self.plain_output() {
            eprintln!("{line}");
        } else {
            self.bar.println(line);
        }
    }

    /// Switch to the full progress-bar style once the working set is known.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("OCR");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_phase(&self, phase: ConversionPhase) {
        self.emit(format!("{} {}", cyan("◆"), bold(&format!("{phase}…"))));
        if phase == ConversionPhase::Composing {
            self.bar.set_message("writing PDF");
        }
    }

    fn on_conversion_start(&self, total_pages: usize, document_pages: usize) {
        self.activate_bar(total_pages);
        if total_pages < document_pages {
            self.emit(format!(
                "  {}",
                dim(&format!(
                    "processing the first {total_pages} of {document_pages} pages"
                ))
            ));
        }
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.emit(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);

        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((idx, _)) => format!("{}\u{2026}", &error[..idx]),
            None => error.to_string(),
        };

        self.emit(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.abandon();
    }

    fn on_conversion_complete(&self, total_pages: usize) {
        self.bar.set_message(format!("{total_pages} pages recognised"));
    }
}

impl CliProgressCallback {
    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert the first five pages
  ocrpdf scan.pdf --max-pages 5

  # Write to a chosen file at a higher resolution
  ocrpdf scan.pdf -o scan_text.pdf --dpi 300

  # Also keep the raw OCR text
  ocrpdf scan.pdf --text-out scan.txt

  # Inspect PDF metadata (no tesseract needed)
  ocrpdf --inspect-only scan.pdf

  # Run four tesseract processes at once
  ocrpdf book.pdf --concurrency 4 -o book_text.pdf

  # Machine-readable run statistics
  ocrpdf --json scan.pdf > stats.json

ENVIRONMENT VARIABLES:
  OCRPDF_TESSERACT     Path to the tesseract executable (default: tesseract on PATH)
  TESSDATA_PREFIX      Directory containing *.traineddata language files
  PDFIUM_LIB_PATH      Directory containing the pdfium shared library
  RUST_LOG             Overrides the log filter (e.g. ocrpdf=debug)

SETUP:
  1. Install tesseract:   apt install tesseract-ocr   |   brew install tesseract
  2. Put libpdfium next to the binary, in a directory named by
     PDFIUM_LIB_PATH, or on the system library path.
  3. Convert:             ocrpdf scan.pdf
"#;

/// Turn a scanned PDF into a text-only PDF using OCR.
#[derive(Parser, Debug)]
#[command(
    name = "ocrpdf",
    version,
    about = "Turn a scanned PDF into a text-only PDF using OCR",
    long_about = "Rasterise each page of a scanned PDF with pdfium, recognise the text with \
tesseract, and typeset the recognised paragraphs into a new A4 PDF. Images, fonts and layout \
of the original are not preserved.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Scanned PDF to convert.
    input: PathBuf,

    /// Where to write the text-only PDF. Overwritten if it exists.
    #[arg(short, long, env = "OCRPDF_OUTPUT", default_value = "output_text_based.pdf")]
    output: PathBuf,

    /// Rendering DPI (72–600).
    #[arg(long, env = "OCRPDF_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Only process the first N pages.
    #[arg(long, env = "OCRPDF_MAX_PAGES",
          value_parser = clap::value_parser!(u64).range(1..))]
    max_pages: Option<u64>,

    /// Path to the tesseract executable.
    #[arg(long, env = "OCRPDF_TESSERACT")]
    tesseract: Option<PathBuf>,

    /// Directory holding tesseract language data.
    #[arg(long, env = "TESSDATA_PREFIX")]
    tessdata_dir: Option<PathBuf>,

    /// Directory holding the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_dir: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "OCRPDF_PASSWORD")]
    password: Option<String>,

    /// Pages recognised at once. Output order is unaffected.
    #[arg(short, long, env = "OCRPDF_CONCURRENCY", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..=64))]
    concurrency: u64,

    /// Also write the accumulated OCR text to this file.
    #[arg(long)]
    text_out: Option<PathBuf>,

    /// Print run statistics as JSON on stdout.
    #[arg(long, env = "OCRPDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "OCRPDF_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCRPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OCRPDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ConversionProgressCallback>),
    )?;

    // ── Run conversion ───────────────────────────────────────────────────
    let result = convert_to_file(&cli.input, &cli.output, &config).await;
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let output = result.context("Conversion failed")?;

    if let Some(ref text_path) = cli.text_out {
        tokio::fs::write(text_path, output.text.as_bytes())
            .await
            .with_context(|| format!("Failed to write OCR text to {}", text_path.display()))?;
    }

    let stats = &output.stats;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}/{} pages  {} paragraphs on {} pages  {}ms  →  {}",
            green("✔"),
            stats.processed_pages,
            stats.document_pages,
            stats.paragraphs,
            stats.output_pages,
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        eprintln!(
            "   {}",
            dim(&format!(
                "render {}ms  /  OCR {}ms  /  compose {}ms",
                stats.render_duration_ms, stats.ocr_duration_ms, stats.compose_duration_ms
            )),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .page_limit(cli.max_pages.map(|n| n as usize))
        .concurrency(cli.concurrency as usize);

    if let Some(ref path) = cli.tesseract {
        builder = builder.ocr_runtime_path(path);
    }
    if let Some(ref dir) = cli.tessdata_dir {
        builder = builder.tessdata_dir(dir);
    }
    if let Some(ref dir) = cli.pdfium_dir {
        builder = builder.raster_toolchain_path(dir);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_bar_falls_back_to_plain_stderr() {
        let cb = CliProgressCallback::with_bar(ProgressBar::hidden());
        assert!(cb.plain_output());
        // Must not panic without a terminal.
        cb.on_phase(ConversionPhase::Rasterising);
        cb.on_conversion_start(2, 5);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2, 12);
        cb.on_page_error(2, 2, &"x".repeat(200));
        cb.finish();
    }

    #[test]
    fn cli_maps_flags_to_config() {
        let cli = Cli::parse_from([
            "ocrpdf",
            "scan.pdf",
            "--dpi",
            "300",
            "--max-pages",
            "2",
            "--concurrency",
            "3",
        ]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.dpi, 300);
        assert_eq!(config.max_pages, Some(2));
        assert_eq!(config.concurrency, 3);
        assert_eq!(cli.output, PathBuf::from("output_text_based.pdf"));
    }
}
