//! # ocrpdf
//!
//! Turn a scanned, image-only PDF into a text-only PDF by OCR.
//!
//! ## Why this crate?
//!
//! A scanned PDF is a stack of pictures: it cannot be searched, copied from
//! or reflowed. This crate rasterises each page, runs tesseract over the
//! image and typesets the recognised text into a fresh PDF. Layout, fonts
//! and images of the original are deliberately not carried over; the output
//! is plain paragraphs of text on A4 pages.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    validate the local file (exists, readable, %PDF magic)
//!  ├─ 2. Render   rasterise the leading pages via pdfium (spawn_blocking)
//!  ├─ 3. OCR      tesseract per page, in page order
//!  ├─ 4. Collect  page texts joined with a blank line after each page
//!  └─ 5. Compose  paragraphs wrapped onto A4 pages, written atomically
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocrpdf::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().dpi(150).max_pages(5).build()?;
//!     let output = convert_to_file("scan.pdf", "scan_text.pdf", &config).await?;
//!     eprintln!(
//!         "{} pages OCR'd, {} paragraphs written",
//!         output.stats.processed_pages, output.stats.paragraphs
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocrpdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ocrpdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! | Tool | Used for | Located via |
//! |------|----------|-------------|
//! | pdfium shared library | rasterisation | `raster_toolchain_path`, then `./`, then the system library path |
//! | `tesseract` executable | OCR | `ocr_runtime_path`, then `PATH` |
//!
//! Both can be replaced through [`Rasterizer`] and [`OcrEngine`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{accumulate_text, convert, convert_sync, convert_to_file, inspect};
pub use error::{ErrorKind, OcrPdfError};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, PageText};
pub use pipeline::compose::{compose, ComposedPdf, PageStyle};
pub use pipeline::ocr::{OcrEngine, TesseractEngine};
pub use pipeline::render::{PdfiumRasterizer, RasterPage, Rasterizer, RenderRequest};
pub use progress::{ConversionPhase, ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
