//! Conversion entry points.
//!
//! [`convert`] runs rasterisation and OCR and returns the accumulated text;
//! [`convert_to_file`] additionally typesets that text and writes the PDF.
//! The phases never overlap: every page is rendered before OCR starts, and
//! composition starts only once every page has been recognised.

use crate::config::ConversionConfig;
use crate::error::OcrPdfError;
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata, PageText};
use crate::pipeline::compose;
use crate::pipeline::input;
use crate::pipeline::ocr::{self, OcrEngine, TesseractEngine};
use crate::pipeline::render::{self, PdfiumRasterizer, RasterPage, Rasterizer, RenderRequest};
use crate::progress::{ConversionPhase, ProgressCallback};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Appended after every page's text in the accumulated output.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Rasterise and OCR a PDF, returning the recognised text.
///
/// Toolchains are resolved first, so a missing tesseract or pdfium is
/// reported before the input is even opened.
///
/// # Errors
/// Any failure is fatal, including OCR failing on a single page. See
/// [`OcrPdfError::kind`] for the classification.
pub async fn convert(
    input_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, OcrPdfError> {
    let total_start = Instant::now();
    let input_path = input_path.as_ref();
    info!("Starting conversion: {}", input_path.display());

    // ── Step 1: Resolve toolchains ───────────────────────────────────────
    let rasterizer = resolve_rasterizer(config).await?;
    let engine = resolve_ocr_engine(config).await?;

    // ── Step 2: Resolve input ────────────────────────────────────────────
    let pdf_path = input::resolve_input(input_path)?;

    // ── Step 3: Extract metadata ─────────────────────────────────────────
    let metadata = render::extract_metadata(
        Arc::clone(&rasterizer),
        &pdf_path,
        config.password.as_deref(),
    )
    .await?;
    info!("PDF has {} pages", metadata.page_count);

    // ── Step 4: Rasterise pages ──────────────────────────────────────────
    notify(config, |cb| cb.on_phase(ConversionPhase::Rasterising));
    let render_start = Instant::now();
    let pages =
        render::render_pages(rasterizer, &pdf_path, RenderRequest::from_config(config)).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    let total_pages = pages.len();
    if total_pages < metadata.page_count {
        info!(
            "Processing only the first {} of {} pages",
            total_pages, metadata.page_count
        );
    }
    info!("Rendered {} pages in {}ms", total_pages, render_duration_ms);
    notify(config, |cb| {
        cb.on_conversion_start(total_pages, metadata.page_count)
    });

    // ── Step 5: OCR ──────────────────────────────────────────────────────
    notify(config, |cb| cb.on_phase(ConversionPhase::Recognising));
    let ocr_start = Instant::now();
    let page_texts = if config.concurrency > 1 {
        process_concurrent(&engine, pages, config).await?
    } else {
        process_sequential(&engine, pages, config).await?
    };
    debug_assert!(page_texts.windows(2).all(|w| w[0].page_num < w[1].page_num));
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;
    notify(config, |cb| cb.on_conversion_complete(total_pages));

    // ── Step 6: Accumulate ───────────────────────────────────────────────
    let text = accumulate_text(&page_texts);

    let stats = ConversionStats {
        document_pages: metadata.page_count,
        processed_pages: page_texts.len(),
        render_duration_ms,
        ocr_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        ..ConversionStats::default()
    };

    info!(
        "OCR complete: {}/{} pages, {} bytes of text, {}ms",
        stats.processed_pages,
        stats.document_pages,
        text.len(),
        stats.total_duration_ms
    );

    Ok(ConversionOutput {
        text,
        pages: page_texts,
        metadata,
        stats,
    })
}

/// Convert a scanned PDF and write the text-only PDF to `output_path`.
///
/// The output is replaced if it already exists, and is only touched once
/// composition has succeeded.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, OcrPdfError> {
    let total_start = Instant::now();
    let input_path = input_path.as_ref();
    let output_path = output_path.as_ref();

    let mut output = convert(input_path, config).await?;

    // ── Step 7: Compose and write ────────────────────────────────────────
    notify(config, |cb| cb.on_phase(ConversionPhase::Composing));
    let compose_start = Instant::now();
    let text = output.text.clone();
    let title = document_title(input_path, &output.metadata);
    let composed = tokio::task::spawn_blocking(move || compose::compose(&text, &title))
        .await
        .map_err(|e| OcrPdfError::Internal(format!("Compose task panicked: {}", e)))??;

    compose::write_pdf(output_path, &composed.bytes).await?;

    output.stats.paragraphs = composed.paragraph_count;
    output.stats.output_pages = composed.page_count;
    output.stats.compose_duration_ms = compose_start.elapsed().as_millis() as u64;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Conversion complete: {} paragraphs on {} pages → {}",
        composed.paragraph_count,
        composed.page_count,
        output_path.display()
    );

    Ok(output)
}

/// Synchronous wrapper around [`convert_to_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, OcrPdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| OcrPdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_to_file(input_path, output_path, config))
}

/// Extract PDF metadata without rendering or OCR.
///
/// Only the rasteriser is needed; tesseract does not have to be installed.
pub async fn inspect(
    input_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, OcrPdfError> {
    let rasterizer = resolve_rasterizer(config).await?;
    let pdf_path = input::resolve_input(input_path)?;
    render::extract_metadata(rasterizer, &pdf_path, config.password.as_deref()).await
}

/// Join page texts in order, each followed by [`PAGE_SEPARATOR`].
pub fn accumulate_text(pages: &[PageText]) -> String {
    let capacity = pages
        .iter()
        .map(|p| p.text.len() + PAGE_SEPARATOR.len())
        .sum();
    let mut text = String::with_capacity(capacity);
    for page in pages {
        text.push_str(&page.text);
        text.push_str(PAGE_SEPARATOR);
    }
    text
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn notify(config: &ConversionConfig, event: impl FnOnce(&ProgressCallback)) {
    if let Some(ref cb) = config.progress_callback {
        event(cb);
    }
}

/// Use the injected rasteriser, else bind pdfium from the configured location.
async fn resolve_rasterizer(config: &ConversionConfig) -> Result<Arc<dyn Rasterizer>, OcrPdfError> {
    if let Some(ref rasterizer) = config.rasterizer {
        return Ok(Arc::clone(rasterizer));
    }

    let dir = config.raster_toolchain_path.clone();
    let rasterizer = tokio::task::spawn_blocking(move || PdfiumRasterizer::new(dir))
        .await
        .map_err(|e| OcrPdfError::Internal(format!("pdfium bind task panicked: {}", e)))??;
    Ok(Arc::new(rasterizer))
}

/// Use the injected engine, else locate tesseract from the configured path.
async fn resolve_ocr_engine(config: &ConversionConfig) -> Result<Arc<dyn OcrEngine>, OcrPdfError> {
    if let Some(ref engine) = config.ocr_engine {
        return Ok(Arc::clone(engine));
    }

    let binary = config.ocr_runtime_path.clone();
    let tessdata = config.tessdata_dir.clone();
    let engine = tokio::task::spawn_blocking(move || TesseractEngine::new(binary, tessdata))
        .await
        .map_err(|e| OcrPdfError::Internal(format!("tesseract probe task panicked: {}", e)))??;
    Ok(Arc::new(engine))
}

/// OCR one page and report it to the progress callback.
async fn recognize_with_progress(
    engine: Arc<dyn OcrEngine>,
    page: RasterPage,
    total_pages: usize,
    progress: Option<ProgressCallback>,
) -> Result<PageText, OcrPdfError> {
    let page_num = page.page_num;
    if let Some(ref cb) = progress {
        cb.on_page_start(page_num, total_pages);
    }
    debug!("OCR page {}/{} with {}", page_num, total_pages, engine.name());

    let result = ocr::recognize_page(engine, page).await;
    if let Ok(ref p) = result {
        info!("Page {}/{} recognised ({} chars)", page_num, total_pages, p.text.len());
    }

    if let Some(ref cb) = progress {
        match &result {
            Ok(p) => cb.on_page_complete(page_num, total_pages, p.text.len()),
            Err(e) => cb.on_page_error(page_num, total_pages, &e.to_string()),
        }
    }
    result
}

/// One page at a time, in page order. The first failure stops the loop.
async fn process_sequential(
    engine: &Arc<dyn OcrEngine>,
    pages: Vec<RasterPage>,
    config: &ConversionConfig,
) -> Result<Vec<PageText>, OcrPdfError> {
    let total_pages = pages.len();
    let mut results = Vec::with_capacity(total_pages);

    for page in pages {
        let text = recognize_with_progress(
            Arc::clone(engine),
            page,
            total_pages,
            config.progress_callback.clone(),
        )
        .await?;
        results.push(text);
    }

    Ok(results)
}

/// Up to `config.concurrency` pages at once. `buffered` yields results in
/// page order, so the first error seen is the lowest-numbered failing page.
async fn process_concurrent(
    engine: &Arc<dyn OcrEngine>,
    pages: Vec<RasterPage>,
    config: &ConversionConfig,
) -> Result<Vec<PageText>, OcrPdfError> {
    let total_pages = pages.len();
    stream::iter(pages.into_iter().map(|page| {
        recognize_with_progress(
            Arc::clone(engine),
            page,
            total_pages,
            config.progress_callback.clone(),
        )
    }))
    .buffered(config.concurrency)
    .try_collect()
    .await
}

/// PDF title for the output: source title if present, else the file stem.
fn document_title(input_path: &Path, metadata: &DocumentMetadata) -> String {
    metadata
        .title
        .clone()
        .or_else(|| {
            input_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "OCR text".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize, text: &str) -> PageText {
        PageText {
            page_num: n,
            text: text.to_string(),
        }
    }

    #[test]
    fn accumulate_appends_separator_after_every_page() {
        let text = accumulate_text(&[page(1, "HELLO"), page(2, "WORLD"), page(3, "")]);
        assert_eq!(text, "HELLO\n\nWORLD\n\n\n\n");
    }

    #[test]
    fn accumulate_of_nothing_is_empty() {
        assert_eq!(accumulate_text(&[]), "");
    }

    #[test]
    fn title_prefers_metadata() {
        let meta = DocumentMetadata {
            title: Some("Annual Report".into()),
            ..DocumentMetadata::default()
        };
        assert_eq!(
            document_title(Path::new("/scans/ar.pdf"), &meta),
            "Annual Report"
        );
        assert_eq!(
            document_title(Path::new("/scans/ar.pdf"), &DocumentMetadata::default()),
            "ar"
        );
    }
}
