//! PDF rasterisation: render the leading pages to `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## Resolution
//!
//! PDF user space is 72 units per inch, so a page rendered at `dpi` is scaled
//! by `dpi / 72`. `max_rendered_pixels` additionally caps each edge so an
//! oversized page cannot allocate an unbounded bitmap.

use crate::config::ConversionConfig;
use crate::error::OcrPdfError;
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// One rendered page, owned by the pipeline until OCR has consumed it.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    /// Effective resolution of `image`. Below the requested DPI when
    /// `max_rendered_pixels` shrank the bitmap.
    pub dpi: u32,
    pub image: DynamicImage,
}

/// Parameters of a single rasterisation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub dpi: u32,
    /// Render only the first `n` pages.
    pub max_pages: Option<usize>,
    pub max_rendered_pixels: u32,
    pub password: Option<String>,
}

impl RenderRequest {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_pages: config.max_pages,
            max_rendered_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
        }
    }
}

/// Turns PDF pages into images.
///
/// Implementations are blocking; the pipeline always calls them from
/// `spawn_blocking`. `render` must return pages in document order and only
/// the leading `max_pages` of them when a cap is set.
pub trait Rasterizer: Send + Sync {
    /// Read document metadata, including the true page count.
    fn inspect(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, OcrPdfError>;

    /// Render the leading pages of the document.
    fn render(
        &self,
        pdf_path: &Path,
        request: &RenderRequest,
    ) -> Result<Vec<RasterPage>, OcrPdfError>;
}

/// Number of pages a run will process given the document size and the cap.
pub fn leading_pages(total_pages: usize, max_pages: Option<usize>) -> usize {
    max_pages.map_or(total_pages, |n| n.min(total_pages))
}

/// Scale from PDF points to pixels at `dpi`.
pub fn scale_factor(dpi: u32) -> f32 {
    dpi as f32 / 72.0
}

/// Resolution actually achieved when `points` of page height came out as
/// `pixels` rows. Falls back to `requested` for degenerate page sizes.
pub fn effective_dpi(pixels: u32, points: f32, requested: u32) -> u32 {
    if points <= 0.0 || pixels == 0 {
        return requested;
    }
    let dpi = (pixels as f32 * 72.0 / points).round() as u32;
    dpi.clamp(1, requested)
}

/// Default rasteriser backed by the pdfium shared library.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Bind pdfium once to prove it is usable, so a missing library is a
    /// configuration error rather than a mid-run failure.
    ///
    /// With `library_dir` set only that directory is tried; otherwise the
    /// working directory and then the system library path.
    pub fn new(library_dir: Option<PathBuf>) -> Result<Self, OcrPdfError> {
        if let Some(ref dir) = library_dir {
            if !dir.is_dir() {
                return Err(OcrPdfError::RasterToolchainMissing { path: dir.clone() });
            }
        }
        let rasterizer = Self { library_dir };
        rasterizer.bind()?;
        info!(
            "pdfium bound from {}",
            rasterizer
                .library_dir
                .as_deref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "default search path".to_string())
        );
        Ok(rasterizer)
    }

    fn bind(&self) -> Result<Pdfium, OcrPdfError> {
        let bindings = match self.library_dir {
            Some(ref dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| OcrPdfError::PdfiumBindingFailed(format!("{e:?}")))?;

        Ok(Pdfium::new(bindings))
    }
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, OcrPdfError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                OcrPdfError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                OcrPdfError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            OcrPdfError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

impl Rasterizer for PdfiumRasterizer {
    fn inspect(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, OcrPdfError> {
        let pdfium = self.bind()?;
        let document = open_document(&pdfium, pdf_path, password)?;

        let metadata = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: document.pages().len() as usize,
            pdf_version: format!("{:?}", document.version()),
        })
    }

    fn render(
        &self,
        pdf_path: &Path,
        request: &RenderRequest,
    ) -> Result<Vec<RasterPage>, OcrPdfError> {
        let pdfium = self.bind()?;
        let document = open_document(&pdfium, pdf_path, request.password.as_deref())?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        let selected = leading_pages(total_pages, request.max_pages);
        info!(
            "PDF loaded: {} pages, rendering {} at {} DPI",
            total_pages, selected, request.dpi
        );

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(scale_factor(request.dpi))
            .set_maximum_width(request.max_rendered_pixels as i32)
            .set_maximum_height(request.max_rendered_pixels as i32);

        let mut results = Vec::with_capacity(selected);

        for idx in 0..selected {
            let page = pages
                .get(idx as u16)
                .map_err(|e| OcrPdfError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                OcrPdfError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            // Tesseract has no use for the alpha channel.
            let image = DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());
            let dpi = effective_dpi(image.height(), page.height().value, request.dpi);
            debug!(
                "Rendered page {} → {}x{} px ({} DPI)",
                idx + 1,
                image.width(),
                image.height(),
                dpi
            );

            results.push(RasterPage {
                page_num: idx + 1,
                dpi,
                image,
            });
        }

        Ok(results)
    }
}

/// Rasterise the leading pages of a PDF on the blocking pool.
pub async fn render_pages(
    rasterizer: Arc<dyn Rasterizer>,
    pdf_path: &Path,
    request: RenderRequest,
) -> Result<Vec<RasterPage>, OcrPdfError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || rasterizer.render(&path, &request))
        .await
        .map_err(|e| OcrPdfError::Internal(format!("Render task panicked: {}", e)))?
}

/// Extract document metadata on the blocking pool without rendering pages.
pub async fn extract_metadata(
    rasterizer: Arc<dyn Rasterizer>,
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, OcrPdfError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || rasterizer.inspect(&path, pwd.as_deref()))
        .await
        .map_err(|e| OcrPdfError::Internal(format!("Metadata task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_pages_respects_cap() {
        assert_eq!(leading_pages(10, None), 10);
        assert_eq!(leading_pages(10, Some(3)), 3);
        assert_eq!(leading_pages(2, Some(3)), 2);
        assert_eq!(leading_pages(0, Some(3)), 0);
    }

    #[test]
    fn scale_factor_maps_points_to_pixels() {
        assert!((scale_factor(72) - 1.0).abs() < f32::EPSILON);
        assert!((scale_factor(144) - 2.0).abs() < f32::EPSILON);
        // A4 width (595.28 pt) at 150 DPI is ~1240 px.
        let px = 595.28 * scale_factor(150);
        assert!((1239.0..1242.0).contains(&px), "got {px}");
    }

    #[test]
    fn effective_dpi_reflects_pixel_cap() {
        // A4 height (841.89 pt) at 150 DPI renders to ~1754 rows.
        assert_eq!(effective_dpi(1754, 841.89, 150), 150);
        // At 600 DPI the 5000 px cap gives ~428 DPI.
        assert_eq!(effective_dpi(5000, 841.89, 600), 428);
        // Rounding up past the request never reports more than asked.
        assert_eq!(effective_dpi(1755, 841.89, 150), 150);
        assert_eq!(effective_dpi(0, 841.89, 300), 300);
        assert_eq!(effective_dpi(100, 0.0, 300), 300);
    }

    #[test]
    fn request_copies_config_values() {
        let config = ConversionConfig::builder()
            .dpi(200)
            .max_pages(4)
            .password("secret")
            .build()
            .unwrap();
        let req = RenderRequest::from_config(&config);
        assert_eq!(req.dpi, 200);
        assert_eq!(req.max_pages, Some(4));
        assert_eq!(req.password.as_deref(), Some("secret"));
        assert_eq!(req.max_rendered_pixels, config.max_rendered_pixels);
    }

    #[test]
    fn missing_library_dir_is_a_configuration_error() {
        let err = PdfiumRasterizer::new(Some(PathBuf::from("/no/such/pdfium/dir"))).unwrap_err();
        assert!(matches!(err, OcrPdfError::RasterToolchainMissing { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }
}
