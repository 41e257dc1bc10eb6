//! Configuration types for scanned-PDF conversion.
//!
//! Every knob the pipeline reads lives in [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. Toolchain locations (tesseract, pdfium) are
//! plain fields here rather than constants, and the engines they point at are
//! probed before any page is processed.

use crate::error::OcrPdfError;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::render::Rasterizer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Lowest accepted rendering DPI.
pub const MIN_DPI: u32 = 72;
/// Highest accepted rendering DPI.
pub const MAX_DPI: u32 = 600;

/// Configuration for a scanned-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use ocrpdf::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .dpi(200)
///     .max_pages(3)
///     .ocr_runtime_path("/usr/local/bin/tesseract")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_pages, Some(3));
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI used when rasterising each page. Range: 72–600. Default: 150.
    ///
    /// Tesseract accuracy drops sharply below ~150 DPI; above 300 it mostly
    /// costs time.
    pub dpi: u32,

    /// Only process the first `n` pages. Default: all pages.
    pub max_pages: Option<usize>,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 5000.
    ///
    /// Caps either edge independently of DPI so an oversized page (posters,
    /// engineering drawings) cannot exhaust memory.
    pub max_rendered_pixels: u32,

    /// Number of pages recognised at once. Default: 1 (strictly sequential).
    ///
    /// Values above 1 run several tesseract processes in parallel; the text
    /// is still reassembled in page order.
    pub concurrency: usize,

    /// Tesseract executable. Default: `tesseract` looked up on `PATH`.
    pub ocr_runtime_path: Option<PathBuf>,

    /// Directory holding tesseract's `*.traineddata` models (`TESSDATA_PREFIX`).
    pub tessdata_dir: Option<PathBuf>,

    /// Directory containing the pdfium shared library.
    /// Default: the working directory, then the system library path.
    pub raster_toolchain_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Pre-constructed OCR engine. Takes precedence over `ocr_runtime_path`.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Pre-constructed rasteriser. Takes precedence over `raster_toolchain_path`.
    pub rasterizer: Option<Arc<dyn Rasterizer>>,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_pages: None,
            max_rendered_pixels: 5000,
            concurrency: 1,
            ocr_runtime_path: None,
            tessdata_dir: None,
            raster_toolchain_path: None,
            password: None,
            ocr_engine: None,
            rasterizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("max_pages", &self.max_pages)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("ocr_runtime_path", &self.ocr_runtime_path)
            .field("tessdata_dir", &self.tessdata_dir)
            .field("raster_toolchain_path", &self.raster_toolchain_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn Rasterizer>"))
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = Some(n);
        self
    }

    /// `None` processes every page.
    pub fn page_limit(mut self, n: Option<usize>) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn ocr_runtime_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ocr_runtime_path = Some(path.into());
        self
    }

    pub fn tessdata_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(path.into());
        self
    }

    pub fn raster_toolchain_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.raster_toolchain_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, OcrPdfError> {
        let c = &self.config;
        if !(MIN_DPI..=MAX_DPI).contains(&c.dpi) {
            return Err(OcrPdfError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                c.dpi
            )));
        }
        if c.max_pages == Some(0) {
            return Err(OcrPdfError::InvalidConfig(
                "max_pages must be ≥ 1 (omit it to process every page)".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(OcrPdfError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if let Some(ref p) = c.ocr_runtime_path {
            if p.as_os_str().is_empty() {
                return Err(OcrPdfError::InvalidConfig(
                    "OCR runtime path is empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.dpi, 150);
        assert_eq!(c.max_pages, None);
        assert_eq!(c.concurrency, 1);
        assert!(c.ocr_runtime_path.is_none());
        assert!(c.raster_toolchain_path.is_none());
    }

    #[test]
    fn builder_sets_paths_and_limit() {
        let c = ConversionConfig::builder()
            .dpi(300)
            .max_pages(3)
            .ocr_runtime_path("/usr/bin/tesseract")
            .raster_toolchain_path("/opt/pdfium/lib")
            .build()
            .expect("valid config");
        assert_eq!(c.dpi, 300);
        assert_eq!(c.max_pages, Some(3));
        assert_eq!(c.ocr_runtime_path, Some(PathBuf::from("/usr/bin/tesseract")));
        assert_eq!(
            c.raster_toolchain_path,
            Some(PathBuf::from("/opt/pdfium/lib"))
        );
    }

    #[test]
    fn dpi_out_of_range_is_rejected() {
        for dpi in [0, 71, 601, 10_000] {
            let err = ConversionConfig::builder().dpi(dpi).build().unwrap_err();
            assert!(matches!(err, OcrPdfError::InvalidConfig(_)), "dpi {dpi}");
        }
    }

    #[test]
    fn zero_page_limit_is_rejected() {
        let err = ConversionConfig::builder().max_pages(0).build().unwrap_err();
        assert!(err.to_string().contains("max_pages"));
    }

    #[test]
    fn page_limit_none_clears_cap() {
        let c = ConversionConfig::builder()
            .max_pages(4)
            .page_limit(None)
            .build()
            .unwrap();
        assert_eq!(c.max_pages, None);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(ConversionConfig::builder().concurrency(0).build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
