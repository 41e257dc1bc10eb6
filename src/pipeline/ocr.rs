//! OCR: turn one rendered page into plain text.
//!
//! The default engine drives the `tesseract` command-line tool. Each page is
//! written to a temporary PNG and tesseract prints the recognised text to
//! stdout. Text comes back in tesseract's own reading order and is passed on
//! untouched; no confidence filtering happens here.

use crate::error::OcrPdfError;
use crate::output::PageText;
use crate::pipeline::render::RasterPage;
use image::ImageFormat;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Executable name looked up on `PATH` when no runtime path is configured.
pub const DEFAULT_TESSERACT: &str = "tesseract";

/// Recognises the text on a rendered page.
///
/// Implementations are blocking and must be safe to call from several
/// threads at once (the pipeline may recognise pages in parallel).
pub trait OcrEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Return all recognisable text on the page. Failures should name the page.
    fn recognize(&self, page: &RasterPage) -> Result<String, OcrPdfError>;
}

/// Tesseract OCR engine (CLI wrapper).
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    tessdata_dir: Option<PathBuf>,
    version: String,
}

impl TesseractEngine {
    /// Locate tesseract and check that it runs.
    ///
    /// Fails with a configuration error when the executable is missing or
    /// broken, before any page has been rendered.
    pub fn new(binary: Option<PathBuf>, tessdata_dir: Option<PathBuf>) -> Result<Self, OcrPdfError> {
        let binary = binary.unwrap_or_else(|| PathBuf::from(DEFAULT_TESSERACT));

        if let Some(ref dir) = tessdata_dir {
            if !dir.is_dir() {
                return Err(OcrPdfError::InvalidConfig(format!(
                    "tessdata directory not found: '{}'",
                    dir.display()
                )));
            }
        }

        let version = probe_version(&binary)?;
        info!("[Tesseract] {} (version {})", binary.display(), version);

        Ok(Self {
            binary,
            tessdata_dir,
            version,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// `tesseract <image> stdout --dpi <dpi> -c page_separator=`
    ///
    /// The empty page separator stops tesseract from appending a form feed
    /// after every page.
    fn command(&self, image_path: &Path, dpi: u32) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(image_path)
            .arg("stdout")
            .arg("--dpi")
            .arg(dpi.to_string())
            .arg("-c")
            .arg("page_separator=");

        if let Some(ref dir) = self.tessdata_dir {
            cmd.env("TESSDATA_PREFIX", dir);
        }
        cmd
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, page: &RasterPage) -> Result<String, OcrPdfError> {
        let start = Instant::now();
        let ocr_err = |detail: String| OcrPdfError::OcrFailed {
            page: page.page_num,
            detail,
        };

        // Deleted when `tmp` drops, on every return path.
        let mut tmp = tempfile::Builder::new()
            .prefix("ocrpdf-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrPdfError::Internal(format!("tempfile: {e}")))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            page.image
                .write_to(&mut writer, ImageFormat::Png)
                .map_err(|e| ocr_err(format!("could not encode page image: {e}")))?;
            writer
                .flush()
                .map_err(|e| ocr_err(format!("could not write page image: {e}")))?;
        }

        let output = self
            .command(tmp.path(), page.dpi)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OcrPdfError::OcrRuntimeUnavailable {
                        binary: self.binary.clone(),
                        detail: e.to_string(),
                    }
                } else {
                    ocr_err(format!("could not run tesseract: {e}"))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ocr_err(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            "[Tesseract] page {} → {} bytes in {} ms",
            page.page_num,
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// Run `tesseract --version` and extract the version number.
fn probe_version(binary: &Path) -> Result<String, OcrPdfError> {
    let unavailable = |detail: String| OcrPdfError::OcrRuntimeUnavailable {
        binary: binary.to_path_buf(),
        detail,
    };

    let output = Command::new(binary)
        .arg("--version")
        .output()
        .map_err(|e| unavailable(e.to_string()))?;

    if !output.status.success() {
        return Err(unavailable(format!(
            "`--version` exited with {}",
            output.status
        )));
    }

    // Older releases print the banner on stderr.
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(parse_version(&combined).unwrap_or_else(|| "unknown".to_string()))
}

/// Pull the version out of a `tesseract --version` banner
/// (`tesseract 5.3.0` or `tesseract v4.1.1`).
pub fn parse_version(banner: &str) -> Option<String> {
    banner.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(name), Some(version)) if name.eq_ignore_ascii_case("tesseract") => {
                Some(version.trim_start_matches('v').to_string())
            }
            _ => None,
        }
    })
}

/// Recognise one page on the blocking pool.
pub async fn recognize_page(
    engine: Arc<dyn OcrEngine>,
    page: RasterPage,
) -> Result<PageText, OcrPdfError> {
    let page_num = page.page_num;
    tokio::task::spawn_blocking(move || {
        engine.recognize(&page).map(|text| PageText {
            page_num: page.page_num,
            text,
        })
    })
    .await
    .map_err(|e| OcrPdfError::Internal(format!("OCR task for page {page_num} panicked: {e}")))?
}
