//! Error type for the ocrpdf library.
//!
//! Every failure is fatal: a single bad page aborts the whole run and no
//! output file is written. What callers *can* do is tell failures apart, so
//! each variant belongs to one [`ErrorKind`]:
//!
//! * **Configuration**: bad settings or a missing toolchain (tesseract,
//!   pdfium). Detected before any page is touched.
//! * **Input**: the source file is missing, unreadable, or not a usable PDF.
//! * **Processing**: rasterisation or OCR failed on a specific page.
//! * **Output**: the new PDF could not be composed or written.

use std::path::PathBuf;
use thiserror::Error;

/// Broad class of an [`OcrPdfError`], for callers that only need to know
/// whose fault a failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    Configuration,
    Input,
    Processing,
    Output,
    Internal,
}

/// All errors returned by the ocrpdf library.
#[derive(Debug, Error)]
pub enum OcrPdfError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The tesseract executable could not be run.
    #[error(
        "OCR runtime '{binary}' is not available: {detail}\n\
Install tesseract or point --tesseract at the executable."
    )]
    OcrRuntimeUnavailable { binary: PathBuf, detail: String },

    /// The configured pdfium directory does not exist.
    #[error("Rasterisation toolchain directory not found: '{path}'")]
    RasterToolchainMissing { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide, or pass\n\
--pdfium-dir /path/to/dir (env PDFIUM_LIB_PATH).\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases"
    )]
    PdfiumBindingFailed(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    // ── Processing errors ─────────────────────────────────────────────────
    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The OCR engine failed on a specific page.
    #[error("OCR failed for page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The recognised text could not be laid out as a PDF.
    #[error("Failed to compose output PDF: {0}")]
    ComposeFailed(String),

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrPdfError {
    /// Which class of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrPdfError::InvalidConfig(_)
            | OcrPdfError::OcrRuntimeUnavailable { .. }
            | OcrPdfError::RasterToolchainMissing { .. }
            | OcrPdfError::PdfiumBindingFailed(_) => ErrorKind::Configuration,
            OcrPdfError::FileNotFound { .. }
            | OcrPdfError::PermissionDenied { .. }
            | OcrPdfError::NotAPdf { .. }
            | OcrPdfError::CorruptPdf { .. }
            | OcrPdfError::PasswordRequired { .. }
            | OcrPdfError::WrongPassword { .. } => ErrorKind::Input,
            OcrPdfError::RasterisationFailed { .. } | OcrPdfError::OcrFailed { .. } => {
                ErrorKind::Processing
            }
            OcrPdfError::ComposeFailed(_) | OcrPdfError::OutputWriteFailed { .. } => {
                ErrorKind::Output
            }
            OcrPdfError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Page number (1-indexed) the failure is tied to, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            OcrPdfError::RasterisationFailed { page, .. } | OcrPdfError::OcrFailed { page, .. } => {
                Some(*page)
            }
            _ => None,
        }
    }
}
