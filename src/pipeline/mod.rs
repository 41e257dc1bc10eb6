//! Pipeline stages for scanned-PDF conversion.
//!
//! Each submodule implements exactly one transformation step, and the two
//! stages that wrap external tools (rendering, OCR) sit behind traits so they
//! can be swapped out without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ ocr ──▶ compose
//! (path)    (pdfium)  (tesseract) (printpdf)
//! ```
//!
//! 1. [`input`]  : validate the user-supplied path and the `%PDF` magic bytes
//! 2. [`render`] : rasterise the leading pages at the configured DPI; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`ocr`]    : one tesseract invocation per page image
//! 4. [`compose`]: split the accumulated text into paragraphs and typeset
//!    them into a new A4 PDF

pub mod compose;
pub mod input;
pub mod ocr;
pub mod render;
