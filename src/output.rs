//! Result types returned by the conversion entry points.

use serde::{Deserialize, Serialize};

/// Metadata of the source PDF, read without rendering any page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    /// Page count of the whole document, regardless of `max_pages`.
    pub page_count: usize,
    pub pdf_version: String,
}

/// Recognised text of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Raw OCR output, exactly as the engine returned it.
    pub text: String,
}

/// Timing and size figures for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source document.
    pub document_pages: usize,
    /// Pages rasterised and recognised (the working set).
    pub processed_pages: usize,
    /// Paragraph flowables handed to the composer. Zero until composed.
    pub paragraphs: usize,
    /// Pages in the output PDF. Zero until composed.
    pub output_pages: usize,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub compose_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything produced by [`crate::convert::convert`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Accumulated text: every page's OCR output followed by `"\n\n"`, in page order.
    pub text: String,
    /// Per-page OCR output, sorted by page number.
    pub pages: Vec<PageText>,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// The paragraph units the composer lays out, one per line of `text`.
    pub fn paragraphs(&self) -> Vec<&str> {
        crate::pipeline::compose::split_paragraphs(&self.text)
    }
}
