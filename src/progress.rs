//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! phase changes and per-page OCR events. Progress is purely a side channel:
//! nothing a callback does can change the recognised text.
//!
//! Page totals always describe the working set (after `max_pages` is
//! applied), never the full document.
//!
//! # Example
//!
//! ```rust
//! use ocrpdf::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page_num, total_pages, text_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// Coarse stage of a conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPhase {
    /// Rendering PDF pages to images.
    Rasterising,
    /// Running OCR over the rendered pages.
    Recognising,
    /// Laying out and writing the output PDF.
    Composing,
}

impl fmt::Display for ConversionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversionPhase::Rasterising => "Converting PDF to images",
            ConversionPhase::Recognising => "Running OCR",
            ConversionPhase::Composing => "Creating searchable PDF",
        };
        f.write_str(s)
    }
}

/// Called by the conversion pipeline as it moves through its phases.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. With `concurrency > 1` the per-page methods may be
/// called from several threads at once.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called when the pipeline enters a new phase.
    fn on_phase(&self, phase: ConversionPhase) {
        let _ = phase;
    }

    /// Called once rasterisation is done and the working set is known.
    ///
    /// # Arguments
    /// * `total_pages`   : pages that will be recognised
    /// * `document_pages`: pages in the source document
    fn on_conversion_start(&self, total_pages: usize, document_pages: usize) {
        let _ = (total_pages, document_pages);
    }

    /// Called just before a page is handed to the OCR engine.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been recognised.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: working-set size
    /// * `text_len`   : byte length of the recognised text
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when OCR fails on a page. The run aborts right after.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been recognised.
    fn on_conversion_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        phases: Mutex<Vec<ConversionPhase>>,
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_phase(&self, phase: ConversionPhase) {
            self.phases.lock().unwrap().push(phase);
        }

        fn on_conversion_start(&self, total_pages: usize, _document_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _text_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_phase(ConversionPhase::Rasterising);
        cb.on_conversion_start(3, 40);
        cb.on_page_start(1, 3);
        cb.on_page_complete(1, 3, 42);
        cb.on_page_error(2, 3, "tesseract exited with 1");
        cb.on_conversion_complete(3);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_phase(ConversionPhase::Rasterising);
        tracker.on_conversion_start(2, 10);
        tracker.on_phase(ConversionPhase::Recognising);
        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, 100);
        tracker.on_page_start(2, 2);
        tracker.on_page_error(2, 2, "boom");

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.phases.lock().unwrap(),
            vec![ConversionPhase::Rasterising, ConversionPhase::Recognising]
        );
    }

    #[test]
    fn phase_display_is_human_readable() {
        assert_eq!(
            ConversionPhase::Composing.to_string(),
            "Creating searchable PDF"
        );
    }
}
