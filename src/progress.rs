//! Progress-callback trait for conversion and captioning events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events while a document is converted and its images are captioned.
//! Captioning is the slow part (one VLM round trip per image), so that is
//! where most events fire.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2md::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     captioned: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_caption_complete(&self, index: usize, total: usize, image: &str, caption_len: usize) {
//!         self.captioned.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} {image}: {caption_len} chars");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     captioned: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::job::Strategy;
use std::sync::Arc;

/// Called by the pipeline as it converts a document and captions its images.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Images are captioned one at a time, in path order.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the input has been validated and the strategy chosen.
    fn on_conversion_start(&self, input: &str, strategy: Strategy) {
        let _ = (input, strategy);
    }

    /// Called when the converter has written the Markdown file.
    ///
    /// `images` is the number of image files now in the media directory.
    fn on_extraction_complete(&self, images: usize) {
        let _ = images;
    }

    /// Called just before the VLM request is sent for an image.
    ///
    /// `index` is 1-based.
    fn on_caption_start(&self, index: usize, total: usize, image: &str) {
        let _ = (index, total, image);
    }

    /// Called when an image caption was appended to the Markdown.
    fn on_caption_complete(&self, index: usize, total: usize, image: &str, caption_len: usize) {
        let _ = (index, total, image, caption_len);
    }

    /// Called when an image could not be captioned.
    fn on_caption_error(&self, index: usize, total: usize, image: &str, error: &str) {
        let _ = (index, total, image, error);
    }

    /// Called once after everything has run.
    ///
    /// `captioned` is zero when captioning was disabled.
    fn on_conversion_complete(&self, images: usize, captioned: usize) {
        let _ = (images, captioned);
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

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        captioned_total: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_caption_start(&self, _index: usize, _total: usize, _image: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_caption_complete(&self, _i: usize, _t: usize, _image: &str, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_caption_error(&self, _i: usize, _t: usize, _image: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _images: usize, captioned: usize) {
            self.captioned_total.store(captioned, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start("report.docx", Strategy::Pandoc);
        cb.on_extraction_complete(2);
        cb.on_caption_start(1, 2, "a.png");
        cb.on_caption_complete(1, 2, "a.png", 42);
        cb.on_caption_error(2, 2, "b.png", "some error");
        cb.on_conversion_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_caption_start(1, 2, "a.png");
        tracker.on_caption_complete(1, 2, "a.png", 100);
        tracker.on_caption_start(2, 2, "b.png");
        tracker.on_caption_error(2, 2, "b.png", "VLM timeout");
        tracker.on_conversion_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.captioned_total.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ConversionProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_conversion_start("slides.pdf", Strategy::PdfExtract);
        cb.on_caption_start(1, 1, "page1_img0.png");
    }
}
