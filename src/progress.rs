//! Progress-callback trait for extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractorConfigBuilder::progress_callback`] to be told
//! when an extraction starts and how it ends. The CLI uses it to drive its
//! busy spinner; a GUI could disable its "Extract" button for the duration.
//!
//! # Example
//!
//! ```rust
//! use edgequake_img2latex::{ExtractionProgressCallback, ExtractorConfig};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl ExtractionProgressCallback for Log {
//!     fn on_extraction_error(&self, image: &str, error: &str) {
//!         eprintln!("{image}: {error}");
//!     }
//! }
//!
//! let config = ExtractorConfig::builder()
//!     .progress_callback(Arc::new(Log) as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by [`crate::extract::Extractor`] around each extraction.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called after the image has been read, before it is decoded.
    ///
    /// # Arguments
    /// * `image`: display name of the upload
    fn on_extraction_start(&self, image: &str) {
        let _ = image;
    }

    /// Called just before the completion request is sent.
    fn on_request_sent(&self, image: &str, payload_bytes: usize) {
        let _ = (image, payload_bytes);
    }

    /// Called when the model returned text.
    ///
    /// # Arguments
    /// * `latex_len`: byte length of the returned text
    fn on_extraction_complete(&self, image: &str, latex_len: usize) {
        let _ = (image, latex_len);
    }

    /// Called when the extraction yielded no result.
    fn on_extraction_error(&self, image: &str, error: &str) {
        let _ = (image, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractorConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
