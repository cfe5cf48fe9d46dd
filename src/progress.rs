//! Progress-callback trait for per-page pipeline events.
//!
//! Pass an [`Arc<dyn PipelineProgress>`] to
//! [`crate::orchestrator::Pipeline::with_progress`] to receive events as the
//! pipeline describes and persists each page. The CLI drives an `indicatif`
//! bar from it; the web front end uses the no-op default.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2docs::PipelineProgress;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingProgress {
//!     described: AtomicUsize,
//! }
//!
//! impl PipelineProgress for CountingProgress {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, description_len: usize) {
//!         self.described.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}: {description_len} chars");
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events for one run arrive in page order.
pub trait PipelineProgress: Send + Sync {
    /// Called once after rendering, before the first describe call.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the describe request is sent for a page.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been described.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, description_len: usize) {
        let _ = (page_num, total_pages, description_len);
    }

    /// Called when a page fails. The run stops after this event.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called when a page has been appended to the remote document.
    fn on_page_appended(&self, page_num: usize, total_pages: usize, document_id: &str) {
        let _ = (page_num, total_pages, document_id);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl PipelineProgress for NoopProgress {}

/// Convenience alias for the shared callback type.
pub type ProgressCallback = Arc<dyn PipelineProgress>;
