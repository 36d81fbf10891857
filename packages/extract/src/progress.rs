//! Progress reporting for batch extraction.
//!
//! [`ProgressCallback`] keeps the batch runner independent of how progress
//! is shown: the CLI renders `indicatif` bars, the server and tests report
//! nothing.

use std::sync::Arc;

/// Receives per-document progress from a batch run.
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// concurrently processed documents.
pub trait ProgressCallback: Send + Sync {
    /// Set the total number of documents.
    fn set_total(&self, total: u64);

    /// Set the current position (absolute, not delta).
    fn set_position(&self, pos: u64);

    /// Advance progress by `delta` documents.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
