//! Progress reporting trait for long-running pipeline steps.
//!
//! Decouples progress reporting from any rendering backend. The CLI
//! provides an `indicatif` spinner; library callers and tests use
//! [`null_progress`].

use std::sync::Arc;

/// Trait for reporting progress from pipeline steps.
///
/// Implementations must be `Send + Sync` so they can be shared behind an
/// [`Arc`] across await points.
pub trait ProgressCallback: Send + Sync {
    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// A no-op [`ProgressCallback`].
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
