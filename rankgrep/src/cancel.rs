use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag that stops a running search.
///
/// Clones share the same flag, so one clone can be handed to a signal handler
/// while the search polls another.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// The underlying flag, for APIs that set an `AtomicBool` directly
    /// (e.g. `signal_hook::flag::register`)
    pub fn as_atomic(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}
