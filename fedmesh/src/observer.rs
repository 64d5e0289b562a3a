//! Progress observers
//!
//! A sink for human-readable progress strings. Observers never fail and
//! never affect the round's outcome.

/// Receives progress/status messages from the protocol
pub trait ProgressObserver: Send + Sync {
    /// Deliver one progress message
    fn message(&self, text: &str);
}

/// Observer that forwards progress to `tracing` at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn message(&self, text: &str) {
        tracing::info!(target: "fedmesh::progress", "{text}");
    }
}

/// Observer that drops every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn message(&self, _text: &str) {}
}
