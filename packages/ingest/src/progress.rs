//! Progress reporting trait for long-running operations.
//!
//! Defines a [`ProgressCallback`] trait that decouples progress reporting
//! from any specific rendering backend (e.g., `indicatif` progress bars,
//! log-only reporting, or silence). Implementations are provided upstream
//! in crates that choose a rendering strategy.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for reporting progress from long-running operations.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// A no-op implementation of [`ProgressCallback`] that silently ignores
/// all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// Builds a progress reporter for an operation with the given label.
pub type ProgressFactory<'a> = &'a dyn Fn(&str) -> Arc<dyn ProgressCallback>;

/// A [`ProgressCallback`] that reports through the `log` facade.
///
/// Used by the standalone ingest binary, which has no progress bar
/// renderer.
pub struct LogProgress {
    label: String,
    total: AtomicU64,
    done: AtomicU64,
}

impl LogProgress {
    /// Creates a shared log-backed reporter.
    #[must_use]
    pub fn shared(label: &str) -> Arc<dyn ProgressCallback> {
        Arc::new(Self {
            label: label.to_string(),
            total: AtomicU64::new(0),
            done: AtomicU64::new(0),
        })
    }
}

impl ProgressCallback for LogProgress {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        log::info!("{}: {total} item(s)", self.label);
    }

    fn inc(&self, delta: u64) {
        let done = self.done.fetch_add(delta, Ordering::Relaxed) + delta;
        log::debug!(
            "{}: {done}/{}",
            self.label,
            self.total.load(Ordering::Relaxed)
        );
    }

    fn set_message(&self, msg: String) {
        log::debug!("{}: {msg}", self.label);
    }

    fn finish(&self, msg: String) {
        log::info!("{}: {msg}", self.label);
    }
}
