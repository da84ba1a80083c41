// Performance metrics module
//
// Provides lightweight metrics tracking for monitoring batch runs

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-wide performance metrics
///
/// Uses atomic operations for thread-safe metric tracking without locks.
/// Metrics are collected throughout the application lifecycle and logged
/// on shutdown, with periodic snapshots during long batch runs.
#[derive(Debug)]
pub struct Metrics {
    /// Total number of folders processed successfully
    pub folders_succeeded: AtomicUsize,

    /// Total number of folders skipped
    pub folders_skipped: AtomicUsize,

    /// Total number of folders that failed
    pub folders_failed: AtomicUsize,

    /// Total per-folder processing time in milliseconds
    pub total_processing_time_ms: AtomicU64,

    /// Number of chat completion calls attempted
    pub provider_calls: AtomicU64,

    /// Number of chat completion calls that failed after retries
    pub provider_failures: AtomicU64,

    /// Number of state updates performed
    pub state_updates: AtomicU64,

    /// Number of state broadcasts delivered to a subscriber
    pub state_broadcasts: AtomicU64,

    /// Number of state broadcasts with no subscriber listening
    pub state_broadcast_errors: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            folders_succeeded: AtomicUsize::new(0),
            folders_skipped: AtomicUsize::new(0),
            folders_failed: AtomicUsize::new(0),
            total_processing_time_ms: AtomicU64::new(0),
            provider_calls: AtomicU64::new(0),
            provider_failures: AtomicU64::new(0),
            state_updates: AtomicU64::new(0),
            state_broadcasts: AtomicU64::new(0),
            state_broadcast_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a successfully processed folder
    pub fn record_folder_succeeded(&self) {
        self.folders_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a skipped folder
    pub fn record_folder_skipped(&self) {
        self.folders_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed folder
    pub fn record_folder_failed(&self) {
        self.folders_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record wall time spent processing one folder
    pub fn record_processing_time(&self, duration: Duration) {
        self.total_processing_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Record a chat completion call
    pub fn record_provider_call(&self) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a chat completion call that failed after retries
    pub fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state update
    pub fn record_state_update(&self) {
        self.state_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivered state broadcast
    pub fn record_state_broadcast(&self) {
        self.state_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state broadcast that found no subscriber
    pub fn record_state_broadcast_error(&self) {
        self.state_broadcast_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Total number of folders processed so far
    pub fn folders_processed(&self) -> usize {
        self.folders_succeeded.load(Ordering::Relaxed)
            + self.folders_skipped.load(Ordering::Relaxed)
            + self.folders_failed.load(Ordering::Relaxed)
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get average processing time per folder in milliseconds
    pub fn avg_folder_time_ms(&self) -> f64 {
        let total = self.total_processing_time_ms.load(Ordering::Relaxed);
        let count = self.folders_processed();
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        let uptime = self.uptime();
        tracing::info!("=== Performance Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", uptime.as_secs_f64());
        tracing::info!(
            "Folders: {} succeeded, {} skipped, {} failed",
            self.folders_succeeded.load(Ordering::Relaxed),
            self.folders_skipped.load(Ordering::Relaxed),
            self.folders_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Total processing time: {:.2}s (avg: {:.2}ms per folder)",
            self.total_processing_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_folder_time_ms()
        );
        tracing::info!(
            "Provider calls: {}, failures: {}",
            self.provider_calls.load(Ordering::Relaxed),
            self.provider_failures.load(Ordering::Relaxed)
        );
        tracing::info!(
            "State updates: {}, broadcasts: {}, unheard: {}",
            self.state_updates.load(Ordering::Relaxed),
            self.state_broadcasts.load(Ordering::Relaxed),
            self.state_broadcast_errors.load(Ordering::Relaxed)
        );
    }

    /// Log periodic metrics (for long-running batches)
    pub fn log_periodic(&self) {
        tracing::info!(
            "Metrics: {} folders processed, {} provider calls, uptime {:.0}s",
            self.folders_processed(),
            self.provider_calls.load(Ordering::Relaxed),
            self.uptime().as_secs_f64()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
