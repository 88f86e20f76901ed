//! Global atomic counters for triage observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a request).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    signals_processed: AtomicU64,
    channel_searches: AtomicU64,
    channel_failures: AtomicU64,
    results_merged: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            signals_processed: AtomicU64::new(0),
            channel_searches: AtomicU64::new(0),
            channel_failures: AtomicU64::new(0),
            results_merged: AtomicU64::new(0),
        }
    }

    pub fn inc_signals_processed(&self) {
        self.signals_processed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "signals_processed", "counter incremented");
    }

    pub fn inc_channel_searches(&self) {
        self.channel_searches.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "channel_searches", "counter incremented");
    }

    pub fn inc_channel_failures(&self) {
        self.channel_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "channel_failures", "counter incremented");
    }

    /// Add the number of results returned by one fusion pass.
    pub fn add_results_merged(&self, n: u64) {
        self.results_merged.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "results_merged", n, "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            signals_processed = self.signals_processed(),
            channel_searches = self.channel_searches(),
            channel_failures = self.channel_failures(),
            results_merged = self.results_merged(),
        );
    }

    pub fn signals_processed(&self) -> u64 {
        self.signals_processed.load(Ordering::Relaxed)
    }

    pub fn channel_searches(&self) -> u64 {
        self.channel_searches.load(Ordering::Relaxed)
    }

    pub fn channel_failures(&self) -> u64 {
        self.channel_failures.load(Ordering::Relaxed)
    }

    pub fn results_merged(&self) -> u64 {
        self.results_merged.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.signals_processed.store(0, Ordering::Relaxed);
        self.channel_searches.store(0, Ordering::Relaxed);
        self.channel_failures.store(0, Ordering::Relaxed);
        self.results_merged.store(0, Ordering::Relaxed);
    }
}
