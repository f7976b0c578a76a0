//! Shared counters for replay buffer activity.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Thread-safe replay activity counters.
///
/// All counters are monotone; producers and samplers bump them with
/// relaxed atomics, so readers see slightly stale but never torn values.
#[derive(Debug, Default)]
pub struct ReplayMetrics {
    /// Batches returned by the sampler.
    batches_sampled: AtomicUsize,
    /// Elements rotated out past the head.
    evicted: AtomicUsize,
    /// Priority updates dropped because their slot was already evicted.
    stale_updates_skipped: AtomicUsize,
}

impl ReplayMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sampled batch.
    pub fn record_batch(&self) {
        self.batches_sampled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record evicted elements.
    pub fn add_evicted(&self, n: usize) {
        self.evicted.fetch_add(n, Ordering::Relaxed);
    }

    /// Record priority updates skipped as stale.
    pub fn add_stale_skipped(&self, n: usize) {
        self.stale_updates_skipped.fetch_add(n, Ordering::Relaxed);
    }

    /// Total batches sampled.
    pub fn batches_sampled(&self) -> usize {
        self.batches_sampled.load(Ordering::Relaxed)
    }

    /// Total elements evicted.
    pub fn evicted(&self) -> usize {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Total stale priority updates skipped.
    pub fn stale_updates_skipped(&self) -> usize {
        self.stale_updates_skipped.load(Ordering::Relaxed)
    }
}

/// Thread-safe shared replay metrics.
pub type SharedReplayMetrics = Arc<ReplayMetrics>;

/// Create new shared replay metrics.
pub fn replay_metrics() -> SharedReplayMetrics {
    Arc::new(ReplayMetrics::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = ReplayMetrics::new();
        metrics.record_batch();
        metrics.record_batch();
        metrics.add_evicted(3);
        metrics.add_stale_skipped(1);

        assert_eq!(metrics.batches_sampled(), 2);
        assert_eq!(metrics.evicted(), 3);
        assert_eq!(metrics.stale_updates_skipped(), 1);
    }

    #[test]
    fn test_shared_metrics() {
        let metrics = replay_metrics();
        let clone = Arc::clone(&metrics);
        metrics.record_batch();
        assert_eq!(clone.batches_sampled(), 1);
    }
}
