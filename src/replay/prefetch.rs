//! Thread-backed pending batches for the prefetch pipeline.
//!
//! Each pending batch owns a worker thread that re-runs the sampler; the
//! handle resolves to the worker's result. Workers serialize on the
//! sampler mutex, so prefetching pipelines sampling against trainer
//! compute without ever running two scans at once.

use std::thread::JoinHandle;

/// Handle to a sample batch being computed on a worker thread.
pub(crate) struct PendingBatch<O> {
    handle: JoinHandle<O>,
}

impl<O: Send + 'static> PendingBatch<O> {
    /// Spawn a worker computing one batch.
    pub fn spawn(work: impl FnOnce() -> O + Send + 'static) -> Self {
        Self {
            handle: std::thread::spawn(work),
        }
    }

    /// Block until the worker finishes and take its result.
    ///
    /// A worker only dies on a fatal contract violation; its panic is
    /// re-raised here so the failure surfaces on the consumer thread.
    pub fn wait(self) -> O {
        match self.handle.join() {
            Ok(outcome) => outcome,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_returns_worker_result() {
        let pending = PendingBatch::spawn(|| 6 * 7);
        assert_eq!(pending.wait(), 42);
    }

    #[test]
    #[should_panic(expected = "worker failed")]
    fn test_wait_propagates_worker_panic() {
        let pending: PendingBatch<()> = PendingBatch::spawn(|| panic!("worker failed"));
        pending.wait();
    }
}
