//! Prioritized replay over the concurrent ring store.
//!
//! Producers append records weighted by `priority^alpha`; the consumer
//! draws stratified priority-proportional batches with importance-sampling
//! correction and feeds revised priorities back. Sampling and priority
//! updates form a strict handshake: every `sample` must be acknowledged by
//! `update_priority` (or waived with `keep_priority`) before the next one.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::core::batch::Batchable;
use crate::core::ring_store::ConcurrentRing;
use crate::core::weights::{Device, WeightVector};
use crate::metrics::ReplayMetrics;

use super::config::ReplayConfig;
use super::error::ReplayError;
use super::prefetch::PendingBatch;

/// One drawn batch together with the physical slot ids awaiting their
/// priority update.
struct Drawn<T, W> {
    batch: T,
    weights: W,
    ids: Vec<usize>,
}

/// Sampler-mutex state: the PRNG is only ever touched under it, so a fixed
/// seed reproduces the draw sequence as long as one consumer drives the
/// buffer.
struct Sampler {
    rng: StdRng,
}

/// Consumer-cycle state: the ids handed out by the most recent `sample`,
/// the prefetch FIFO, and the drain cursor for `get_new_content`.
struct Consumer<T, W> {
    sampled_ids: Vec<usize>,
    pending: VecDeque<PendingBatch<Drawn<T, W>>>,
    last_query: usize,
}

/// Concurrent prioritized experience replay buffer.
///
/// The buffer is a handle: cloning is cheap and every clone refers to the
/// same storage, like a channel endpoint. Hand clones to producer threads
/// and keep one on the consumer.
pub struct PrioritizedReplay<T: Batchable, W: WeightVector = Vec<f32>> {
    inner: Arc<ReplayInner<T, W>>,
}

impl<T: Batchable, W: WeightVector> Clone for PrioritizedReplay<T, W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ReplayInner<T: Batchable, W: WeightVector> {
    alpha: f32,
    beta: f32,
    prefetch: usize,
    capacity: usize,
    storage: ConcurrentRing<T>,
    num_add: AtomicUsize,
    sampler: Mutex<Sampler>,
    consumer: Mutex<Consumer<T, W>>,
    metrics: ReplayMetrics,
}

impl<T: Batchable, W: WeightVector> PrioritizedReplay<T, W> {
    /// Build a replay buffer from a validated configuration.
    ///
    /// Physical storage is oversized by 25% over the nominal capacity so
    /// appends can land while a sample is in flight; sampling pops the
    /// overflow back down.
    pub fn new(config: ReplayConfig) -> Result<Self, ReplayError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(ReplayInner {
                alpha: config.alpha,
                beta: config.beta,
                prefetch: config.prefetch,
                capacity: config.capacity,
                storage: ConcurrentRing::new(config.physical_capacity()),
                num_add: AtomicUsize::new(0),
                sampler: Mutex::new(Sampler {
                    rng: StdRng::seed_from_u64(config.seed),
                }),
                consumer: Mutex::new(Consumer {
                    sampled_ids: Vec::new(),
                    pending: VecDeque::new(),
                    last_query: 0,
                }),
                metrics: ReplayMetrics::new(),
            }),
        })
    }

    /// Admit a block of records with their priorities.
    ///
    /// Priorities are transformed to stored weights by `p^alpha`. Blocks
    /// until the ring has room; a chronically full buffer is backpressure,
    /// not an error.
    pub fn add(&self, samples: Vec<T>, priorities: &W) {
        self.inner.add(samples, priorities);
    }

    /// Admit a single record.
    pub fn add_one(&self, sample: T, priority: f32) {
        self.inner.add(vec![sample], &W::from_vec(vec![priority]));
    }

    /// Unpack a collated batch and admit its records one by one.
    pub fn add_batch(&self, batch: T, priorities: &W) {
        self.inner.add_batch(batch, priorities);
    }

    /// Admit a collated batch on a worker thread.
    pub fn add_batch_async(&self, batch: T, priorities: W) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        std::thread::spawn(move || {
            inner.add_batch(batch, &priorities);
        })
    }

    /// Draw a prioritized batch and its importance-sampling weights.
    ///
    /// With prefetching enabled the result is taken from the pipeline head
    /// when available, and the pipeline is topped back up with worker
    /// threads before returning.
    ///
    /// The physical ids of the drawn slots are retained; the caller must
    /// resolve them via [`update_priority`](Self::update_priority) or
    /// [`keep_priority`](Self::keep_priority) before sampling again —
    /// sampling with an unresolved batch is a fatal contract violation.
    pub fn sample(&self, batchsize: usize, device: &Device) -> (T, W) {
        let inner = &self.inner;
        let mut consumer = inner.consumer.lock();
        if !consumer.sampled_ids.is_empty() {
            log::error!(
                "sample called with {} unresolved ids from the previous batch",
                consumer.sampled_ids.len()
            );
            panic!("previous batch's priorities have not been updated");
        }

        let drawn = if inner.prefetch == 0 {
            inner.sample_batch(batchsize, device)
        } else {
            let drawn = match consumer.pending.pop_front() {
                Some(pending) => pending.wait(),
                None => inner.sample_batch(batchsize, device),
            };
            while consumer.pending.len() < inner.prefetch {
                let worker = Arc::clone(inner);
                let device = device.clone();
                consumer
                    .pending
                    .push_back(PendingBatch::spawn(move || {
                        worker.sample_batch(batchsize, &device)
                    }));
            }
            drawn
        };

        consumer.sampled_ids = drawn.ids;
        inner.metrics.record_batch();
        (drawn.batch, drawn.weights)
    }

    /// Feed revised priorities back for the most recently sampled batch.
    ///
    /// Priorities are re-exponentiated by `alpha` and written in place;
    /// slots evicted since the sample are silently skipped (their weight
    /// already left the running sum at pop time).
    pub fn update_priority(&self, priorities: &W) {
        let inner = &self.inner;
        let mut consumer = inner.consumer.lock();
        if priorities.len() != consumer.sampled_ids.len() {
            log::error!(
                "priority update of length {} does not match {} pending ids",
                priorities.len(),
                consumer.sampled_ids.len()
            );
            panic!("priority update length mismatch");
        }

        let weights = priorities.powf(inner.alpha);
        {
            let _sampler = inner.sampler.lock();
            let skipped = inner
                .storage
                .update(&consumer.sampled_ids, weights.as_slice());
            if skipped > 0 {
                log::debug!("dropped {} stale priority updates on evicted slots", skipped);
                inner.metrics.add_stale_skipped(skipped);
            }
        }
        consumer.sampled_ids.clear();
    }

    /// Discard the pending ids without updating their priorities.
    pub fn keep_priority(&self) {
        self.inner.consumer.lock().sampled_ids.clear();
    }

    /// Number of records currently visible to the sampler.
    pub fn size(&self) -> usize {
        self.inner.storage.safe_size()
    }

    /// Total records ever admitted.
    pub fn num_add(&self) -> usize {
        self.inner.num_add.load(Ordering::Relaxed)
    }

    /// Nominal capacity.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of batches currently queued in the prefetch pipeline.
    pub fn prefetch_depth(&self) -> usize {
        self.inner.consumer.lock().pending.len()
    }

    /// Replay activity counters.
    pub fn metrics(&self) -> &ReplayMetrics {
        &self.inner.metrics
    }

    /// Drain the records admitted since the previous call, oldest first.
    ///
    /// Serves an on-policy consumer that wants every record exactly once:
    /// the drained records are popped from the store. Returns the drained
    /// count, the collated batch (`None` when nothing was drained), and
    /// the stored weights of the drained records. The drain cursor only
    /// advances by what was actually popped, so records still in flight
    /// through an append are picked up by the next call.
    pub fn get_new_content(&self) -> (usize, Option<T>, W) {
        let inner = &self.inner;
        let mut consumer = inner.consumer.lock();
        let _sampler = inner.sampler.lock();

        let safe_size = inner.storage.safe_size();
        let fresh = inner.num_add.load(Ordering::Relaxed) - consumer.last_query;
        let count = fresh.min(safe_size);
        if count == 0 {
            return (0, None, W::from_vec(Vec::new()));
        }

        let mut samples = Vec::with_capacity(count);
        let mut weights = Vec::with_capacity(count);
        for cur in 0..count {
            samples.push(inner.storage.get_element_and_mark(cur));
            weights.push(inner.storage.get_weight(cur).0);
        }
        inner.storage.block_pop(count);
        inner.metrics.add_evicted(count);
        consumer.last_query += count;

        (count, Some(T::pack(samples)), W::from_vec(weights))
    }
}

impl<T: Batchable, W: WeightVector> ReplayInner<T, W> {
    fn add(&self, samples: Vec<T>, priorities: &W) {
        assert_eq!(
            priorities.len(),
            samples.len(),
            "priority count {} does not match sample count {}",
            priorities.len(),
            samples.len()
        );
        let n = samples.len();
        let weights = priorities.powf(self.alpha);
        self.storage.block_append(samples, weights.as_slice());
        self.num_add.fetch_add(n, Ordering::Relaxed);
    }

    fn add_batch(&self, batch: T, priorities: &W) {
        let items = batch.unpack();
        assert_eq!(
            priorities.len(),
            items.len(),
            "priority count {} does not match batch size {}",
            priorities.len(),
            items.len()
        );
        for (item, &priority) in items.into_iter().zip(priorities.as_slice().iter()) {
            self.add(vec![item], &W::from_vec(vec![priority]));
        }
    }

    /// Run one stratified scan over the committed region.
    ///
    /// Holds the sampler mutex across the scan: the region
    /// `[head, head + safe_size)` stays pinned because this sampler is the
    /// only popper, which is what makes the lock-free slot reads sound.
    fn sample_batch(&self, batchsize: usize, device: &Device) -> Drawn<T, W> {
        assert!(batchsize > 0, "batch size must be positive");
        let mut sampler = self.sampler.lock();

        let (size, sum) = self.storage.safe_size_with_sum();
        let segment = sum / batchsize as f64;

        let mut samples = Vec::with_capacity(batchsize);
        let mut weights = vec![0.0f32; batchsize];
        let mut ids = vec![0usize; batchsize];

        let mut acc_sum = 0.0f64;
        let mut next_idx = 0usize;
        let mut w = 0.0f32;
        let mut id = 0usize;
        for i in 0..batchsize {
            let offset = if segment > 0.0 {
                sampler.rng.gen_range(0.0..segment)
            } else {
                0.0
            };
            // Clamp guards the rightmost draw against the accumulated
            // total under floating-point drift.
            let draw = (offset + i as f64 * segment).min(sum - 0.2);

            loop {
                if acc_sum > 0.0 && acc_sum >= draw {
                    samples.push(self.storage.get_element_and_mark(next_idx - 1));
                    weights[i] = w;
                    ids[i] = id;
                    break;
                }
                if next_idx == size {
                    log::error!(
                        "sampler scan exhausted the committed region: next_idx={}/{} acc_sum={} sum={} draw={}",
                        next_idx,
                        size,
                        acc_sum,
                        sum,
                        draw
                    );
                    panic!("sampler scan exhausted the committed region");
                }
                let (next_w, next_id) = self.storage.get_weight(next_idx);
                w = next_w;
                id = next_id;
                acc_sum += next_w as f64;
                next_idx += 1;
            }
        }

        // Sampling is the one point in the priority path that sheds
        // overflow back down to the nominal capacity; the pop's has-space
        // broadcast wakes any parked producer.
        let reserved = self.storage.size();
        if reserved > self.capacity {
            let excess = reserved - self.capacity;
            self.storage.block_pop(excess);
            self.metrics.add_evicted(excess);
            log::debug!("evicted {} overflow records after sampling", excess);
        }

        drop(sampler);

        // The drawn elements are copies, so the weight math runs unlocked.
        let weights = W::from_vec(weights)
            .div_scalar(sum as f32)
            .mul_scalar(size as f32)
            .powf(-self.beta);
        let weights = weights.div_scalar(weights.max());
        let weights = weights.to_device(device);

        Drawn {
            batch: T::pack(samples),
            weights,
            ids,
        }
    }
}
