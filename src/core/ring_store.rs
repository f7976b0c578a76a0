//! Concurrent ring store with a two-phase committed tail.
//!
//! Fixed-capacity circular buffer of `(element, weight)` pairs shared
//! between producer threads (append) and a sampler thread (read, update,
//! pop). The accounting lives behind one mutex; element and weight reads
//! bypass it entirely.
//!
//! # Append protocol
//!
//! ```text
//! phase 1 (locked):   wait for space, reserve [tail, tail+n), advance tail
//! phase 2 (unlocked): copy elements + weights into the reserved slots
//! phase 3 (locked):   wait until safe_tail == reservation start, then
//!                     publish: advance safe_tail/safe_size, add local sum
//! ```
//!
//! Phase 2 keeps payload-sized copies out of the critical section; phase 3
//! serializes publication in append-issue order, so the committed region
//! `[head, safe_tail)` is always contiguous and samplers never observe a
//! hole.
//!
//! # Lock-free reads
//!
//! `get_element_and_mark` and `get_weight` take no lock. They are sound
//! only under the caller contract spelled out on each method: the sampler
//! pins `[head, head + safe_size)` by holding its own mutex (no pop can
//! run until the sampler itself pops), and producers only write slots in
//! `[safe_tail, tail)`, which is disjoint from the pinned region.

use parking_lot::{Condvar, Mutex};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

/// One ring cell. The weight is stored as raw `f32` bits so concurrent
/// in-place priority updates stay lock-free; the evicted flag is sticky
/// between a pop and the next sampler read of the recycled slot.
struct Slot<T> {
    element: UnsafeCell<Option<T>>,
    weight: AtomicU32,
    evicted: AtomicBool,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self {
            element: UnsafeCell::new(None),
            weight: AtomicU32::new(0f32.to_bits()),
            evicted: AtomicBool::new(false),
        }
    }

    fn load_weight(&self) -> f32 {
        f32::from_bits(self.weight.load(Ordering::Relaxed))
    }

    fn store_weight(&self, w: f32) {
        self.weight.store(w.to_bits(), Ordering::Relaxed);
    }
}

/// Mutex-guarded accounting. `head` lives outside as an atomic mirror so
/// the lock-free accessors can resolve logical offsets; it is only ever
/// written while this mutex is held.
struct RingState {
    tail: usize,
    size: usize,
    safe_tail: usize,
    safe_size: usize,
    /// Running weight total over `[head, safe_tail)`, double precision so
    /// difference updates do not accumulate drift at f32 scale.
    sum: f64,
}

/// Fixed-capacity concurrent ring of `(element, weight)` pairs.
///
/// Appends block until space is available; there is no timeout. Pops and
/// updates are mutually exclusive by caller contract (the sampler mutex in
/// the replay layer), but both may run concurrently with appends.
pub struct ConcurrentRing<T> {
    capacity: usize,
    slots: Box<[Slot<T>]>,
    head: AtomicUsize,
    state: Mutex<RingState>,
    has_space: Condvar,
    tail_commit: Condvar,
}

// Element cells are only shared across threads per the pinned-region
// contract on the accessors; everything else is atomics or mutex-guarded.
unsafe impl<T: Send> Send for ConcurrentRing<T> {}
unsafe impl<T: Send> Sync for ConcurrentRing<T> {}

impl<T: Clone + Send> ConcurrentRing<T> {
    /// Create an empty ring with the given physical capacity.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be positive");
        Self {
            capacity,
            slots: (0..capacity).map(|_| Slot::empty()).collect(),
            head: AtomicUsize::new(0),
            state: Mutex::new(RingState {
                tail: 0,
                size: 0,
                safe_tail: 0,
                safe_size: 0,
                sum: 0.0,
            }),
            has_space: Condvar::new(),
            tail_commit: Condvar::new(),
        }
    }

    /// Physical capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current reserved size (committed and in-flight appends).
    pub fn size(&self) -> usize {
        self.state.lock().size
    }

    /// Current fully-committed size.
    pub fn safe_size(&self) -> usize {
        self.state.lock().safe_size
    }

    /// Committed size and running weight sum, read under one lock so the
    /// pair is a consistent snapshot.
    pub fn safe_size_with_sum(&self) -> (usize, f64) {
        let state = self.state.lock();
        (state.safe_size, state.sum)
    }

    /// Append a block of elements with their weights, blocking until the
    /// ring has room for the whole block.
    ///
    /// Weights are stored as given; the caller pre-exponentiates
    /// priorities. Publication happens in append-issue order even when
    /// producers race through the copy phase.
    pub fn block_append(&self, block: Vec<T>, weights: &[f32]) {
        let n = block.len();
        assert_eq!(
            weights.len(),
            n,
            "weight count {} does not match block size {}",
            weights.len(),
            n
        );
        if n == 0 {
            return;
        }

        // Phase 1: reserve.
        let start = {
            let mut state = self.state.lock();
            while state.size + n > self.capacity {
                self.has_space.wait(&mut state);
            }
            let start = state.tail;
            state.tail = (state.tail + n) % self.capacity;
            state.size += n;
            self.check_size(state.tail, state.size);
            start
        };

        // Phase 2: copy without the lock. The reservation above grants this
        // producer exclusive ownership of [start, start + n); samplers only
        // read [head, safe_tail), which cannot overlap it.
        let mut local_sum = 0.0f64;
        for (i, item) in block.into_iter().enumerate() {
            let j = (start + i) % self.capacity;
            let slot = &self.slots[j];
            unsafe {
                *slot.element.get() = Some(item);
            }
            slot.store_weight(weights[i]);
            local_sum += weights[i] as f64;
        }

        // Phase 3: publish in issue order.
        let end = (start + n) % self.capacity;
        {
            let mut state = self.state.lock();
            while state.safe_tail != start {
                self.tail_commit.wait(&mut state);
            }
            state.safe_tail = end;
            state.safe_size += n;
            state.sum += local_sum;
            self.check_size(state.safe_tail, state.safe_size);
        }
        self.tail_commit.notify_all();
    }

    /// Remove `n` elements from the head, marking their slots evicted and
    /// subtracting their weights from the running sum.
    ///
    /// Not reentrant with other `block_pop` or `update` calls; safe to run
    /// concurrently with `block_append`.
    pub fn block_pop(&self, n: usize) {
        let mut diff = 0.0f64;
        let mut idx = self.head.load(Ordering::Relaxed);
        for _ in 0..n {
            let slot = &self.slots[idx];
            diff -= slot.load_weight() as f64;
            slot.evicted.store(true, Ordering::Relaxed);
            idx = (idx + 1) % self.capacity;
        }

        {
            let mut state = self.state.lock();
            if state.safe_size < n {
                log::error!(
                    "pop of {} slots from a committed region of {}",
                    n,
                    state.safe_size
                );
                panic!("ring accounting corrupted");
            }
            state.sum += diff;
            self.head.store(idx, Ordering::Relaxed);
            state.safe_size -= n;
            state.size -= n;
            self.check_size(state.safe_tail, state.safe_size);
        }
        self.has_space.notify_all();
    }

    /// Replace the weights at the given physical slot indices, skipping
    /// slots whose evicted flag is set, and fold the net difference into
    /// the running sum. Returns how many slots were skipped as stale.
    ///
    /// Not reentrant with `block_pop`; safe concurrently with appends.
    pub fn update(&self, ids: &[usize], weights: &[f32]) -> usize {
        assert_eq!(
            ids.len(),
            weights.len(),
            "id count {} does not match weight count {}",
            ids.len(),
            weights.len()
        );

        let mut diff = 0.0f64;
        let mut skipped = 0;
        for (&id, &w) in ids.iter().zip(weights.iter()) {
            let slot = &self.slots[id];
            if slot.evicted.load(Ordering::Relaxed) {
                skipped += 1;
                continue;
            }
            diff += (w - slot.load_weight()) as f64;
            slot.store_weight(w);
        }

        self.state.lock().sum += diff;
        skipped
    }

    /// Copy the element at logical offset `idx` from the head, clearing
    /// the slot's evicted flag. Lock-free.
    ///
    /// # Contract
    ///
    /// The caller must guarantee that the physical slot lies inside
    /// `[head, head + safe_size)` and that no `block_pop` runs until the
    /// caller is done with the region. The replay sampler provides both by
    /// holding the sampler mutex across the scan and being the only popper.
    pub fn get_element_and_mark(&self, idx: usize) -> T {
        let id = (self.head.load(Ordering::Relaxed) + idx) % self.capacity;
        let slot = &self.slots[id];
        slot.evicted.store(false, Ordering::Relaxed);
        // Under the contract above the slot was committed before the
        // caller snapshotted safe_size, and no writer touches a committed
        // slot, so the unguarded read cannot tear.
        let element = unsafe { (*slot.element.get()).clone() };
        match element {
            Some(element) => element,
            None => {
                log::error!("read of uncommitted ring slot {} (logical offset {})", id, idx);
                panic!("read of uncommitted ring slot");
            }
        }
    }

    /// Read the weight at logical offset `idx` from the head, returning it
    /// with the physical slot index. Lock-free; same contract as
    /// [`get_element_and_mark`](Self::get_element_and_mark).
    pub fn get_weight(&self, idx: usize) -> (f32, usize) {
        let id = (self.head.load(Ordering::Relaxed) + idx) % self.capacity;
        (self.slots[id].load_weight(), id)
    }

    /// Head/tail/size consistency check, run on every accounting
    /// transition. A mismatch means a caller broke the reentrancy contract
    /// and the replay distribution can no longer be trusted.
    fn check_size(&self, tail: usize, size: usize) {
        let head = self.head.load(Ordering::Relaxed);
        let ok = if size == 0 {
            tail == head
        } else if tail > head {
            tail - head == size
        } else {
            tail + self.capacity - head == size
        };
        if !ok {
            log::error!(
                "ring accounting corrupted: head={} tail={} size={} capacity={}",
                head,
                tail,
                size,
                self.capacity
            );
            panic!("ring accounting corrupted");
        }
    }
}
