//! # Prioritized Replay: Concurrent Experience Replay for Distributed RL
//!
//! A prioritized experience replay buffer shared between actor threads
//! that append trajectories and a learner that draws priority-weighted
//! batches and feeds revised priorities back. The buffer is the single
//! synchronization point between them.
//!
//! ## Architecture Overview
//!
//! ```text
//! Actor 0 ─┐                                         ┌──────────────┐
//! Actor 1 ─┼── add (priority^α) ──┐                  │   Learner    │
//! Actor N ─┘   blocking admission │                  └──────┬───────┘
//!                                 ▼                         │ sample
//!                     ┌───────────────────────┐             ▼
//!                     │    ConcurrentRing     │   ┌──────────────────┐
//!                     │  [head ── safe_tail)  │◄──┤ stratified scan  │
//!                     │  committed, sampled   │   │ + IS weights     │
//!                     │  [safe_tail ── tail)  │   │ + prefetch FIFO  │
//!                     │  reserved, in-flight  │   └────────┬─────────┘
//!                     └───────────▲───────────┘            │
//!                                 └──── update_priority ───┘
//! ```
//!
//! Appends commit through a two-phase protocol so the region visible to
//! the sampler is always contiguous; element reads are lock-free. Between
//! `sample` and `update_priority`, slots that rotated out of the ring are
//! detected by a per-slot evicted flag and their stale updates dropped.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use prioritized_replay::{PrioritizedReplay, ReplayConfig, Device};
//!
//! let config = ReplayConfig::new(100_000)
//!     .with_seed(42)
//!     .with_alpha(0.6)
//!     .with_beta(0.4)
//!     .with_prefetch(3);
//!
//! let buffer: PrioritizedReplay<MyTransition> = PrioritizedReplay::new(config)?;
//!
//! // Producer threads get clones of the handle.
//! buffer.add_one(transition, td_error.abs());
//!
//! // Learner cycle.
//! let (batch, is_weights) = buffer.sample(256, &Device::Cpu);
//! let td_errors = train_step(batch, is_weights);
//! buffer.update_priority(&td_errors);
//! ```

pub mod core;
pub mod metrics;
pub mod replay;

// Re-export commonly used types
pub use crate::core::batch::Batchable;
pub use crate::core::ring_store::ConcurrentRing;
pub use crate::core::weights::{Device, WeightVector};
pub use crate::metrics::{replay_metrics, ReplayMetrics, SharedReplayMetrics};
pub use crate::replay::{PrioritizedReplay, ReplayConfig, ReplayError};
