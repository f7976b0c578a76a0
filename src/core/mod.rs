//! Core storage types for prioritized replay.

pub mod batch;
pub mod ring_store;
pub mod weights;

pub use batch::Batchable;
pub use ring_store::ConcurrentRing;
pub use weights::{Device, WeightVector};
