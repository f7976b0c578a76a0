//! Replay buffer metrics.

pub mod replay_metrics;

pub use replay_metrics::{replay_metrics, ReplayMetrics, SharedReplayMetrics};
