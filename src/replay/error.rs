//! Recoverable error type for replay construction.
//!
//! Only configuration problems are recoverable. Runtime contract
//! violations (shape mismatches, sampling before acknowledging the
//! previous batch, ring accounting breaches) indicate an upstream bug that
//! would corrupt the replay distribution, so they abort instead.

use std::fmt;

/// Error type for building a replay buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// Capacity must be positive.
    InvalidCapacity(usize),
    /// Priority exponent must be finite and non-negative.
    InvalidAlpha(f32),
    /// Importance-sampling exponent must be finite and non-negative.
    InvalidBeta(f32),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::InvalidCapacity(c) => {
                write!(f, "capacity must be positive, got {}", c)
            }
            ReplayError::InvalidAlpha(a) => {
                write!(f, "alpha must be finite and non-negative, got {}", a)
            }
            ReplayError::InvalidBeta(b) => {
                write!(f, "beta must be finite and non-negative, got {}", b)
            }
        }
    }
}

impl std::error::Error for ReplayError {}
