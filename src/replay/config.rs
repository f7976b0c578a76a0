//! Configuration for the prioritized replay buffer.

use serde::{Deserialize, Serialize};

use super::error::ReplayError;

/// Configuration for [`PrioritizedReplay`](super::PrioritizedReplay).
///
/// All options are fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Nominal population target. Physical storage is oversized by 25% so
    /// the buffer can transiently overfill between samples; sampling pops
    /// the overflow back down to this value.
    pub capacity: usize,
    /// PRNG seed for reproducible sampling.
    pub seed: u64,
    /// Priority exponent: `priority^alpha` is the stored weight.
    /// 0 degenerates to uniform sampling, 1 to fully proportional.
    pub alpha: f32,
    /// Importance-sampling correction exponent: returned weights are
    /// shaped by `(N * p)^-beta`, normalized by their maximum.
    pub beta: f32,
    /// Number of sample batches to prepare ahead of the trainer.
    /// 0 disables the prefetch pipeline.
    pub prefetch: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            seed: 0,
            alpha: 0.6,
            beta: 0.4,
            prefetch: 0,
        }
    }
}

impl ReplayConfig {
    /// Create a config with the given nominal capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the PRNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the priority exponent.
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the importance-sampling exponent.
    pub fn with_beta(mut self, beta: f32) -> Self {
        self.beta = beta;
        self
    }

    /// Set the prefetch pipeline depth.
    pub fn with_prefetch(mut self, prefetch: usize) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Physical slot count backing this configuration.
    ///
    /// Matches the reference sizing: 1.25x the nominal capacity,
    /// truncated (capacity 10 gives 12 physical slots).
    pub fn physical_capacity(&self) -> usize {
        (1.25 * self.capacity as f64) as usize
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.capacity == 0 {
            return Err(ReplayError::InvalidCapacity(self.capacity));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(ReplayError::InvalidAlpha(self.alpha));
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(ReplayError::InvalidBeta(self.beta));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = ReplayConfig::new(1000)
            .with_seed(7)
            .with_alpha(1.0)
            .with_beta(0.5)
            .with_prefetch(3);

        assert_eq!(config.capacity, 1000);
        assert_eq!(config.seed, 7);
        assert_eq!(config.alpha, 1.0);
        assert_eq!(config.beta, 0.5);
        assert_eq!(config.prefetch, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_physical_capacity_truncates() {
        assert_eq!(ReplayConfig::new(10).physical_capacity(), 12);
        assert_eq!(ReplayConfig::new(4).physical_capacity(), 5);
        assert_eq!(ReplayConfig::new(100_000).physical_capacity(), 125_000);
    }

    #[test]
    fn test_validation_rejects_bad_options() {
        assert_eq!(
            ReplayConfig::new(0).validate(),
            Err(ReplayError::InvalidCapacity(0))
        );
        assert!(matches!(
            ReplayConfig::new(10).with_alpha(-1.0).validate(),
            Err(ReplayError::InvalidAlpha(_))
        ));
        assert!(matches!(
            ReplayConfig::new(10).with_beta(f32::NAN).validate(),
            Err(ReplayError::InvalidBeta(_))
        ));
    }
}
