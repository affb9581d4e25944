//! Configuration options for the CFR solver.
//!
//! This module provides configuration structs that select the traversal
//! engine and the numeric tolerances it checks against, plus the statistics
//! collected while training.

use serde::{Deserialize, Serialize};

use crate::cfr::error::{ConfigurationError, NumericDriftWarning};
use crate::tree::PROBABILITY_TOLERANCE;

/// Default tolerance on the sum of a regret-matched strategy.
pub const STRATEGY_TOLERANCE: f64 = 1e-8;

/// Which traversal engine a solver runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Variant {
    /// Full-tree traversal with exact expected values.
    #[default]
    Vanilla,
    /// One sampled path of nature and opponent actions per iteration.
    OpponentSampling,
}

/// Configuration for the CFR solver.
///
/// # Example
/// ```
/// use tree_cfr::cfr::{CFRConfig, Variant};
///
/// let config = CFRConfig::sampling().with_seed(7);
/// assert_eq!(config.variant, Variant::OpponentSampling);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CFRConfig {
    /// Traversal engine.
    pub variant: Variant,

    /// Random seed for reproducibility.
    ///
    /// Only the sampling engine draws random numbers. If `None`, the
    /// generator is seeded from entropy.
    pub seed: Option<u64>,

    /// Allowed deviation of a regret-matched strategy's sum from 1 before a
    /// [`NumericDriftWarning`] is recorded.
    pub strategy_tolerance: f64,

    /// Allowed deviation of nature probabilities' sum from 1.
    pub probability_tolerance: f64,
}

impl Default for CFRConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Vanilla,
            seed: None,
            strategy_tolerance: STRATEGY_TOLERANCE,
            probability_tolerance: PROBABILITY_TOLERANCE,
        }
    }
}

impl CFRConfig {
    /// Create a new CFRConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Vanilla CFR.
    pub fn vanilla() -> Self {
        Self::default()
    }

    /// Opponent-sampling MCCFR.
    pub fn sampling() -> Self {
        Self {
            variant: Variant::OpponentSampling,
            ..Default::default()
        }
    }

    /// Builder method: set the engine.
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: set the strategy sum tolerance.
    pub fn with_strategy_tolerance(mut self, tolerance: f64) -> Self {
        self.strategy_tolerance = tolerance;
        self
    }

    /// Builder method: set the nature probability tolerance.
    pub fn with_probability_tolerance(mut self, tolerance: f64) -> Self {
        self.probability_tolerance = tolerance;
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.strategy_tolerance.is_finite() && self.strategy_tolerance >= 0.0) {
            return Err(ConfigurationError::InvalidConfig(format!(
                "strategy tolerance {} must be a non-negative number",
                self.strategy_tolerance
            )));
        }
        if !(self.probability_tolerance.is_finite()
            && self.probability_tolerance >= 0.0
            && self.probability_tolerance < 1.0)
        {
            return Err(ConfigurationError::InvalidConfig(format!(
                "probability tolerance {} is out of range [0, 1)",
                self.probability_tolerance
            )));
        }
        Ok(())
    }
}

/// Statistics tracked during CFR training.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CFRStats {
    /// Total number of iterations completed.
    pub iterations: u64,

    /// Number of allocated abstract information sets.
    pub info_sets: usize,

    /// Total time spent training (in seconds).
    pub elapsed_seconds: f64,

    /// Iterations per second.
    pub iterations_per_second: f64,

    /// Regret-matching passes whose strategy did not sum to one.
    pub drift_warnings: Vec<NumericDriftWarning>,

    /// Estimated exploitability (if calculated).
    pub exploitability: Option<f64>,

    /// History of exploitability measurements.
    pub exploitability_history: Vec<ExploitabilityPoint>,
}

/// A single exploitability measurement at a specific iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploitabilityPoint {
    /// Iteration number when this measurement was taken.
    pub iteration: u64,
    /// Exploitability value in payoff units.
    pub exploitability: f64,
}

impl CFRStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update iterations per second based on elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.iterations_per_second = self.iterations as f64 / self.elapsed_seconds;
        }
    }

    /// Record an exploitability measurement.
    pub fn record_exploitability(&mut self, iteration: u64, exploitability: f64) {
        self.exploitability = Some(exploitability);
        self.exploitability_history.push(ExploitabilityPoint {
            iteration,
            exploitability,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_vanilla() {
        let config = CFRConfig::default();
        assert_eq!(config.variant, Variant::Vanilla);
        assert_eq!(config.seed, None);
        assert_eq!(config.strategy_tolerance, 1e-8);
        assert_eq!(config.probability_tolerance, 1e-3);
    }

    #[test]
    fn test_validate_rejects_bad_tolerances() {
        assert!(CFRConfig::new().with_strategy_tolerance(-1.0).validate().is_err());
        assert!(CFRConfig::new().with_probability_tolerance(1.5).validate().is_err());
        assert!(CFRConfig::new().with_probability_tolerance(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = CFRConfig::sampling().with_seed(99);
        let json = serde_json::to_string(&config).unwrap();
        let back: CFRConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_stats_rate_and_history() {
        let mut stats = CFRStats::new();
        stats.iterations = 100;
        stats.elapsed_seconds = 2.0;
        stats.update_rate();
        assert_eq!(stats.iterations_per_second, 50.0);

        stats.record_exploitability(100, 0.25);
        assert_eq!(stats.exploitability, Some(0.25));
        assert_eq!(stats.exploitability_history.len(), 1);
    }
}
