//! Monte Carlo settings.

use serde::{Deserialize, Serialize};

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};
use ql_math::random_numbers::RngKind;

/// Settings shared by the Monte Carlo engines.
///
/// Exactly one of `samples` and `tolerance` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McConfig {
    /// Fixed number of samples.
    pub samples: Option<usize>,
    /// Target error estimate; samples are added until it is reached.
    pub tolerance: Option<Real>,
    /// Upper bound on the samples used in tolerance mode.
    pub max_samples: Option<usize>,
    /// Seed of the pseudo-random streams.
    pub seed: u64,
    /// Average each sample with its antithetic mirror.
    pub antithetic: bool,
    /// Use the engine's control variate, if it has one.
    pub control_variate: bool,
    /// Reorder the Gaussian variates by Brownian bridge.
    pub brownian_bridge: bool,
    /// Source of the Gaussian variates.
    pub rng: RngKind,
    /// Fixed number of time steps.
    pub time_steps: Option<usize>,
    /// Time steps per year of maturity.
    pub time_steps_per_year: Option<usize>,
    /// Samples drawn from each random stream.
    pub batch_size: usize,
}

impl Default for McConfig {
    fn default() -> Self {
        Self {
            samples: None,
            tolerance: None,
            max_samples: None,
            seed: 42,
            antithetic: false,
            control_variate: false,
            brownian_bridge: false,
            rng: RngKind::PseudoRandom,
            time_steps: None,
            time_steps_per_year: None,
            batch_size: 1024,
        }
    }
}

impl McConfig {
    /// Minimum number of samples in tolerance mode.
    pub const MIN_SAMPLES: usize = 1023;

    /// Use a fixed number of samples.
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Run until the error estimate reaches `tolerance`.
    pub fn with_tolerance(mut self, tolerance: Real) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Cap the samples used in tolerance mode.
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = Some(max_samples);
        self
    }

    /// Set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Toggle antithetic variates.
    pub fn with_antithetic(mut self, antithetic: bool) -> Self {
        self.antithetic = antithetic;
        self
    }

    /// Toggle the control variate.
    pub fn with_control_variate(mut self, control_variate: bool) -> Self {
        self.control_variate = control_variate;
        self
    }

    /// Toggle the Brownian bridge.
    pub fn with_brownian_bridge(mut self, brownian_bridge: bool) -> Self {
        self.brownian_bridge = brownian_bridge;
        self
    }

    /// Set the random sequence kind.
    pub fn with_rng(mut self, rng: RngKind) -> Self {
        self.rng = rng;
        self
    }

    /// Use a fixed number of time steps.
    pub fn with_time_steps(mut self, time_steps: usize) -> Self {
        self.time_steps = Some(time_steps);
        self
    }

    /// Use a number of time steps per year.
    pub fn with_time_steps_per_year(mut self, time_steps_per_year: usize) -> Self {
        self.time_steps_per_year = Some(time_steps_per_year);
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Check that the settings are consistent.
    pub fn validate(&self) -> Result<()> {
        match (self.samples, self.tolerance) {
            (Some(_), Some(_)) => {
                ql_core::fail!("number of samples and tolerance cannot both be given")
            }
            (None, None) => ql_core::fail!("number of samples or tolerance must be given"),
            (Some(n), None) => ensure!(n > 0, "number of samples must be positive"),
            (None, Some(tolerance)) => {
                ensure!(tolerance > 0.0, "tolerance must be positive, got {tolerance}");
                ensure!(
                    !self.rng.is_low_discrepancy(),
                    "tolerance is not available with low-discrepancy sequences"
                );
            }
        }
        ensure!(
            self.time_steps.is_none() || self.time_steps_per_year.is_none(),
            "time steps and time steps per year cannot both be given"
        );
        ensure!(self.time_steps != Some(0), "time steps must be positive");
        ensure!(self.time_steps_per_year != Some(0), "time steps per year must be positive");
        ensure!(self.batch_size > 0, "batch size must be positive");
        Ok(())
    }

    /// Number of time steps to use up to `maturity`; one if neither
    /// setting is given.
    pub fn steps_for(&self, maturity: Time) -> usize {
        match (self.time_steps, self.time_steps_per_year) {
            (Some(n), _) => n,
            (None, Some(per_year)) => ((per_year as Real * maturity).ceil() as usize).max(1),
            (None, None) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_xor_tolerance() {
        assert!(McConfig::default().validate().is_err());
        assert!(McConfig::default().with_samples(100).validate().is_ok());
        assert!(McConfig::default().with_tolerance(0.01).validate().is_ok());
        assert!(McConfig::default()
            .with_samples(100)
            .with_tolerance(0.01)
            .validate()
            .is_err());
    }

    #[test]
    fn tolerance_needs_pseudo_random_numbers() {
        let config = McConfig::default()
            .with_tolerance(0.01)
            .with_rng(RngKind::LowDiscrepancy);
        assert!(config.validate().is_err());
    }

    #[test]
    fn time_steps() {
        let base = McConfig::default().with_samples(10);
        assert_eq!(base.steps_for(2.0), 1);
        assert_eq!(base.clone().with_time_steps(12).steps_for(2.0), 12);
        assert_eq!(base.clone().with_time_steps_per_year(12).steps_for(0.5), 6);
        assert!(base.with_time_steps(4).with_time_steps_per_year(4).validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: McConfig = serde_json::from_str(r#"{"samples": 5000, "antithetic": true}"#).unwrap();
        assert_eq!(config.samples, Some(5000));
        assert!(config.antithetic);
        assert_eq!(config.batch_size, 1024);
    }
}
