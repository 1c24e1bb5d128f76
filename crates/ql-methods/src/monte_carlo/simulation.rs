//! Batched, parallel Monte Carlo driver.
//!
//! Samples are drawn in batches of `batch_size`.  Batch `k` reads its
//! Gaussian vectors from `gaussian_sequence(rng, dimension, seed,
//! k · batch_size)`, so the variates behind every sample depend only on
//! the seed and the sample index.  Batches run on the rayon pool and their
//! statistics are merged in batch order, which makes results independent of
//! the number of threads.

use rayon::prelude::*;
use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::Real;
use ql_math::random_numbers::gaussian_sequence;
use ql_math::statistics::IncrementalStatistics;

use super::config::McConfig;

/// Result of a simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McOutcome {
    /// Sample mean.
    pub value: Real,
    /// Standard error of the mean; `None` for low-discrepancy sequences.
    pub error_estimate: Option<Real>,
    /// Samples used.
    pub samples: usize,
}

/// Estimate `E[f(Z)]` for a standard normal vector `Z` of `dimension`
/// components, per `config`.
///
/// With antithetic variates each sample is `(f(z) + f(−z)) / 2`.
pub fn simulate<F>(config: &McConfig, dimension: usize, sample: F) -> Result<McOutcome>
where
    F: Fn(&[Real]) -> Result<Real> + Sync,
{
    config.validate()?;
    let batch_size = config.batch_size;
    let stats = match (config.samples, config.tolerance) {
        (Some(samples), _) => {
            let batches = samples.div_ceil(batch_size);
            run_batches(config, dimension, 0, batches, samples, &sample)?
        }
        (None, Some(tolerance)) => run_with_tolerance(config, dimension, tolerance, &sample)?,
        (None, None) => ql_core::fail!("number of samples or tolerance must be given"),
    };
    let outcome = McOutcome {
        value: stats.mean()?,
        error_estimate: if config.rng.is_low_discrepancy() || stats.samples() < 2 {
            None
        } else {
            Some(stats.error_estimate()?)
        },
        samples: stats.samples(),
    };
    debug!(
        samples = outcome.samples,
        value = outcome.value,
        error_estimate = ?outcome.error_estimate,
        rng = ?config.rng,
        antithetic = config.antithetic,
        "monte carlo simulation finished"
    );
    Ok(outcome)
}

fn run_with_tolerance<F>(
    config: &McConfig,
    dimension: usize,
    tolerance: Real,
    sample: &F,
) -> Result<IncrementalStatistics>
where
    F: Fn(&[Real]) -> Result<Real> + Sync,
{
    let batch_size = config.batch_size;
    let max_samples = config.max_samples.unwrap_or(usize::MAX);
    let min_batches = McConfig::MIN_SAMPLES.div_ceil(batch_size);
    let mut next_batch = 0;
    let mut stats = IncrementalStatistics::new();
    let mut to_add = min_batches;
    loop {
        let added = to_add * batch_size;
        if stats.samples().saturating_add(added) > max_samples {
            return Err(Error::Convergence(format!(
                "max number of samples ({max_samples}) reached with error estimate {} above tolerance {tolerance}",
                if stats.samples() > 1 { stats.error_estimate()? } else { Real::INFINITY }
            )));
        }
        let round = run_batches(config, dimension, next_batch, to_add, added, sample)?;
        stats.merge(&round);
        next_batch += to_add;
        let error = stats.error_estimate()?;
        debug!(samples = stats.samples(), error, tolerance, "monte carlo round");
        if error <= tolerance {
            return Ok(stats);
        }
        let n = stats.samples() as Real;
        let order = (error * error) / (tolerance * tolerance);
        let wanted = (n * order * 0.8 - n).max(McConfig::MIN_SAMPLES as Real);
        to_add = ((wanted / batch_size as Real).ceil() as usize).max(1);
    }
}

/// Run batches `first .. first + count`, the last one truncated so that
/// exactly `samples` samples are drawn.
fn run_batches<F>(
    config: &McConfig,
    dimension: usize,
    first: usize,
    count: usize,
    samples: usize,
    sample: &F,
) -> Result<IncrementalStatistics>
where
    F: Fn(&[Real]) -> Result<Real> + Sync,
{
    let batch_size = config.batch_size;
    let results: Vec<Result<IncrementalStatistics>> = (0..count)
        .into_par_iter()
        .map(|k| {
            let size = batch_size.min(samples - k * batch_size);
            run_batch(config, dimension, first + k, size, sample)
        })
        .collect();
    let mut stats = IncrementalStatistics::new();
    for batch in results {
        stats.merge(&batch?);
    }
    Ok(stats)
}

fn run_batch<F>(config: &McConfig, dimension: usize, index: usize, size: usize, sample: &F) -> Result<IncrementalStatistics>
where
    F: Fn(&[Real]) -> Result<Real> + Sync,
{
    let first_path = (index * config.batch_size) as u64;
    let mut generator = gaussian_sequence(config.rng, dimension, config.seed, first_path)?;
    let mut stats = IncrementalStatistics::new();
    let mut mirror = vec![0.0; dimension];
    for _ in 0..size {
        let z = generator.next_sequence()?;
        let value = if config.antithetic {
            for (m, &x) in mirror.iter_mut().zip(z) {
                *m = -x;
            }
            let up = sample(z)?;
            0.5 * (up + sample(&mirror)?)
        } else {
            sample(z)?
        };
        stats.add(value);
    }
    Ok(stats)
}
