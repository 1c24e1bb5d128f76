//! Uniform and Gaussian random sequences.
//!
//! Pseudo-random numbers come from a 64-bit Mersenne twister (`rand_mt`).
//! Gaussian sequences are produced either by inverting the normal CDF on
//! uniform points, which keeps low-discrepancy structure, or by the
//! ziggurat sampler of `rand_distr`.  [`gaussian_sequence`] builds the
//! generator for a path stream so that each stream is reproducible on its
//! own, whatever thread runs it.

pub mod brownian_bridge;
pub mod sobol;

use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use rand_mt::Mt19937GenRand64;
use serde::{Deserialize, Serialize};

use ql_core::errors::Result;
use ql_core::Real;

use crate::distributions::normal_cdf_inverse;

pub use brownian_bridge::BrownianBridge;
pub use sobol::SobolRsg;

/// Uniform deviates in the open interval `(0, 1)`.
#[derive(Clone)]
pub struct MersenneTwisterUniformRng {
    rng: Mt19937GenRand64,
}

impl std::fmt::Debug for MersenneTwisterUniformRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MersenneTwisterUniformRng").finish_non_exhaustive()
    }
}

impl MersenneTwisterUniformRng {
    /// Generator with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mt19937GenRand64::new(seed),
        }
    }

    /// Next deviate; 53 random bits centred in their cell, so never 0 or 1.
    pub fn next_real(&mut self) -> Real {
        ((self.rng.next_u64() >> 11) as Real + 0.5) / (1u64 << 53) as Real
    }
}

impl RngCore for MersenneTwisterUniformRng {
    fn next_u32(&mut self) -> u32 {
        (self.rng.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.rng.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Seed for stream `stream` of a simulation seeded with `seed`.
///
/// SplitMix64 finalization decorrelates neighbouring streams.
pub fn stream_seed(seed: u64, stream: u64) -> u64 {
    splitmix64(seed ^ splitmix64(stream.wrapping_add(1)))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Source of the Gaussian variates driving a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RngKind {
    /// Mersenne twister, inverse cumulative normal.
    #[default]
    PseudoRandom,
    /// Mersenne twister, ziggurat normal sampler.
    Ziggurat,
    /// Sobol' points, inverse cumulative normal.
    LowDiscrepancy,
}

impl RngKind {
    /// `true` for quasi-random sequences, whose error is not statistical.
    pub fn is_low_discrepancy(self) -> bool {
        matches!(self, RngKind::LowDiscrepancy)
    }
}

/// A generator of vectors of independent standard normals.
pub trait GaussianSequenceGenerator: Send {
    /// Length of each vector.
    fn dimension(&self) -> usize;

    /// The next vector.
    fn next_sequence(&mut self) -> Result<&[Real]>;
}

/// Pseudo-random Gaussian vectors.
#[derive(Debug, Clone)]
pub struct PseudoRandomGaussianRsg {
    rng: MersenneTwisterUniformRng,
    ziggurat: bool,
    buffer: Vec<Real>,
}

impl PseudoRandomGaussianRsg {
    /// Vectors of `dimension` normals by inversion of the CDF.
    pub fn new(dimension: usize, seed: u64) -> Self {
        Self {
            rng: MersenneTwisterUniformRng::new(seed),
            ziggurat: false,
            buffer: vec![0.0; dimension],
        }
    }

    /// Vectors of `dimension` normals from the ziggurat sampler.
    pub fn ziggurat(dimension: usize, seed: u64) -> Self {
        Self {
            ziggurat: true,
            ..Self::new(dimension, seed)
        }
    }
}

impl GaussianSequenceGenerator for PseudoRandomGaussianRsg {
    fn dimension(&self) -> usize {
        self.buffer.len()
    }

    fn next_sequence(&mut self) -> Result<&[Real]> {
        for x in self.buffer.iter_mut() {
            *x = if self.ziggurat {
                StandardNormal.sample(&mut self.rng)
            } else {
                normal_cdf_inverse(self.rng.next_real())
            };
        }
        Ok(&self.buffer)
    }
}

/// Sobol' points mapped through the inverse normal CDF.
#[derive(Debug, Clone)]
pub struct SobolGaussianRsg {
    sobol: SobolRsg,
    buffer: Vec<Real>,
}

impl SobolGaussianRsg {
    /// Sequence starting after `skip` points.
    pub fn new(dimension: usize, skip: u64) -> Result<Self> {
        Ok(Self {
            sobol: SobolRsg::new(dimension, skip)?,
            buffer: vec![0.0; dimension],
        })
    }
}

impl GaussianSequenceGenerator for SobolGaussianRsg {
    fn dimension(&self) -> usize {
        self.buffer.len()
    }

    fn next_sequence(&mut self) -> Result<&[Real]> {
        let point = self.sobol.next_sequence()?;
        for (x, &u) in self.buffer.iter_mut().zip(point) {
            *x = normal_cdf_inverse(u);
        }
        Ok(&self.buffer)
    }
}

/// Generator for the paths starting at index `first_path` of a simulation.
///
/// Pseudo-random streams are seeded from `(seed, first_path)`; Sobol'
/// streams skip ahead to `first_path`.  The seed is ignored for Sobol'.
pub fn gaussian_sequence(
    kind: RngKind,
    dimension: usize,
    seed: u64,
    first_path: u64,
) -> Result<Box<dyn GaussianSequenceGenerator>> {
    Ok(match kind {
        RngKind::PseudoRandom => Box::new(PseudoRandomGaussianRsg::new(
            dimension,
            stream_seed(seed, first_path),
        )),
        RngKind::Ziggurat => Box::new(PseudoRandomGaussianRsg::ziggurat(
            dimension,
            stream_seed(seed, first_path),
        )),
        RngKind::LowDiscrepancy => Box::new(SobolGaussianRsg::new(dimension, first_path)?),
    })
}
