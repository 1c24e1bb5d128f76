//! Sobol' low-discrepancy sequences.
//!
//! Dimension 1 is the van der Corput sequence.  Further dimensions use
//! primitive polynomials over GF(2) in order of increasing degree; the
//! first fifty carry tabulated initial direction numbers (Joe-Kuo for the
//! leading twenty), the rest use unit initialization.  Points are produced
//! in Gray-code order and the all-zero point is skipped, so the first point
//! is `0.5` in every dimension.

use ql_core::errors::{Error, Result};
use ql_core::{ensure, Real};

/// Largest supported dimension.
pub const MAX_DIMENSION: usize = 1111;

const BITS: usize = 32;
const NORMALIZATION: Real = 4_294_967_296.0; // 2^32

/// Initial direction numbers `m_1..m_s` for dimensions 2 to 51.
const INITIAL_DIRECTION_NUMBERS: &[&[u32]] = &[
    &[1],
    &[1, 3],
    &[1, 3, 1],
    &[1, 1, 1],
    &[1, 1, 3, 3],
    &[1, 3, 5, 13],
    &[1, 1, 5, 5, 17],
    &[1, 1, 5, 5, 5],
    &[1, 1, 7, 11, 19],
    &[1, 1, 5, 1, 1],
    &[1, 1, 1, 3, 11],
    &[1, 3, 5, 5, 31],
    &[1, 3, 3, 9, 7, 49],
    &[1, 1, 1, 15, 21, 21],
    &[1, 3, 1, 13, 27, 49],
    &[1, 1, 1, 15, 7, 5],
    &[1, 3, 1, 15, 13, 25],
    &[1, 1, 5, 5, 19, 61],
    &[1, 3, 7, 11, 23, 15, 103],
    &[1, 3, 7, 13, 13, 15, 69],
    &[1, 3, 3, 9, 31, 47, 3],
    &[1, 1, 5, 7, 11, 15, 93],
    &[1, 3, 7, 11, 17, 63, 111],
    &[1, 1, 3, 3, 19, 37, 53],
    &[1, 3, 1, 5, 5, 55, 99],
    &[1, 1, 7, 15, 29, 7, 73],
    &[1, 3, 5, 3, 29, 23, 83],
    &[1, 1, 1, 9, 15, 39, 13],
    &[1, 3, 3, 5, 9, 45, 117],
    &[1, 1, 5, 13, 7, 25, 91],
    &[1, 3, 7, 1, 19, 51, 97],
    &[1, 1, 3, 11, 5, 41, 109],
    &[1, 3, 1, 7, 27, 11, 63],
    &[1, 1, 7, 3, 21, 33, 75],
    &[1, 3, 5, 15, 31, 5, 49],
    &[1, 1, 1, 1, 23, 57, 15],
    &[1, 3, 3, 13, 3, 19, 111, 235],
    &[1, 1, 5, 1, 13, 41, 49, 237],
    &[1, 3, 7, 7, 17, 27, 91, 157],
    &[1, 1, 3, 9, 1, 53, 55, 69],
    &[1, 3, 1, 3, 19, 21, 77, 193],
    &[1, 1, 7, 11, 31, 17, 113, 43],
    &[1, 3, 5, 5, 5, 63, 19, 213],
    &[1, 1, 1, 7, 21, 45, 5, 251],
    &[1, 3, 3, 3, 27, 29, 97, 7],
    &[1, 1, 5, 15, 7, 7, 43, 195],
    &[1, 3, 7, 9, 29, 35, 79, 35],
    &[1, 1, 3, 5, 15, 59, 23, 59],
    &[1, 3, 1, 11, 1, 25, 121, 85],
    &[1, 1, 7, 1, 19, 3, 103, 101],
];

/// Sobol' sequence generator in `[0, 1)^d`.
#[derive(Debug, Clone)]
pub struct SobolRsg {
    direction_numbers: Vec<[u32; BITS]>,
    integers: Vec<u32>,
    point: Vec<Real>,
    sequence_count: u64,
}

impl SobolRsg {
    /// Generator of the given dimension, skipping the first `skip` points.
    pub fn new(dimension: usize, skip: u64) -> Result<Self> {
        ensure!(
            (1..=MAX_DIMENSION).contains(&dimension),
            "Sobol dimension must lie in [1, {MAX_DIMENSION}], got {dimension}"
        );
        let polynomials = primitive_polynomials(dimension - 1);
        let mut direction_numbers = Vec::with_capacity(dimension);
        direction_numbers.push(std::array::from_fn(|k| 1u32 << (BITS - 1 - k)));
        for (d, &(degree, coefficients)) in polynomials.iter().enumerate() {
            let unit = [1u32; BITS];
            let initial = INITIAL_DIRECTION_NUMBERS.get(d).copied().unwrap_or(&unit[..degree]);
            direction_numbers.push(direction_numbers_for(degree, coefficients, initial));
        }
        let mut rsg = Self {
            direction_numbers,
            integers: vec![0; dimension],
            point: vec![0.0; dimension],
            sequence_count: 0,
        };
        rsg.skip_to(skip)?;
        Ok(rsg)
    }

    /// Dimension of the generated points.
    pub fn dimension(&self) -> usize {
        self.integers.len()
    }

    /// Points generated so far, including skipped ones.
    pub fn sequence_count(&self) -> u64 {
        self.sequence_count
    }

    /// Position the generator so that the next point is number `n + 1`
    /// (one-based, the zero point excluded).
    pub fn skip_to(&mut self, n: u64) -> Result<()> {
        ensure!(n < (1u64 << BITS) - 1, "Sobol sequence exhausted at {n} points");
        let gray = n ^ (n >> 1);
        for (integer, directions) in self.integers.iter_mut().zip(&self.direction_numbers) {
            *integer = (0..BITS)
                .filter(|&k| gray >> k & 1 == 1)
                .fold(0, |acc, k| acc ^ directions[k]);
        }
        self.sequence_count = n;
        Ok(())
    }

    /// The next point.
    pub fn next_sequence(&mut self) -> Result<&[Real]> {
        let n = self.sequence_count;
        // the Gray code of n+1 differs from that of n in the lowest zero bit of n
        let bit = n.trailing_ones() as usize;
        if bit >= BITS {
            return Err(Error::Domain(format!("Sobol sequence exhausted at {n} points")));
        }
        for ((integer, directions), x) in self
            .integers
            .iter_mut()
            .zip(&self.direction_numbers)
            .zip(self.point.iter_mut())
        {
            *integer ^= directions[bit];
            *x = *integer as Real / NORMALIZATION;
        }
        self.sequence_count += 1;
        Ok(&self.point)
    }
}

/// Direction numbers `v_k = m_k · 2^{32-k}` extended by the Sobol' recurrence.
fn direction_numbers_for(degree: usize, coefficients: u32, initial: &[u32]) -> [u32; BITS] {
    let mut v = [0u32; BITS];
    for (k, &m) in initial.iter().enumerate().take(BITS) {
        v[k] = m << (BITS - 1 - k);
    }
    for k in degree..BITS {
        v[k] = v[k - degree] ^ (v[k - degree] >> degree);
        for j in 1..degree {
            if coefficients >> (degree - 1 - j) & 1 == 1 {
                v[k] ^= v[k - j];
            }
        }
    }
    v
}

/// The first `count` primitive polynomials over GF(2), ordered by degree and
/// then by coefficients.  Each is `(degree, a)` where the bits of `a` are the
/// interior coefficients, most significant first.
fn primitive_polynomials(count: usize) -> Vec<(usize, u32)> {
    let mut found = Vec::with_capacity(count);
    let mut degree = 1;
    while found.len() < count {
        for a in 0..(1u32 << (degree - 1)) {
            if found.len() == count {
                break;
            }
            if is_primitive(degree, a) {
                found.push((degree, a));
            }
        }
        degree += 1;
    }
    found
}

/// `x` generates the multiplicative group modulo the polynomial, i.e. its
/// order is exactly `2^degree - 1`.
fn is_primitive(degree: usize, a: u32) -> bool {
    let modulus = (1u64 << degree) | (u64::from(a) << 1) | 1;
    let period = (1u64 << degree) - 1;
    let mut state = 1u64;
    for k in 1..=period {
        state <<= 1;
        if state >> degree & 1 == 1 {
            state ^= modulus;
        }
        if state == 1 {
            return k == period;
        }
    }
    false
}
