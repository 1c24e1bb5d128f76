//! The normal distribution.
//!
//! The cumulative function is computed from the fdlibm complementary error
//! function in `libm`, which keeps full double precision in both tails.  The
//! inverse starts from Acklam's rational approximation and applies one Halley
//! step.  The bivariate cdf is Genz's refinement of Drezner-Wesolowsky.

use libm::erfc;
use ql_core::Real;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

const INV_SQRT_2PI: Real = 0.398_942_280_401_432_7;

/// Standard normal density.
#[inline]
pub fn normal_pdf(x: Real) -> Real {
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal cumulative distribution Φ(x).
#[inline]
pub fn normal_cdf(x: Real) -> Real {
    0.5 * erfc(-x * FRAC_1_SQRT_2)
}

/// Inverse of Φ.  Returns `-∞`/`+∞` at `p = 0`/`p = 1` and NaN outside
/// `[0, 1]`.
pub fn normal_cdf_inverse(p: Real) -> Real {
    if !(0.0..=1.0).contains(&p) {
        return Real::NAN;
    }
    if p == 0.0 {
        return Real::NEG_INFINITY;
    }
    if p == 1.0 {
        return Real::INFINITY;
    }
    let x = acklam(p);
    // Halley refinement against the accurate cdf.
    let e = normal_cdf(x) - p;
    let u = e * (2.0 * PI).sqrt() * (0.5 * x * x).exp();
    x - u / (1.0 + 0.5 * x * u)
}

fn acklam(p: Real) -> Real {
    const A: [Real; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [Real; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [Real; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [Real; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: Real = 0.02425;

    let tail = |q: Real| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };
    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p > 1.0 - P_LOW {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    }
}

/// Gauss-Legendre abscissae on `[-1, 0)` and weights for 6, 12 and 20
/// points.
const GL_X: [&[Real]; 3] = [
    &[-0.932_469_514_203_152_2, -0.661_209_386_466_264_7, -0.238_619_186_083_197_0],
    &[
        -0.981_560_634_246_719_1,
        -0.904_117_256_370_475_0,
        -0.769_902_674_194_305_0,
        -0.587_317_954_286_617_1,
        -0.367_831_498_998_180_2,
        -0.125_233_408_511_469_2,
    ],
    &[
        -0.993_128_599_185_094_9,
        -0.963_971_927_277_913_8,
        -0.912_234_428_251_325_9,
        -0.839_116_971_822_218_8,
        -0.746_331_906_460_150_8,
        -0.636_053_680_726_515_0,
        -0.510_867_001_950_827_1,
        -0.373_706_088_715_419_6,
        -0.227_785_851_141_645_1,
        -0.076_526_521_133_497_33,
    ],
];
const GL_W: [&[Real]; 3] = [
    &[0.171_324_492_379_170_5, 0.360_761_573_048_138_4, 0.467_913_934_572_690_4],
    &[
        0.047_175_336_386_511_77,
        0.106_939_325_995_318_3,
        0.160_078_328_543_346_4,
        0.203_167_426_723_065_9,
        0.233_492_536_538_354_7,
        0.249_147_045_813_402_9,
    ],
    &[
        0.017_614_007_139_152_12,
        0.040_601_429_800_386_94,
        0.062_672_048_334_109_06,
        0.083_276_741_576_704_75,
        0.101_930_119_817_240_4,
        0.118_194_531_961_518_4,
        0.131_688_638_449_176_6,
        0.142_096_109_318_382_1,
        0.149_172_986_472_603_7,
        0.152_753_387_130_725_9,
    ],
];

/// `P(X ≤ x, Y ≤ y)` for standard normals with correlation `rho`.
///
/// Accurate to about 1e-15.  NaN when `|rho| > 1`.
pub fn bivariate_normal_cdf(x: Real, y: Real, rho: Real) -> Real {
    if !(-1.0..=1.0).contains(&rho) {
        return Real::NAN;
    }
    const TWO_PI: Real = 2.0 * PI;
    // upper orthant P(X > h, Y > k) at h = -x, k = -y
    let h = -x;
    let mut k = -y;
    let mut hk = h * k;
    let rule = if rho.abs() < 0.3 {
        0
    } else if rho.abs() < 0.75 {
        1
    } else {
        2
    };
    let nodes = GL_X[rule].iter().zip(GL_W[rule]);

    if rho.abs() < 0.925 {
        let mut bvn = 0.0;
        if rho != 0.0 {
            let hs = 0.5 * (h * h + k * k);
            let asr = rho.asin();
            for (&xi, &wi) in nodes {
                for side in [-1.0, 1.0] {
                    let sn = (0.5 * asr * (side * xi + 1.0)).sin();
                    bvn += wi * ((sn * hk - hs) / (1.0 - sn * sn)).exp();
                }
            }
            bvn *= asr / (2.0 * TWO_PI);
        }
        return bvn + normal_cdf(-h) * normal_cdf(-k);
    }

    if rho < 0.0 {
        k = -k;
        hk = -hk;
    }
    let mut bvn = 0.0;
    if rho.abs() < 1.0 {
        let a_s = (1.0 - rho) * (1.0 + rho);
        let mut a = a_s.sqrt();
        let bs = (h - k) * (h - k);
        let c = (4.0 - hk) / 8.0;
        let d = (12.0 - hk) / 16.0;
        bvn = a
            * (-0.5 * (bs / a_s + hk)).exp()
            * (1.0 - c * (bs - a_s) * (1.0 - d * bs / 5.0) / 3.0 + c * d * a_s * a_s / 5.0);
        if hk > -160.0 {
            let b = bs.sqrt();
            bvn -= (-0.5 * hk).exp()
                * TWO_PI.sqrt()
                * normal_cdf(-b / a)
                * b
                * (1.0 - c * bs * (1.0 - d * bs / 5.0) / 3.0);
        }
        a *= 0.5;
        for (&xi, &wi) in nodes {
            for side in [-1.0, 1.0] {
                let xs = (a * (side * xi + 1.0)).powi(2);
                let rs = (1.0 - xs).sqrt();
                bvn += a
                    * wi
                    * ((-bs / (2.0 * xs) - hk / (1.0 + rs)).exp() / rs
                        - (-0.5 * (bs / xs + hk)).exp() * (1.0 + c * xs * (1.0 + d * xs)));
            }
        }
        bvn = -bvn / TWO_PI;
    }
    if rho > 0.0 {
        bvn + normal_cdf(-h.max(k))
    } else {
        let mut bvn = -bvn;
        if k > h {
            bvn += normal_cdf(k) - normal_cdf(h);
        }
        bvn.max(0.0)
    }
}

/// A normal distribution with given mean and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalDistribution {
    /// Mean.
    pub mean: Real,
    /// Standard deviation.
    pub sigma: Real,
}

impl NormalDistribution {
    /// The standard normal distribution.
    pub const STANDARD: NormalDistribution = NormalDistribution {
        mean: 0.0,
        sigma: 1.0,
    };

    /// Density at `x`.
    pub fn pdf(&self, x: Real) -> Real {
        normal_pdf((x - self.mean) / self.sigma) / self.sigma
    }

    /// Cumulative probability at `x`.
    pub fn cdf(&self, x: Real) -> Real {
        normal_cdf((x - self.mean) / self.sigma)
    }

    /// Quantile at probability `p`.
    pub fn inverse_cdf(&self, p: Real) -> Real {
        self.mean + self.sigma * normal_cdf_inverse(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reference_values() {
        assert_eq!(normal_cdf(0.0), 0.5);
        assert_abs_diff_eq!(normal_cdf(1.0), 0.841_344_746_068_542_9, epsilon = 1e-15);
        assert_abs_diff_eq!(2.0 * normal_cdf(1.0) - 1.0, 0.682_689_492_137_085_9, epsilon = 1e-15);
        assert_abs_diff_eq!(normal_cdf(-3.0), 1.349_898_031_630_094_6e-3, epsilon = 1e-17);
        assert_abs_diff_eq!(normal_pdf(0.0), INV_SQRT_2PI);
    }

    #[test]
    fn inverse_matches_cdf() {
        for &p in &[1e-12, 1e-6, 0.01, 0.2, 0.5, 0.75, 0.99, 1.0 - 1e-9] {
            let x = normal_cdf_inverse(p);
            assert_abs_diff_eq!(normal_cdf(x), p, epsilon = 1e-14 * p.max(1e-3));
        }
        assert_eq!(normal_cdf_inverse(0.0), Real::NEG_INFINITY);
        assert!(normal_cdf_inverse(1.5).is_nan());
    }

    #[test]
    fn density_is_derivative_of_cdf() {
        let h = 1e-5;
        for &x in &[-2.0, -0.3, 0.0, 1.7] {
            let fd = (normal_cdf(x + h) - normal_cdf(x - h)) / (2.0 * h);
            assert_abs_diff_eq!(fd, normal_pdf(x), epsilon = 1e-9);
        }
    }

    #[test]
    fn shifted_distribution() {
        let n = NormalDistribution { mean: 1.0, sigma: 2.0 };
        assert_abs_diff_eq!(n.cdf(1.0), 0.5);
        assert_abs_diff_eq!(n.inverse_cdf(n.cdf(2.3)), 2.3, epsilon = 1e-12);
    }

    #[test]
    fn bivariate_independent_is_the_product() {
        for &(x, y) in &[(0.0, 0.0), (-1.3, 0.4), (2.1, -0.7), (0.5, 1.5)] {
            assert_abs_diff_eq!(
                bivariate_normal_cdf(x, y, 0.0),
                normal_cdf(x) * normal_cdf(y),
                epsilon = 1e-15
            );
        }
    }

    #[test]
    fn bivariate_at_the_origin() {
        // P(X ≤ 0, Y ≤ 0) = 1/4 + asin(ρ)/2π
        for &rho in &[-0.99, -0.95, -0.8, -0.5, -0.1, 0.2, 0.6, 0.9, 0.93, 0.999] {
            let expected = 0.25 + Real::asin(rho) / (2.0 * PI);
            assert_abs_diff_eq!(bivariate_normal_cdf(0.0, 0.0, rho), expected, epsilon = 1e-14);
        }
    }

    #[test]
    fn bivariate_perfect_correlation() {
        for &(x, y) in &[(0.3, -0.4), (-1.0, 1.2), (0.8, 0.8), (-2.0, -1.5)] {
            assert_abs_diff_eq!(
                bivariate_normal_cdf(x, y, 1.0),
                normal_cdf(x.min(y)),
                epsilon = 1e-15
            );
            assert_abs_diff_eq!(
                bivariate_normal_cdf(x, y, -1.0),
                (normal_cdf(x) + normal_cdf(y) - 1.0).max(0.0),
                epsilon = 1e-15
            );
        }
        assert!(bivariate_normal_cdf(0.0, 0.0, 1.5).is_nan());
    }

    #[test]
    fn bivariate_is_symmetric_and_continuous_in_rho() {
        for &rho in &[-0.7, 0.4, 0.92, 0.95] {
            assert_abs_diff_eq!(
                bivariate_normal_cdf(0.7, -0.2, rho),
                bivariate_normal_cdf(-0.2, 0.7, rho),
                epsilon = 1e-15
            );
        }
        // across the switch between the two expansions
        let below = bivariate_normal_cdf(0.4, 1.1, 0.925 - 1e-9);
        let above = bivariate_normal_cdf(0.4, 1.1, 0.925);
        assert_abs_diff_eq!(below, above, epsilon = 1e-9);
    }
}
