//! Brownian-bridge reordering of Gaussian variates.
//!
//! The first variate fixes the path's endpoint, the next ones fill
//! midpoints by bisection.  Fed with a low-discrepancy sequence this puts
//! the best-distributed coordinates on the path's coarse structure.

use ql_core::errors::Result;
use ql_core::{ensure, Real};

/// Bridge construction over a fixed time grid.
#[derive(Debug, Clone)]
pub struct BrownianBridge {
    sqrt_dt: Vec<Real>,
    bridge_index: Vec<usize>,
    left_index: Vec<usize>,
    right_index: Vec<usize>,
    left_weight: Vec<Real>,
    right_weight: Vec<Real>,
    std_dev: Vec<Real>,
}

impl BrownianBridge {
    /// Bridge over `steps` equal steps on `[0, 1]`.
    pub fn new(steps: usize) -> Result<Self> {
        ensure!(steps > 0, "a Brownian bridge needs at least one step");
        let times: Vec<Real> = (1..=steps).map(|i| i as Real / steps as Real).collect();
        Self::with_times(&times)
    }

    /// Bridge over the strictly increasing positive `times`; the path
    /// starts at zero at time zero.
    pub fn with_times(times: &[Real]) -> Result<Self> {
        let size = times.len();
        ensure!(size > 0, "a Brownian bridge needs at least one time");
        ensure!(times[0] > 0.0, "bridge times must be positive, got {}", times[0]);
        ensure!(
            times.windows(2).all(|w| w[1] > w[0]),
            "bridge times must be strictly increasing"
        );

        let sqrt_dt = (0..size)
            .map(|i| (times[i] - if i == 0 { 0.0 } else { times[i - 1] }).sqrt())
            .collect();

        let mut map = vec![0usize; size];
        let mut bridge_index = vec![0; size];
        let mut left_index = vec![0; size];
        let mut right_index = vec![0; size];
        let mut left_weight = vec![0.0; size];
        let mut right_weight = vec![0.0; size];
        let mut std_dev = vec![0.0; size];

        map[size - 1] = 1;
        bridge_index[0] = size - 1;
        std_dev[0] = times[size - 1].sqrt();

        let mut j = 0;
        for i in 1..size {
            // next unpopulated gap [j, k)
            while map[j] != 0 {
                j += 1;
            }
            let mut k = j;
            while map[k] == 0 {
                k += 1;
            }
            let l = j + ((k - 1 - j) >> 1);
            map[l] = i;
            bridge_index[i] = l;
            left_index[i] = j;
            right_index[i] = k;
            let t_left = if j == 0 { 0.0 } else { times[j - 1] };
            let span = times[k] - t_left;
            left_weight[i] = (times[k] - times[l]) / span;
            right_weight[i] = (times[l] - t_left) / span;
            std_dev[i] = ((times[l] - t_left) * (times[k] - times[l]) / span).sqrt();
            j = k + 1;
            if j >= size {
                j = 0;
            }
        }

        Ok(Self {
            sqrt_dt,
            bridge_index,
            left_index,
            right_index,
            left_weight,
            right_weight,
            std_dev,
        })
    }

    /// Number of steps.
    pub fn size(&self) -> usize {
        self.sqrt_dt.len()
    }

    /// Map independent standard normals to the normalized increments
    /// `(W(tᵢ) − W(tᵢ₋₁)) / √Δtᵢ` of the bridged path, which are again
    /// independent standard normals.
    pub fn transform(&self, input: &[Real], output: &mut [Real]) -> Result<()> {
        let size = self.size();
        ensure!(
            input.len() == size && output.len() == size,
            "bridge of size {size} given {} inputs and {} outputs",
            input.len(),
            output.len()
        );
        output[size - 1] = self.std_dev[0] * input[0];
        for i in 1..size {
            let (j, k, l) = (self.left_index[i], self.right_index[i], self.bridge_index[i]);
            let left = if j == 0 { 0.0 } else { self.left_weight[i] * output[j - 1] };
            output[l] = left + self.right_weight[i] * output[k] + self.std_dev[i] * input[i];
        }
        for i in (1..size).rev() {
            output[i] = (output[i] - output[i - 1]) / self.sqrt_dt[i];
        }
        output[0] /= self.sqrt_dt[0];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn single_step_is_the_identity() {
        let bridge = BrownianBridge::with_times(&[2.0]).unwrap();
        let mut out = [0.0];
        bridge.transform(&[1.3], &mut out).unwrap();
        assert_abs_diff_eq!(out[0], 1.3, epsilon = 1e-15);
    }

    #[test]
    fn first_variate_drives_the_endpoint() {
        let bridge = BrownianBridge::new(8).unwrap();
        let mut input = [0.0; 8];
        input[0] = 1.0;
        let mut out = [0.0; 8];
        bridge.transform(&input, &mut out).unwrap();
        // a straight line to W(1) = 1 has equal increments
        let dt_sqrt = (1.0 / 8.0_f64).sqrt();
        for x in out {
            assert_abs_diff_eq!(x, dt_sqrt, epsilon = 1e-14);
        }
    }

    #[test]
    fn transform_is_orthogonal_on_uneven_grid() {
        let times = [0.1, 0.25, 0.7, 0.8, 1.5, 2.0, 3.1];
        let bridge = BrownianBridge::with_times(&times).unwrap();
        let n = times.len();
        let columns: Vec<Vec<Real>> = (0..n)
            .map(|c| {
                let mut e = vec![0.0; n];
                e[c] = 1.0;
                let mut out = vec![0.0; n];
                bridge.transform(&e, &mut out).unwrap();
                out
            })
            .collect();
        for a in 0..n {
            for b in 0..n {
                let dot: Real = columns.iter().map(|col| col[a] * col[b]).sum();
                assert_abs_diff_eq!(dot, if a == b { 1.0 } else { 0.0 }, epsilon = 1e-13);
            }
        }
    }

    #[test]
    fn rejects_bad_grids() {
        assert!(BrownianBridge::with_times(&[0.0, 1.0]).is_err());
        assert!(BrownianBridge::with_times(&[1.0, 1.0]).is_err());
        assert!(BrownianBridge::new(0).is_err());
    }
}
