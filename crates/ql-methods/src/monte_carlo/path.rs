//! Paths of the underlying and their generators.

use std::fmt::Debug;

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};
use ql_math::random_numbers::BrownianBridge;
use ql_processes::{GeneralizedBlackScholesProcess, HestonProcess, HestonState};

use crate::time_grid::TimeGrid;

/// Values of the underlying on the nodes of a time grid, starting with the
/// value at time zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    values: Vec<Real>,
}

impl Path {
    /// Path through `values`.
    pub fn new(values: Vec<Real>) -> Self {
        Self { values }
    }

    /// Number of nodes, including time zero.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` for a path without nodes.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All values.
    pub fn values(&self) -> &[Real] {
        &self.values
    }

    /// Value at the last node.
    pub fn last(&self) -> Real {
        self.values.last().copied().unwrap_or(Real::NAN)
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Real;

    fn index(&self, i: usize) -> &Real {
        &self.values[i]
    }
}

/// Maps a vector of independent standard normals to a path.
pub trait PathGenerator: Debug + Send + Sync {
    /// Number of normals consumed per path.
    fn dimension(&self) -> usize;

    /// The time grid of the generated paths.
    fn time_grid(&self) -> &TimeGrid;

    /// Path driven by `normals`.
    fn generate(&self, normals: &[Real]) -> Result<Path>;
}

fn bridge_for(grid: &TimeGrid, enabled: bool) -> Result<Option<BrownianBridge>> {
    if enabled {
        Ok(Some(BrownianBridge::with_times(&grid.times()[1..])?))
    } else {
        Ok(None)
    }
}

fn check_dimension(expected: usize, normals: &[Real]) -> Result<()> {
    ensure!(
        normals.len() == expected,
        "path generator needs {expected} normals, got {}",
        normals.len()
    );
    Ok(())
}

// ─── Black-Scholes ────────────────────────────────────────────────────────────

/// Exact lognormal paths of a [`GeneralizedBlackScholesProcess`].
///
/// Per-step log drift and standard deviation are read once from the
/// process at construction.
#[derive(Debug, Clone)]
pub struct BlackScholesPathGenerator {
    grid: TimeGrid,
    x0: Real,
    steps: Vec<(Real, Real)>,
    bridge: Option<BrownianBridge>,
}

impl BlackScholesPathGenerator {
    /// Generator on `grid`, using the volatility at `strike`.
    pub fn new(
        process: &GeneralizedBlackScholesProcess,
        grid: TimeGrid,
        strike: Real,
        brownian_bridge: bool,
    ) -> Result<Self> {
        let steps = grid
            .times()
            .windows(2)
            .map(|w| process.log_evolution(w[0], w[1], strike))
            .collect::<Result<Vec<_>>>()?;
        let bridge = bridge_for(&grid, brownian_bridge)?;
        Ok(Self {
            x0: process.x0_value()?,
            grid,
            steps,
            bridge,
        })
    }
}

impl PathGenerator for BlackScholesPathGenerator {
    fn dimension(&self) -> usize {
        self.steps.len()
    }

    fn time_grid(&self) -> &TimeGrid {
        &self.grid
    }

    fn generate(&self, normals: &[Real]) -> Result<Path> {
        check_dimension(self.dimension(), normals)?;
        let mut bridged;
        let dw = match &self.bridge {
            Some(bridge) => {
                bridged = vec![0.0; normals.len()];
                bridge.transform(normals, &mut bridged)?;
                &bridged[..]
            }
            None => normals,
        };
        let mut values = Vec::with_capacity(self.steps.len() + 1);
        let mut log_spot = self.x0.ln();
        values.push(self.x0);
        for (&(mean, std), &z) in self.steps.iter().zip(dw) {
            log_spot += mean + std * z;
            values.push(log_spot.exp());
        }
        Ok(Path::new(values))
    }
}

// ─── Heston ───────────────────────────────────────────────────────────────────

/// Spot paths of a [`HestonProcess`] under its discretization.
///
/// The first `steps` normals drive the spot and the next `steps` the
/// variance; each block is bridged separately.
#[derive(Debug, Clone)]
pub struct HestonPathGenerator {
    process: HestonProcess,
    grid: TimeGrid,
    initial: HestonState,
    carries: Vec<Real>,
    bridge: Option<BrownianBridge>,
}

impl HestonPathGenerator {
    /// Generator on `grid`.
    pub fn new(process: HestonProcess, grid: TimeGrid, brownian_bridge: bool) -> Result<Self> {
        let carries = grid
            .times()
            .windows(2)
            .map(|w| process.carry(w[0], w[1]))
            .collect::<Result<Vec<_>>>()?;
        let initial = process.initial_state()?;
        let bridge = bridge_for(&grid, brownian_bridge)?;
        Ok(Self {
            process,
            grid,
            initial,
            carries,
            bridge,
        })
    }
}

impl PathGenerator for HestonPathGenerator {
    fn dimension(&self) -> usize {
        2 * self.carries.len()
    }

    fn time_grid(&self) -> &TimeGrid {
        &self.grid
    }

    fn generate(&self, normals: &[Real]) -> Result<Path> {
        check_dimension(self.dimension(), normals)?;
        let steps = self.carries.len();
        let mut dw = normals.to_vec();
        if let Some(bridge) = &self.bridge {
            let (spot, variance) = dw.split_at_mut(steps);
            bridge.transform(&normals[..steps], spot)?;
            bridge.transform(&normals[steps..], variance)?;
        }
        let mut state = self.initial;
        let mut values = Vec::with_capacity(steps + 1);
        values.push(state.log_spot.exp());
        for (i, &carry) in self.carries.iter().enumerate() {
            let dt: Time = self.grid.dt(i);
            state = self.process.evolve(state, dt, carry, [dw[i], dw[steps + i]]);
            values.push(state.log_spot.exp());
        }
        Ok(Path::new(values))
    }
}
