//! # ql-methods
//!
//! Numerical methods shared by the pricing engines: time grids, recombining
//! trees, the finite-difference framework and the Monte Carlo driver.
//!
//! # Modules
//!
//! * [`time_grid`]: grids through mandatory times
//! * [`lattice`]: binomial/trinomial trees and backward induction
//! * [`finite_differences`]: meshers, operators, schemes, step conditions
//!   and backward rollback
//! * [`monte_carlo`]: path generators and the batched parallel simulator

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Finite-difference meshes, operators and schemes.
pub mod finite_differences;

/// Recombining trees and backward induction.
pub mod lattice;

/// Path generation and Monte Carlo simulation.
pub mod monte_carlo;

/// Time grids.
pub mod time_grid;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use finite_differences::{FdConfig, FdmBackwardSolver, FdmSchemeDesc};
pub use lattice::{backward_induction, BinomialTree, LogNormalDynamics, RecombiningTree, TreeKind, TrinomialTree};
pub use monte_carlo::{simulate, simulate_paths, McConfig, McOutcome, Path, PathGenerator, PathPricer};
pub use time_grid::TimeGrid;
