//! Finite-difference framework for pricing PDEs.
//!
//! A problem is assembled from
//!
//! * a mesh: one [`Fdm1dMesher`] per direction combined in an
//!   [`FdmMesherComposite`], whose [`FdmLinearOpLayout`] maps grid
//!   coordinates to flat indices;
//! * a spatial operator implementing [`FdmLinearOpComposite`], built from
//!   [`TripleBandLinearOp`] derivatives and a [`NinePointLinearOp`] for the
//!   mixed term;
//! * boundary conditions and [`StepCondition`]s;
//!
//! and rolled back from maturity by an [`FdmBackwardSolver`] using one of
//! the [`FdmSchemeDesc`] schemes.  [`Fdm1dSolution`] and [`Fdm2dSolution`]
//! read values and Greeks off the final grid.

pub mod black_scholes_op;
pub mod boundary;
pub mod heston_op;
pub mod layout;
pub mod meshers;
pub mod operators;
pub mod schemes;
pub mod solver;
pub mod step_conditions;

pub use black_scholes_op::FdmBlackScholesOp;
pub use boundary::{BoundarySide, FdmBoundaryConditionSet, FdmDirichletBoundary};
pub use heston_op::FdmHestonOp;
pub use layout::FdmLinearOpLayout;
pub use meshers::{
    Concentrating1dMesher, Concentration, Fdm1dMesher, FdmBlackScholesMesher, FdmBlackScholesMesherParams,
    FdmHestonVarianceMesher, FdmMesherComposite, Uniform1dMesher,
};
pub use operators::{
    FdmLinearOpComposite, FirstDerivativeOp, NinePointLinearOp, SecondDerivativeOp, TripleBandLinearOp,
};
pub use schemes::FdmSchemeDesc;
pub use solver::{FdConfig, Fdm1dSolution, Fdm2dSolution, FdmBackwardSolver};
pub use step_conditions::{
    AmericanStepCondition, BermudanStepCondition, CompositeStepCondition, DividendStepCondition, StepCondition,
};
