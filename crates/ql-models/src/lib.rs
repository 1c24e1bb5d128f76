//! # ql-models
//!
//! Calibratable models: model parameters, the constant and piecewise
//! time-dependent Heston models, and least-squares calibration against
//! market instruments.
//!
//! ## Trait hierarchy
//!
//! ```text
//! CalibratedModel
//! └── HestonCharacteristic  → HestonModel, PiecewiseTimeDependentHestonModel
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Infrastructure ───────────────────────────────────────────────────────
pub mod calibrated_model;
pub mod calibration;

// ── Equity models ────────────────────────────────────────────────────────
pub mod heston_model;
pub mod piecewise_heston_model;

// ── Re-exports ───────────────────────────────────────────────────────────
pub use calibrated_model::{CalibratedModel, Parameter};
pub use calibration::{
    calibrate, calibrate_with, CalibrationErrorType, CalibrationHelper, CalibrationOptions, CalibrationReport,
};
pub use heston_model::{HestonCharacteristic, HestonModel};
pub use piecewise_heston_model::{PiecewiseHestonParameters, PiecewiseTimeDependentHestonModel};
