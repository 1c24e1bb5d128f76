//! Error types shared by every crate in the workspace.
//!
//! A single `thiserror`-derived enum covers precondition failures, stale
//! market data, unsupported engine configurations and numerical
//! non-convergence.  The `ensure!`, `ensure_post!` and `fail!` macros are
//! the usual way to produce the first three kinds.

use thiserror::Error;

/// The top-level error type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// General runtime error.
    #[error("{0}")]
    Runtime(String),

    /// Precondition violated.
    #[error("precondition not satisfied: {0}")]
    Precondition(String),

    /// Postcondition violated.
    #[error("postcondition not satisfied: {0}")]
    Postcondition(String),

    /// Date-related error.
    #[error("date error: {0}")]
    Date(String),

    /// Index out of range.
    #[error("index ({index}) out of range [0, {size})")]
    IndexOutOfRange {
        /// The index that was out of range.
        index: usize,
        /// The size of the container.
        size: usize,
    },

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Not implemented.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// A market input is empty or does not cover the requested date range.
    #[error("stale market data: {0}")]
    StaleMarketData(String),

    /// The payoff/exercise/process combination is not supported by the engine.
    #[error("unsupported configuration: {0}")]
    Domain(String),

    /// An iterative or sampling method ran out of its evaluation budget.
    #[error("convergence failure: {0}")]
    Convergence(String),

    /// An iterative linear solver did not reach the requested tolerance.
    #[error("no convergence after {iterations} iterations (relative residual {residual:e})")]
    NonConvergence {
        /// Iterations performed.
        iterations: usize,
        /// Relative residual reached.
        residual: f64,
    },

    /// Historical data (e.g. a past fixing) is required but not available.
    #[error("missing data: {0}")]
    MissingData(String),

    /// The pricing engine did not provide the requested result.
    #[error("{0} not provided")]
    MissingResult(String),
}

impl Error {
    /// `true` for the budget-exhaustion errors raised by iterative methods.
    pub fn is_convergence_failure(&self) -> bool {
        matches!(self, Error::Convergence(_) | Error::NonConvergence { .. })
    }
}

/// Shorthand `Result` type used throughout the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Return `Err(Error::Precondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use ql_core::{ensure, errors::Error};
/// fn positive(x: f64) -> ql_core::errors::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(positive(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Precondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Return `Err(Error::Postcondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use ql_core::{ensure_post, errors::Error};
/// fn compute(x: f64) -> ql_core::errors::Result<f64> {
///     let result = x * 2.0;
///     ensure_post!(result > 0.0, "result must be positive, got {result}");
///     Ok(result)
/// }
/// assert!(compute(1.0).is_ok());
/// assert!(compute(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure_post {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Postcondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Return `Err(Error::Runtime(...))` immediately.
///
/// # Example
/// ```
/// use ql_core::{fail, errors::Error};
/// fn always_err() -> ql_core::errors::Result<()> {
///     fail!("something went wrong");
/// }
/// assert!(always_err().is_err());
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::Runtime(format!($($msg)*)))
    };
}
