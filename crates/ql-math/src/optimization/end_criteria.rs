use ql_core::Real;
use serde::{Deserialize, Serialize};

/// Stopping rules shared by the optimizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndCriteria {
    /// Iteration cap.
    pub max_iterations: usize,
    /// Consecutive iterations without improvement tolerated before stopping.
    pub max_stationary_state_iterations: usize,
    /// Relative step size below which the point is stationary.
    pub root_epsilon: Real,
    /// Cost change (and cost level) below which the value is stationary.
    pub function_epsilon: Real,
    /// Gradient norm below which the point is stationary.
    pub gradient_norm_epsilon: Real,
}

impl EndCriteria {
    /// Criteria from the five thresholds.
    pub fn new(
        max_iterations: usize,
        max_stationary_state_iterations: usize,
        root_epsilon: Real,
        function_epsilon: Real,
        gradient_norm_epsilon: Real,
    ) -> Self {
        Self {
            max_iterations,
            max_stationary_state_iterations,
            root_epsilon,
            function_epsilon,
            gradient_norm_epsilon,
        }
    }

    /// Replace the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl Default for EndCriteria {
    fn default() -> Self {
        Self::new(1000, 100, 1e-8, 1e-8, 1e-8)
    }
}

/// Why an optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndCriteriaType {
    /// Iteration cap reached.
    MaxIterations,
    /// Steps became negligible.
    StationaryPoint,
    /// Cost stopped decreasing.
    StationaryFunctionValue,
    /// Cost fell below the function tolerance.
    StationaryFunctionAccuracy,
    /// Gradient vanished.
    ZeroGradientNorm,
}

impl EndCriteriaType {
    /// `true` for every outcome except hitting the iteration cap.
    pub fn succeeded(self) -> bool {
        !matches!(self, EndCriteriaType::MaxIterations)
    }
}
