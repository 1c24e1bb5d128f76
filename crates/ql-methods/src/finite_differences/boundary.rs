//! Dirichlet boundary conditions.

use serde::{Deserialize, Serialize};

use ql_core::Real;
use ql_math::Array;

use super::layout::FdmLinearOpLayout;

/// Edge of a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundarySide {
    /// First grid index.
    Lower,
    /// Last grid index.
    Upper,
}

/// Fixes the solution to `value` on one face of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct FdmDirichletBoundary {
    indices: Vec<usize>,
    value: Real,
}

impl FdmDirichletBoundary {
    /// Boundary on the `side` face of `direction`.
    pub fn new(layout: &FdmLinearOpLayout, direction: usize, side: BoundarySide, value: Real) -> Self {
        let edge = match side {
            BoundarySide::Lower => 0,
            BoundarySide::Upper => layout.dims()[direction] - 1,
        };
        let indices = (0..layout.size())
            .filter(|&i| layout.coordinate(i, direction) == edge)
            .collect();
        Self { indices, value }
    }

    /// Value imposed on the face.
    pub fn value(&self) -> Real {
        self.value
    }

    fn impose(&self, a: &mut Array) {
        for &i in &self.indices {
            a[i] = self.value;
        }
    }
}

/// The boundary conditions of a problem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FdmBoundaryConditionSet {
    conditions: Vec<FdmDirichletBoundary>,
}

impl FdmBoundaryConditionSet {
    /// No boundary conditions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition.
    pub fn push(&mut self, condition: FdmDirichletBoundary) {
        self.conditions.push(condition);
    }

    /// `true` if there are no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Impose the conditions after an explicit operator application.
    pub fn apply_after_applying(&self, a: &mut Array) {
        self.conditions.iter().for_each(|c| c.impose(a));
    }

    /// Impose the conditions after an implicit solve.
    pub fn apply_after_solving(&self, a: &mut Array) {
        self.conditions.iter().for_each(|c| c.impose(a));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faces_of_a_plane() {
        let layout = FdmLinearOpLayout::new(vec![3, 2]).unwrap();
        let mut set = FdmBoundaryConditionSet::new();
        set.push(FdmDirichletBoundary::new(&layout, 0, BoundarySide::Upper, 7.0));
        let mut a = Array::zeros(6);
        set.apply_after_solving(&mut a);
        assert_eq!(a.as_slice(), &[0.0, 0.0, 7.0, 0.0, 0.0, 7.0]);
    }
}
