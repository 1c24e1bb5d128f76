//! Index layout of a tensor-product grid.

use ql_core::errors::Result;
use ql_core::ensure;

/// Maps multi-dimensional grid coordinates to a flat index.
///
/// Direction 0 varies fastest: `index = Σ coordinate[d] · spacing[d]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdmLinearOpLayout {
    dims: Vec<usize>,
    spacing: Vec<usize>,
    size: usize,
}

impl FdmLinearOpLayout {
    /// Layout for a grid with `dims[d]` points along direction `d`.
    pub fn new(dims: Vec<usize>) -> Result<Self> {
        ensure!(!dims.is_empty(), "layout needs at least one direction");
        ensure!(dims.iter().all(|&n| n > 0), "empty direction in layout {dims:?}");
        let mut spacing = Vec::with_capacity(dims.len());
        let mut size = 1;
        for &n in &dims {
            spacing.push(size);
            size *= n;
        }
        Ok(Self { dims, spacing, size })
    }

    /// Points per direction.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Stride of each direction in the flat index.
    pub fn spacing(&self) -> &[usize] {
        &self.spacing
    }

    /// Total number of grid points.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Coordinate along `direction` of the point at flat `index`.
    pub fn coordinate(&self, index: usize, direction: usize) -> usize {
        (index / self.spacing[direction]) % self.dims[direction]
    }

    /// Flat index of the given coordinates.
    pub fn index(&self, coordinates: &[usize]) -> usize {
        coordinates
            .iter()
            .zip(&self.spacing)
            .map(|(c, s)| c * s)
            .sum()
    }

    /// Flat index of the neighbour `offset` steps away along `direction`.
    ///
    /// Offsets past the edge are clamped to the edge.
    pub fn neighbour(&self, index: usize, direction: usize, offset: isize) -> usize {
        let c = self.coordinate(index, direction) as isize;
        let target = (c + offset).clamp(0, self.dims[direction] as isize - 1);
        (index as isize + (target - c) * self.spacing[direction] as isize) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_direction_varies_fastest() {
        let layout = FdmLinearOpLayout::new(vec![4, 3]).unwrap();
        assert_eq!(layout.size(), 12);
        assert_eq!(layout.spacing(), &[1, 4]);
        assert_eq!(layout.index(&[2, 1]), 6);
        assert_eq!(layout.coordinate(6, 0), 2);
        assert_eq!(layout.coordinate(6, 1), 1);
    }

    #[test]
    fn neighbours_clamp_at_the_edge() {
        let layout = FdmLinearOpLayout::new(vec![4, 3]).unwrap();
        assert_eq!(layout.neighbour(6, 0, 1), 7);
        assert_eq!(layout.neighbour(6, 1, -1), 2);
        assert_eq!(layout.neighbour(3, 0, 1), 3);
        assert_eq!(layout.neighbour(0, 1, -1), 0);
        assert!(FdmLinearOpLayout::new(vec![4, 0]).is_err());
    }
}
