//! `Array`: a dense vector of reals backed by `nalgebra::DVector`.

use nalgebra::DVector;
use ql_core::Real;
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub, SubAssign};

/// A dynamically sized vector of `Real` values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array(DVector<Real>);

impl Array {
    /// A zero-filled array of length `n`.
    pub fn zeros(n: usize) -> Self {
        Self(DVector::zeros(n))
    }

    /// An array of length `n` filled with `value`.
    pub fn from_element(n: usize, value: Real) -> Self {
        Self(DVector::from_element(n, value))
    }

    /// Copy a slice into a new array.
    pub fn from_slice(data: &[Real]) -> Self {
        Self(DVector::from_column_slice(data))
    }

    /// Take ownership of a `Vec`.
    pub fn from_vec(data: Vec<Real>) -> Self {
        Self(DVector::from_vec(data))
    }

    /// Build an array from a function of the index.
    pub fn from_fn(n: usize, f: impl FnMut(usize) -> Real) -> Self {
        let mut f = f;
        Self(DVector::from_fn(n, |i, _| f(i)))
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Elements as a slice.
    pub fn as_slice(&self) -> &[Real] {
        self.0.as_slice()
    }

    /// Elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [Real] {
        self.0.as_mut_slice()
    }

    /// Borrow the underlying `DVector`.
    pub fn inner(&self) -> &DVector<Real> {
        &self.0
    }

    /// Copy the elements into a `Vec`.
    pub fn to_vec(&self) -> Vec<Real> {
        self.0.as_slice().to_vec()
    }

    /// Dot product.
    pub fn dot(&self, other: &Array) -> Real {
        self.0.dot(&other.0)
    }

    /// Euclidean norm.
    pub fn norm(&self) -> Real {
        self.0.norm()
    }

    /// Largest absolute element.
    pub fn max_abs(&self) -> Real {
        self.0.amax()
    }

    /// Element-wise product.
    pub fn component_mul(&self, other: &Array) -> Array {
        Self(self.0.component_mul(&other.0))
    }

    /// `self += alpha * x`.
    pub fn axpy(&mut self, alpha: Real, x: &Array) {
        self.0.axpy(alpha, &x.0, 1.0);
    }

    /// Apply `f` element-wise.
    pub fn map(&self, f: impl FnMut(Real) -> Real) -> Array {
        Self(self.0.map(f))
    }

    /// Iterator over elements.
    pub fn iter(&self) -> impl Iterator<Item = &Real> {
        self.0.iter()
    }
}

impl From<DVector<Real>> for Array {
    fn from(v: DVector<Real>) -> Self {
        Self(v)
    }
}

impl From<Array> for DVector<Real> {
    fn from(a: Array) -> Self {
        a.0
    }
}

impl From<Vec<Real>> for Array {
    fn from(v: Vec<Real>) -> Self {
        Self::from_vec(v)
    }
}

impl From<&[Real]> for Array {
    fn from(s: &[Real]) -> Self {
        Self::from_slice(s)
    }
}

impl FromIterator<Real> for Array {
    fn from_iter<I: IntoIterator<Item = Real>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl Index<usize> for Array {
    type Output = Real;
    fn index(&self, i: usize) -> &Real {
        &self.0[i]
    }
}

impl IndexMut<usize> for Array {
    fn index_mut(&mut self, i: usize) -> &mut Real {
        &mut self.0[i]
    }
}

// ── Arithmetic ────────────────────────────────────────────────────────────────

macro_rules! array_binop {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&Array> for &Array {
            type Output = Array;
            fn $method(self, rhs: &Array) -> Array {
                Array(&self.0 $op &rhs.0)
            }
        }
        impl $trait<Array> for Array {
            type Output = Array;
            fn $method(self, rhs: Array) -> Array {
                Array(self.0 $op rhs.0)
            }
        }
        impl $trait<&Array> for Array {
            type Output = Array;
            fn $method(self, rhs: &Array) -> Array {
                Array(self.0 $op &rhs.0)
            }
        }
    };
}

array_binop!(Add, add, +);
array_binop!(Sub, sub, -);

impl AddAssign<&Array> for Array {
    fn add_assign(&mut self, rhs: &Array) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<&Array> for Array {
    fn sub_assign(&mut self, rhs: &Array) {
        self.0 -= &rhs.0;
    }
}

impl Mul<Real> for &Array {
    type Output = Array;
    fn mul(self, rhs: Real) -> Array {
        Array(&self.0 * rhs)
    }
}

impl Mul<Real> for Array {
    type Output = Array;
    fn mul(self, rhs: Real) -> Array {
        Array(self.0 * rhs)
    }
}

impl Mul<&Array> for Real {
    type Output = Array;
    fn mul(self, rhs: &Array) -> Array {
        Array(&rhs.0 * self)
    }
}

impl Div<Real> for &Array {
    type Output = Array;
    fn div(self, rhs: Real) -> Array {
        Array(&self.0 / rhs)
    }
}

impl Neg for &Array {
    type Output = Array;
    fn neg(self) -> Array {
        Array(-&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn arithmetic() {
        let a = Array::from_slice(&[1.0, 2.0, 3.0]);
        let b = Array::from_slice(&[4.0, 5.0, 6.0]);
        assert_eq!((&a + &b).as_slice(), &[5.0, 7.0, 9.0]);
        assert_eq!((&b - &a).as_slice(), &[3.0, 3.0, 3.0]);
        assert_eq!((2.0 * &a).as_slice(), &[2.0, 4.0, 6.0]);
        assert_abs_diff_eq!(a.dot(&b), 32.0);
        assert_abs_diff_eq!(a.norm(), 14.0_f64.sqrt());
    }

    #[test]
    fn axpy_and_component_mul() {
        let mut y = Array::from_element(3, 1.0);
        let x = Array::from_fn(3, |i| i as Real);
        y.axpy(2.0, &x);
        assert_eq!(y.as_slice(), &[1.0, 3.0, 5.0]);
        assert_eq!(y.component_mul(&x).as_slice(), &[0.0, 3.0, 10.0]);
        assert_abs_diff_eq!(y.max_abs(), 5.0);
    }
}
