//! `Array`: a one-dimensional vector of reals.
//!
//! Thin newtype around `nalgebra::DVector<f64>` holding optimizer iterates.
//! Only the operations the minimizers need are exposed.

use nalgebra::DVector;
use sc_core::Real;
use std::ops::{Add, Index, IndexMut, Mul, Sub};

/// A dynamically-sized 1D vector of `Real` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Array(DVector<Real>);

impl Array {
    /// Create a zero-filled array of length `n`.
    pub fn zeros(n: usize) -> Self {
        Self(DVector::zeros(n))
    }

    /// Create an array from a slice.
    pub fn from_slice(data: &[Real]) -> Self {
        Self(DVector::from_column_slice(data))
    }

    /// Number of elements.
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Return the elements as a slice.
    pub fn as_slice(&self) -> &[Real] {
        self.0.as_slice()
    }

    /// Dot product with another array.
    pub fn dot(&self, other: &Array) -> Real {
        self.0.dot(&other.0)
    }

    /// Euclidean (L2) norm.
    pub fn norm(&self) -> Real {
        self.0.norm()
    }

    /// Largest absolute element difference to `other` (∞-norm distance).
    pub fn max_abs_diff(&self, other: &Array) -> Real {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, Real::max)
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

impl From<Vec<Real>> for Array {
    fn from(v: Vec<Real>) -> Self {
        Self(DVector::from_vec(v))
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

impl Add for &Array {
    type Output = Array;
    fn add(self, rhs: &Array) -> Array {
        Array(&self.0 + &rhs.0)
    }
}

impl Sub for &Array {
    type Output = Array;
    fn sub(self, rhs: &Array) -> Array {
        Array(&self.0 - &rhs.0)
    }
}

impl Mul<Real> for &Array {
    type Output = Array;
    fn mul(self, rhs: Real) -> Array {
        Array(&self.0 * rhs)
    }
}

impl std::fmt::Display for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Array::from_slice(&[1.0, 2.0]);
        let b = Array::from_slice(&[0.5, 4.0]);
        assert_eq!((&a + &b).as_slice(), &[1.5, 6.0]);
        assert_eq!((&b - &a).as_slice(), &[-0.5, 2.0]);
        assert_eq!((&a * 3.0).as_slice(), &[3.0, 6.0]);
        assert!((a.dot(&b) - 8.5).abs() < 1e-15);
    }

    #[test]
    fn max_abs_diff_is_infinity_norm() {
        let a = Array::from_slice(&[1.0, -2.0, 3.0]);
        let b = Array::from_slice(&[1.5, 2.0, 3.0]);
        assert!((a.max_abs_diff(&b) - 4.0).abs() < 1e-15);
    }

    #[test]
    fn display() {
        let a = Array::from_slice(&[0.25, 1.0]);
        assert_eq!(a.to_string(), "[0.25, 1]");
    }
}
