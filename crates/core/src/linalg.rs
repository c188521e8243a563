//! Dense linear algebra used across the workspace.
//!
//! Operators and states are stored as `ndarray` arrays. Factorizations are
//! delegated to `nalgebra`, converting at the boundary.

use nalgebra::{DMatrix, DVector, Dyn, linalg::LU};
use ndarray::{Array1, Array2};
use thiserror::Error;

/// Column vector of `f64` values.
pub type Vector = Array1<f64>;

/// Dense row-major matrix of `f64` values.
pub type Matrix = Array2<f64>;

/// Errors raised by dense factorizations and solves.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum LinalgError {
    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("matrix has a non-finite entry")]
    NonFinite,

    #[error("matrix is singular")]
    Singular,
}

/// LU factorization with partial pivoting, `P A = L U`.
#[derive(Debug, Clone)]
pub struct Lu {
    lu: LU<f64, Dyn, Dyn>,
    dim: usize,
}

impl Lu {
    /// Factors a square matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not square, holds a non-finite
    /// entry, or is singular.
    pub fn factor(matrix: &Matrix) -> Result<Self, LinalgError> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(LinalgError::NotSquare { rows, cols });
        }
        if !matrix.iter().all(|x| x.is_finite()) {
            return Err(LinalgError::NonFinite);
        }

        let lu = DMatrix::from_fn(rows, cols, |i, j| matrix[[i, j]]).lu();
        if !lu.is_invertible() {
            return Err(LinalgError::Singular);
        }

        Ok(Self { lu, dim: rows })
    }

    /// Returns the dimension of the factored matrix.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Solves `A x = rhs`.
    ///
    /// # Errors
    ///
    /// Returns an error if `rhs` does not match the matrix dimension.
    pub fn solve(&self, rhs: &Vector) -> Result<Vector, LinalgError> {
        self.check_rows(rhs.len())?;

        let b = DVector::from_iterator(rhs.len(), rhs.iter().copied());
        let x = self.lu.solve(&b).ok_or(LinalgError::Singular)?;
        Ok(x.iter().copied().collect())
    }

    /// Solves `A X = rhs` for every column of `rhs`.
    ///
    /// # Errors
    ///
    /// Returns an error if `rhs` does not have as many rows as the matrix.
    pub fn solve_matrix(&self, rhs: &Matrix) -> Result<Matrix, LinalgError> {
        let (rows, cols) = rhs.dim();
        self.check_rows(rows)?;

        let b = DMatrix::from_fn(rows, cols, |i, j| rhs[[i, j]]);
        let x = self.lu.solve(&b).ok_or(LinalgError::Singular)?;
        Ok(Matrix::from_shape_fn((rows, cols), |(i, j)| x[(i, j)]))
    }

    fn check_rows(&self, found: usize) -> Result<(), LinalgError> {
        if found == self.dim {
            Ok(())
        } else {
            Err(LinalgError::DimensionMismatch {
                expected: self.dim,
                found,
            })
        }
    }
}

/// Returns the max-norm of a vector, `0.0` when empty.
#[must_use]
pub fn norm_inf(v: &Vector) -> f64 {
    v.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}
