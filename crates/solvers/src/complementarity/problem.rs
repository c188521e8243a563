use impulse_core::{Matrix, Vector};
use thiserror::Error;

use super::natural_residual;

/// Errors raised when building a [`BoxedProblem`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProblemError {
    #[error("M is {rows}x{cols}, expected a square matrix matching q ({size})")]
    Shape { rows: usize, cols: usize, size: usize },

    #[error("bounds have lengths {lower} and {upper}, expected {size}")]
    Bounds { lower: usize, upper: usize, size: usize },

    #[error("row {row} has lower bound above upper bound")]
    EmptyInterval { row: usize },

    #[error("initial guess has length {found}, expected {size}")]
    InitialGuess { found: usize, size: usize },

    #[error("friction cone at row {normal} is malformed or overlaps another")]
    Cone { normal: usize },
}

/// Coulomb friction cone over consecutive rows.
///
/// Row `normal` carries the normal reaction; the `tangents` rows after it
/// must stay in the disk of radius `mu · z_normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct FrictionCone {
    pub normal: usize,
    pub tangents: usize,
    pub mu: f64,
}

impl FrictionCone {
    /// Returns the row after the last tangent.
    #[must_use]
    pub fn end(&self) -> usize {
        self.normal + 1 + self.tangents
    }

    /// Scales the tangent rows of `z` back into the disk of radius
    /// `mu · max(normal, 0)`.
    pub fn project(&self, z: &mut Vector, normal: f64) {
        let radius = self.mu * normal.max(0.0);
        let tangents = self.normal + 1..self.end();
        let norm = tangents.clone().map(|i| z[i] * z[i]).sum::<f64>().sqrt();
        if norm > radius {
            let scale = radius / norm;
            for i in tangents {
                z[i] *= scale;
            }
        }
    }
}

/// A box-constrained linear complementarity problem `(M, q, lo, hi)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxedProblem {
    m: Matrix,
    q: Vector,
    lower: Vector,
    upper: Vector,
    initial: Option<Vector>,
    cones: Vec<FrictionCone>,
}

impl BoxedProblem {
    /// Creates a problem after checking shapes and bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if `m` is not square, sizes disagree with `q`, or a
    /// row has `lo > hi` (or a NaN bound).
    pub fn new(
        m: Matrix,
        q: Vector,
        lower: Vector,
        upper: Vector,
    ) -> Result<Self, ProblemError> {
        let size = q.len();
        let (rows, cols) = m.dim();
        if rows != size || cols != size {
            return Err(ProblemError::Shape { rows, cols, size });
        }
        if lower.len() != size || upper.len() != size {
            return Err(ProblemError::Bounds {
                lower: lower.len(),
                upper: upper.len(),
                size,
            });
        }
        if let Some(row) =
            (0..size).find(|&i| lower[i].is_nan() || upper[i].is_nan() || lower[i] > upper[i])
        {
            return Err(ProblemError::EmptyInterval { row });
        }

        Ok(Self {
            m,
            q,
            lower,
            upper,
            initial: None,
            cones: Vec::new(),
        })
    }

    /// Sets the starting iterate. It is projected onto the bounds by solvers.
    ///
    /// # Errors
    ///
    /// Returns an error if `z0` does not match the problem size.
    pub fn with_initial_guess(mut self, z0: Vector) -> Result<Self, ProblemError> {
        if z0.len() != self.size() {
            return Err(ProblemError::InitialGuess {
                found: z0.len(),
                size: self.size(),
            });
        }
        self.initial = Some(z0);
        Ok(self)
    }

    /// Couples rows through friction cones. Tangent rows keep their box
    /// bounds and are additionally projected onto their cone.
    ///
    /// # Errors
    ///
    /// Returns an error if a cone has no tangent row, a negative or
    /// non-finite coefficient, runs past the last row, or shares a row with
    /// another cone.
    pub fn with_friction_cones(mut self, cones: Vec<FrictionCone>) -> Result<Self, ProblemError> {
        let mut taken = vec![false; self.size()];
        for cone in &cones {
            let valid = cone.tangents > 0
                && cone.mu.is_finite()
                && cone.mu >= 0.0
                && cone.end() <= self.size()
                && (cone.normal..cone.end()).all(|row| !taken[row]);
            if !valid {
                return Err(ProblemError::Cone {
                    normal: cone.normal,
                });
            }
            taken[cone.normal..cone.end()].fill(true);
        }
        self.cones = cones;
        Ok(self)
    }

    /// Returns the number of unknowns.
    #[must_use]
    pub fn size(&self) -> usize {
        self.q.len()
    }

    #[must_use]
    pub fn m(&self) -> &Matrix {
        &self.m
    }

    #[must_use]
    pub fn q(&self) -> &Vector {
        &self.q
    }

    #[must_use]
    pub fn lower(&self) -> &Vector {
        &self.lower
    }

    #[must_use]
    pub fn upper(&self) -> &Vector {
        &self.upper
    }

    #[must_use]
    pub fn initial_guess(&self) -> Option<&Vector> {
        self.initial.as_ref()
    }

    #[must_use]
    pub fn cones(&self) -> &[FrictionCone] {
        &self.cones
    }

    /// Projects `z` onto the bounds, then every tangent pair onto its cone.
    pub fn project(&self, z: &mut Vector) {
        for i in 0..z.len() {
            z[i] = z[i].clamp(self.lower[i], self.upper[i]);
        }
        for cone in &self.cones {
            let normal = z[cone.normal];
            cone.project(z, normal);
        }
    }

    /// Returns the natural-map residual `‖z − Π(z − w)‖∞`, where `Π`
    /// projects onto the bounds and the friction cones, the cone radius
    /// being taken from the current normal reaction.
    #[must_use]
    pub fn residual(&self, z: &Vector, w: &Vector) -> f64 {
        if self.cones.is_empty() {
            return natural_residual(z, w, &self.lower, &self.upper);
        }
        let mut projected = z - w;
        for i in 0..z.len() {
            projected[i] = projected[i].clamp(self.lower[i], self.upper[i]);
        }
        for cone in &self.cones {
            cone.project(&mut projected, z[cone.normal]);
        }
        (z - &projected).iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
    }
}
