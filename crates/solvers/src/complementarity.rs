//! Box-constrained complementarity problems and their solvers.
//!
//! A [`BoxedProblem`] asks for `z` such that, with `w = M z + q`,
//!
//! ```text
//! lo ≤ z ≤ hi
//! z_i = lo_i       ⇒  w_i ≥ 0
//! z_i = hi_i       ⇒  w_i ≤ 0
//! lo_i < z_i < hi_i ⇒  w_i = 0
//! ```
//!
//! Complementarity rows use `[0, +∞)`, relay rows their finite bounds, and
//! equality rows `(-∞, +∞)`. Frictional contacts add a [`FrictionCone`]:
//! their tangent rows are unbounded in the box but must stay within
//! `μ` times the normal reaction. This covers every non-smooth law in the
//! model.
//!
//! # Solvers
//!
//! - [`ProjectedGaussSeidel`] — row-by-row projection, the built-in solver
//!
//! Other solvers plug in through the [`NonSmoothSolver`] trait.

mod options;
mod pgs;
mod problem;


pub use options::{OptionsError, SolverOptions};
pub use pgs::ProjectedGaussSeidel;
pub use problem::{BoxedProblem, FrictionCone, ProblemError};

use impulse_core::Vector;

/// Outcome of a complementarity solve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverStatus {
    /// The natural-map residual met the tolerance.
    Converged { iters: usize },

    /// The iteration limit was reached first.
    MaxIters { residual: f64 },

    /// A diagonal entry of `M` was not strictly positive.
    SingularDiagonal { row: usize },
}

impl SolverStatus {
    /// Returns `0` on success and a positive code otherwise.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Converged { .. } => 0,
            Self::MaxIters { .. } => 1,
            Self::SingularDiagonal { .. } => 2,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code() == 0
    }
}

/// Solution `(z, w)` of a complementarity problem with its status.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutput {
    pub z: Vector,
    pub w: Vector,
    pub status: SolverStatus,
}

/// A solver for box-constrained complementarity problems.
pub trait NonSmoothSolver {
    /// Solves `problem`, never retrying on failure.
    ///
    /// A failure is reported through [`SolverOutput::status`]; the returned
    /// `(z, w)` are the last iterate.
    fn solve(&self, problem: &BoxedProblem, options: &SolverOptions) -> SolverOutput;
}

/// Returns the natural-map residual `‖z − Π[lo, hi](z − w)‖∞`.
///
/// The residual is zero exactly when `(z, w)` solves the problem.
#[must_use]
pub fn natural_residual(z: &Vector, w: &Vector, lower: &Vector, upper: &Vector) -> f64 {
    let mut residual: f64 = 0.0;
    for i in 0..z.len() {
        let projected = (z[i] - w[i]).clamp(lower[i], upper[i]);
        residual = residual.max((z[i] - projected).abs());
    }
    residual
}
