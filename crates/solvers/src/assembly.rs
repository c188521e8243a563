//! Block assembly of the one-step non-smooth problem.
//!
//! An index set of active interactions is turned into a linear
//! complementarity problem `w = M z + q` in two layers:
//!
//! - [`OsnsMatrix`] assigns each interaction a contiguous absolute position
//!   (the prefix sum of law sizes in iteration order) and stores the dense
//!   `D × D` block matrix, copying diagonal blocks and accumulating
//!   coupling blocks between interactions that share a system.
//! - [`LinearOsns`] computes those blocks from the relations and the
//!   systems' iteration matrices, builds `q` from free outputs, hands the
//!   problem to a [`NonSmoothSolver`](crate::complementarity::NonSmoothSolver),
//!   and scatters the solution back into `λ` and `y`.
//!
//! Positions are recomputed only when the index set's generation changes
//! or a rebuild is forced; otherwise block contents are refreshed in place.

mod error;
mod linear;
mod matrix;

#[cfg(test)]
mod tests;

pub use error::{AssemblyError, Block};
pub use linear::{Assembly, LinearOsns, SolveReport};
pub use matrix::{Blocks, Coupling, OsnsMatrix};

use impulse_core::{Matrix, model::SystemId};

/// Access to the per-system operator `W` that maps reactions to state
/// corrections.
///
/// Time-stepping uses each integrator's iteration matrix; event-driven
/// impacts use the mass matrix.
pub trait IterationMatrix {
    /// Returns `W⁻¹ rhs` for the given system.
    ///
    /// # Errors
    ///
    /// Returns an error if the system has no operator or it cannot be applied.
    fn w_solve(&self, system: SystemId, rhs: &Matrix) -> Result<Matrix, AssemblyError>;

    /// Returns the factor applied to a system's reaction before `W⁻¹`.
    fn reaction_scale(&self, system: SystemId) -> f64;
}
