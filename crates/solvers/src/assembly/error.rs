use impulse_core::{
    LinalgError,
    model::{InteractionId, SystemId},
};
use thiserror::Error;

use crate::complementarity::ProblemError;

/// Identifies a block of the assembled matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Diagonal(InteractionId),
    Coupling(InteractionId, InteractionId),
}

/// Errors raised while assembling or solving a block problem.
///
/// All of these are fatal for the step.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("block {block:?} has shape {found:?}, expected {expected:?}")]
    DimensionMismatch {
        block: Block,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("interaction {0:?} has no absolute position")]
    Unpositioned(InteractionId),

    #[error("no iteration matrix for system {0:?}")]
    MissingOperator(SystemId),

    #[error("operator of system {system:?} failed: {source}")]
    Operator {
        system: SystemId,
        #[source]
        source: LinalgError,
    },

    #[error("invalid problem: {0}")]
    Problem(#[from] ProblemError),
}
