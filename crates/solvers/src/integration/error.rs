use impulse_core::{LinalgError, model::SystemId};
use thiserror::Error;

use super::Integrator;

/// Errors raised while pairing or running integrators.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum IntegrationError {
    #[error("theta must lie in [0, 1], got {0}")]
    Theta(f64),

    #[error("expected one integrator per system ({expected}), got {found}")]
    Count { expected: usize, found: usize },

    #[error("{integrator:?} cannot integrate system {system:?}")]
    KindMismatch {
        system: SystemId,
        integrator: Integrator,
    },

    #[error("iteration matrix of system {system:?} failed: {source}")]
    IterationMatrix {
        system: SystemId,
        #[source]
        source: LinalgError,
    },

    #[error("iteration matrix of system {0:?} has not been computed")]
    NotInitialized(SystemId),
}
