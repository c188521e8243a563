use thiserror::Error;

use super::SystemId;

/// Configuration errors raised while building a model.
///
/// These are fatal: a model that fails validation cannot be simulated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("invalid time horizon [{t0}, {t_final}]")]
    Horizon { t0: f64, t_final: f64 },

    #[error("{what} has shape {found:?}, expected {expected:?}")]
    Shape {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("{what} has length {found}, expected {expected}")]
    Length {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("a dynamical system needs at least one coordinate")]
    EmptySystem,

    #[error("unknown dynamical system {0:?}")]
    UnknownSystem(SystemId),

    #[error("an interaction couples one or two distinct systems, got {0:?}")]
    SystemCount(Vec<SystemId>),

    #[error("relation has {relation} rows but the law has size {law}")]
    LawSize { relation: usize, law: usize },

    #[error("relation spans {relation} columns but the coupled systems have {systems} coordinates")]
    RelationWidth { relation: usize, systems: usize },

    #[error("relation kind does not match system {0:?}")]
    KindMismatch(SystemId),

    #[error("a non-smooth law needs a positive size")]
    EmptyLaw,

    #[error("restitution coefficient must lie in [0, 1], got {0}")]
    Restitution(f64),

    #[error("relay bounds must be finite with lower <= upper")]
    RelayBounds,

    #[error("friction coefficient must be finite and non-negative, got {0}")]
    FrictionCoefficient(f64),

    #[error("a frictional contact has 2 or 3 rows, got {0}")]
    FrictionSize(usize),
}
