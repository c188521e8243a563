use impulse_core::{events::EventError, topology::TopologyError};
use thiserror::Error;

use crate::{assembly::AssemblyError, integration::IntegrationError};

use super::ConfigError;

/// Errors that can occur during time-stepping simulation.
///
/// Solver failures and Newton non-convergence are not errors; they are
/// reported in each [`StepReport`](super::StepReport).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("integrator error: {0}")]
    Integration(#[from] IntegrationError),

    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("index set error: {0}")]
    Topology(#[from] TopologyError),

    #[error("event error: {0}")]
    Events(#[from] EventError),

    #[error("no step left after t = {0}")]
    Finished(f64),
}
