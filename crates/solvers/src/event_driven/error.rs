use impulse_core::{
    LinalgError,
    events::EventError,
    model::{InteractionId, SystemId},
    topology::TopologyError,
};
use thiserror::Error;

use crate::{assembly::AssemblyError, root};

use super::ConfigError;

/// Errors that can occur during event-driven simulation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("system {0:?} is not Lagrangian")]
    FirstOrderSystem(SystemId),

    #[error("interaction {0:?} has a friction law")]
    FrictionalContact(InteractionId),

    #[error("mass matrix of system {system:?} failed: {source}")]
    Mass {
        system: SystemId,
        #[source]
        source: LinalgError,
    },

    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("index set error: {0}")]
    Topology(#[from] TopologyError),

    #[error("event error: {0}")]
    Events(#[from] EventError),

    #[error("event location failed: {0}")]
    Root(#[from] root::Error),

    #[error("no step left after t = {0}")]
    Finished(f64),
}
