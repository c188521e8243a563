use thiserror::Error;

use super::EventHandle;

/// Errors that can occur when scheduling or removing events.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum EventError {
    #[error("tick must be finite and positive, got {0}")]
    InvalidTick(f64),

    #[error("invalid simulation horizon [{t0}, {t_final}]")]
    InvalidHorizon { t0: f64, t_final: f64 },

    #[error("event time {time} is outside the simulation horizon [{t0}, {t_final}]")]
    OutOfBounds { time: f64, t0: f64, t_final: f64 },

    #[error("event time {time} is before the current time {now}")]
    InThePast { time: f64, now: f64 },

    #[error("events at the current instant cannot be removed")]
    RemoveCurrent,

    #[error("no pending event with handle {0:?}")]
    UnknownEvent(EventHandle),
}
