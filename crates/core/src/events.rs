//! Discrete event scheduling.
//!
//! The [`EventsManager`] keeps a time-and-kind-ordered queue of [`Event`]s
//! and advances the simulation's notion of "now" as they are processed.
//!
//! # Ordering
//!
//! Event times are quantized to an integer number of ticks so that
//! instants computed along different paths compare exactly. Events sharing
//! an instant are ordered by kind priority (see [`EventKind::priority`]),
//! then by insertion order, so simultaneous events are always processed in
//! the same sequence.

mod error;
mod event;
mod manager;

pub use error::EventError;
pub use event::{Event, EventHandle, EventKind};
pub use manager::{DEFAULT_TICK, EventsManager};
