//! Reusable observers for impulse simulations.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work across the simulations in `impulse-solvers`.
//!
//! # Modules
//!
//! - [`traits`] — Capability traits for cross-simulation observers
//!   ([`HasTime`], [`HasResidual`], [`CanStopEarly`])
//!
//! # Observers
//!
//! - [`Recorder`] — collects one `(time, value)` sample per event
//! - [`StopAt`] — stops a run at a given time
//!
//! [`Observer`]: impulse_core::Observer
//! [`HasTime`]: traits::HasTime
//! [`HasResidual`]: traits::HasResidual
//! [`CanStopEarly`]: traits::CanStopEarly

pub mod traits;

mod recorder;

pub use recorder::{Recorder, StopAt};
