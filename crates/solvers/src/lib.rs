//! Simulation strategies for non-smooth dynamical systems.
//!
//! Two simulations drive a [`Model`](impulse_core::model::Model) through
//! time:
//!
//! - [`time_stepping`] — fixed steps with a Newton loop per step, solving
//!   impacts and contact forces together as velocity-level impulses
//! - [`event_driven`] — smooth integration between events, with gap
//!   closings located by [`root`] finding and processed as impacts
//!
//! Both build on the same pieces:
//!
//! - [`integration`] — one-step integrators and their iteration matrices
//! - [`assembly`] — block assembly of the one-step non-smooth problem
//! - [`complementarity`] — boxed linear complementarity problems and the
//!   projected Gauss–Seidel solver
//! - [`control`] — sensors and actuators fired by the event queue

pub mod assembly;
pub mod complementarity;
pub mod control;
pub mod event_driven;
pub mod integration;
pub mod root;
pub mod time_stepping;
