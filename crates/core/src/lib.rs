//! Core types for simulating non-smooth dynamical systems.
//!
//! This crate defines the shared data model that simulations build on:
//!
//! - [`model`] — dynamical systems, relations, non-smooth laws, and the
//!   interactions coupling them
//! - [`topology`] — the interaction graph and its nested index sets of
//!   active constraints
//! - [`events`] — the time-ordered queue of discrete events
//! - [`time`] — uniform and instant-list time discretisations
//! - [`Observer`] — receives simulation events and optionally returns
//!   control actions
//!
//! Dense linear algebra uses [`ndarray`] through the [`Vector`] and
//! [`Matrix`] aliases.

mod linalg;
mod observer;

pub mod events;
pub mod model;
pub mod time;
pub mod topology;

pub use linalg::{LinalgError, Lu, Matrix, Vector, norm_inf};
pub use observer::Observer;
