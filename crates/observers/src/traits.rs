//! Capability traits for cross-simulation observers.
//!
//! These traits abstract over simulation-specific event and action types,
//! enabling observers to work generically across time-stepping,
//! event-driven, and root-finding runs.
//!
//! # Event traits
//!
//! - [`HasTime`] — events that carry the simulation time they report
//! - [`HasResidual`] — events that carry a residual value
//!
//! # Action traits
//!
//! - [`CanStopEarly`] — actions that can signal early termination
//!
//! # Example
//!
//! ```rust
//! use impulse_core::Observer;
//! use impulse_observers::traits::{CanStopEarly, HasTime};
//!
//! struct StopAt {
//!     time: f64,
//! }
//!
//! impl<E: HasTime, A: CanStopEarly> Observer<E, A> for StopAt {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         (event.time() >= self.time).then(A::stop_early)
//!     }
//! }
//! ```

use impulse_solvers::{event_driven, root, time_stepping};

/// An event that carries the simulation time it reports.
pub trait HasTime {
    /// Returns the time reached when the event was emitted.
    fn time(&self) -> f64;
}

/// An event that carries a residual value.
pub trait HasResidual {
    /// Returns the residual for this event.
    fn residual(&self) -> f64;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the run early.
    fn stop_early() -> Self;
}

// --- HasTime impls ---

impl HasTime for time_stepping::Event<'_> {
    fn time(&self) -> f64 {
        self.report.time
    }
}

impl HasTime for event_driven::Event<'_> {
    fn time(&self) -> f64 {
        self.report.time
    }
}

// --- HasResidual impls ---

/// The largest enabled Newton residual of the step.
impl HasResidual for time_stepping::Event<'_> {
    fn residual(&self) -> f64 {
        self.report.residuals.max()
    }
}

impl HasResidual for root::Event {
    fn residual(&self) -> f64 {
        self.residual
    }
}

// --- CanStopEarly impls ---

impl CanStopEarly for time_stepping::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}

impl CanStopEarly for event_driven::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}

impl CanStopEarly for root::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
