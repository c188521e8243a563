//! Bisection location of sign changes on a bracketed interval.
//!
//! Event-driven simulation uses this module to find the first instant at
//! which an event function `g(t)` leaves the positive half-line. The
//! bracket must hold one point with `g > 0` and one with `g ≤ 0`; zero
//! counts as non-positive, so the reported root always sits on the side
//! where the event has already happened.
//!
//! # Observer Events
//!
//! The solver emits one [`Event`] per midpoint evaluation. Observers can
//! return [`Action::StopEarly`] to halt, or [`Action::AssumeResidualSign`]
//! to steer the bracket update.

mod action;
mod bracket;
mod config;
mod error;
mod event;
mod solution;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use bracket::{BracketError, Sign};
pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::Event;
pub use solution::{Solution, Status};

use std::error::Error as StdError;

use impulse_core::Observer;

use bracket::Bracket;

/// Locates a sign change of `function` inside `bracket` by bisection.
///
/// The returned `x` is the bracket end on the non-positive side, so
/// `function(x) ≤ 0` unless an observer assumed otherwise.
///
/// # Errors
///
/// Returns an error if the bracket does not enclose a sign change or if
/// `function` fails.
pub fn bisect<F, E, Obs>(
    mut function: F,
    bracket: [f64; 2],
    config: &Config,
    mut observer: Obs,
) -> Result<Solution, Error>
where
    F: FnMut(f64) -> Result<f64, E>,
    E: StdError + Send + Sync + 'static,
    Obs: Observer<Event, Action>,
{
    let [a, b] = bracket;
    let residuals = [
        function(a).map_err(Error::function)?,
        function(b).map_err(Error::function)?,
    ];
    let mut bracket = Bracket::new([a, b], residuals)?;

    for iter in 1..=config.max_iters() {
        if bracket.is_converged(config) {
            return Ok(bracket.finish(Status::Converged, iter - 1));
        }

        let x = bracket.midpoint();
        let residual = function(x).map_err(Error::function)?;
        tracing::trace!(iter, x, residual, "bisection step");

        let event = Event {
            iter,
            x,
            residual,
            bracket: bracket.bounds(),
        };
        let sign = match observer.observe(&event) {
            Some(Action::StopEarly) => {
                return Ok(bracket.finish(Status::StoppedByObserver, iter));
            }
            Some(Action::AssumeResidualSign(sign)) => sign,
            None => Sign::of(residual),
        };
        bracket.shrink(x, residual, sign);

        if sign == Sign::Negative && residual.abs() <= config.residual_tol() {
            return Ok(bracket.finish(Status::Converged, iter));
        }
    }

    let iters = config.max_iters();
    if bracket.is_converged(config) {
        Ok(bracket.finish(Status::Converged, iters))
    } else {
        Ok(bracket.finish(Status::MaxIters, iters))
    }
}

/// Locates a sign change without observer support.
///
/// This is a convenience wrapper around [`bisect`] that uses a no-op observer.
///
/// # Errors
///
/// Returns an error if the bracket does not enclose a sign change or if
/// `function` fails.
pub fn bisect_unobserved<F, E>(
    function: F,
    bracket: [f64; 2],
    config: &Config,
) -> Result<Solution, Error>
where
    F: FnMut(f64) -> Result<f64, E>,
    E: StdError + Send + Sync + 'static,
{
    bisect(function, bracket, config, ())
}
