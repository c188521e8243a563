//! One-step θ-method integrators for the smooth dynamics.
//!
//! Each dynamical system is paired once, at initialization, with an
//! [`Integrator`] matching its kind:
//!
//! - [`Integrator::MoreauJean`] — Lagrangian systems, velocity-level impulses
//! - [`Integrator::EulerMoreau`] — first-order systems, `r = B λ` inputs
//!
//! Both are written in Newton form around the current iterate `x^α` with
//! residual `R(x) = R_free(x) − reaction`:
//!
//! ```text
//! x_free  = x^α − W⁻¹ R_free(x^α)
//! x^{α+1} = x_free + W⁻¹ reaction
//! ```
//!
//! so linear systems converge in a single iteration.

mod error;
mod euler_moreau;
mod moreau_jean;


pub use error::IntegrationError;

use impulse_core::{
    LinalgError, Lu, Matrix, norm_inf,
    model::{DynamicalSystem, SystemId, SystemKind, SystemStore},
};

use crate::assembly::{AssemblyError, IterationMatrix};

/// Default θ for both integrators.
pub const DEFAULT_THETA: f64 = 0.5;

/// A one-step integration scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum Integrator {
    /// Moreau–Jean time-stepping for Lagrangian systems.
    MoreauJean { theta: f64 },
    /// Euler–Moreau θ-method for first-order systems.
    EulerMoreau { theta: f64 },
}

impl Integrator {
    /// Creates the integrator matching a system kind.
    ///
    /// # Errors
    ///
    /// Returns an error if `theta` is outside `[0, 1]`.
    pub fn for_kind(kind: SystemKind, theta: f64) -> Result<Self, IntegrationError> {
        if !(0.0..=1.0).contains(&theta) {
            return Err(IntegrationError::Theta(theta));
        }
        Ok(match kind {
            SystemKind::Lagrangian => Self::MoreauJean { theta },
            SystemKind::FirstOrder => Self::EulerMoreau { theta },
        })
    }

    /// Returns the system kind this integrator drives.
    #[must_use]
    pub fn kind(&self) -> SystemKind {
        match self {
            Self::MoreauJean { .. } => SystemKind::Lagrangian,
            Self::EulerMoreau { .. } => SystemKind::FirstOrder,
        }
    }

    #[must_use]
    pub fn theta(&self) -> f64 {
        match self {
            Self::MoreauJean { theta } | Self::EulerMoreau { theta } => *theta,
        }
    }

    /// Returns the derivative level at which reactions enter the state.
    #[must_use]
    pub fn input_level(&self) -> usize {
        match self {
            Self::MoreauJean { .. } => 1,
            Self::EulerMoreau { .. } => 0,
        }
    }
}

/// The time window `[t, t + h]` of the step being integrated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub t: f64,
    pub h: f64,
}

impl Window {
    #[must_use]
    pub fn t_next(&self) -> f64 {
        self.t + self.h
    }
}

#[derive(Debug, Clone)]
struct Strategy {
    integrator: Integrator,
    w: Option<(f64, Lu)>,
}

/// Per-system integrators with their factored iteration matrices.
#[derive(Debug, Clone)]
pub struct Integrators {
    strategies: Vec<Strategy>,
}

impl Integrators {
    /// Pairs every system with the integrator matching its kind.
    ///
    /// # Errors
    ///
    /// Returns an error if `theta` is outside `[0, 1]`.
    pub fn resolve(systems: &SystemStore, theta: f64) -> Result<Self, IntegrationError> {
        let integrators = systems
            .iter()
            .map(|(_, system)| Integrator::for_kind(system.kind(), theta))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_integrators(systems, integrators)
    }

    /// Pairs systems with explicitly chosen integrators, in system order.
    ///
    /// # Errors
    ///
    /// Returns an error if the counts differ or an integrator does not
    /// match its system's kind.
    pub fn from_integrators(
        systems: &SystemStore,
        integrators: Vec<Integrator>,
    ) -> Result<Self, IntegrationError> {
        if integrators.len() != systems.len() {
            return Err(IntegrationError::Count {
                expected: systems.len(),
                found: integrators.len(),
            });
        }

        let strategies = systems
            .iter()
            .zip(integrators)
            .map(|((id, system), integrator)| {
                if integrator.kind() == system.kind() {
                    Ok(Strategy {
                        integrator,
                        w: None,
                    })
                } else {
                    Err(IntegrationError::KindMismatch {
                        system: id,
                        integrator,
                    })
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { strategies })
    }

    /// Returns the integrator paired with a system.
    #[must_use]
    pub fn get(&self, id: SystemId) -> Option<Integrator> {
        self.strategies.get(id.index()).map(|s| s.integrator)
    }

    /// Iterates over the distinct reaction input levels, ascending.
    pub fn input_levels(&self) -> impl Iterator<Item = usize> + '_ {
        let mut levels: Vec<usize> = self
            .strategies
            .iter()
            .map(|s| s.integrator.input_level())
            .collect();
        levels.sort_unstable();
        levels.dedup();
        levels.into_iter()
    }

    /// Factors the iteration matrices at the working states.
    ///
    /// Linear systems keep their factorization while `h` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if an iteration matrix is singular.
    pub fn compute_w(
        &mut self,
        systems: &SystemStore,
        window: Window,
    ) -> Result<(), IntegrationError> {
        for ((id, system), strategy) in systems.iter().zip(&mut self.strategies) {
            let current = matches!(&strategy.w, Some((h, _)) if *h == window.h);
            if current && system.dynamics().is_linear() {
                continue;
            }

            let w = match strategy.integrator {
                Integrator::MoreauJean { theta } => {
                    moreau_jean::iteration_matrix(system, theta, window.h)
                }
                Integrator::EulerMoreau { theta } => {
                    euler_moreau::iteration_matrix(system, theta, window)
                }
            };
            let lu = Lu::factor(&w)
                .map_err(|source| IntegrationError::IterationMatrix { system: id, source })?;
            strategy.w = Some((window.h, lu));
        }
        Ok(())
    }

    /// Computes every system's free state from its working state.
    ///
    /// # Errors
    ///
    /// Returns an error if the iteration matrices have not been computed.
    pub fn compute_free_state(
        &self,
        systems: &mut SystemStore,
        window: Window,
    ) -> Result<(), IntegrationError> {
        for ((id, system), strategy) in systems.iter_mut().zip(&self.strategies) {
            let lu = strategy.lu(id)?;
            let free = match strategy.integrator {
                Integrator::MoreauJean { theta } => {
                    moreau_jean::free_state(system, theta, window.h, lu)
                }
                Integrator::EulerMoreau { theta } => {
                    euler_moreau::free_state(system, theta, window, lu)
                }
            }
            .map_err(|source| IntegrationError::IterationMatrix { system: id, source })?;
            *system.free_state_mut() = free;
        }
        Ok(())
    }

    /// Sets the working state to the free state plus the reaction, for the
    /// systems whose reactions enter at `level`.
    ///
    /// # Errors
    ///
    /// Returns an error if the iteration matrices have not been computed.
    pub fn update_state(
        &self,
        systems: &mut SystemStore,
        level: usize,
        window: Window,
    ) -> Result<(), IntegrationError> {
        for ((id, system), strategy) in systems.iter_mut().zip(&self.strategies) {
            if strategy.integrator.input_level() != level {
                continue;
            }
            let lu = strategy.lu(id)?;
            let state = match strategy.integrator {
                Integrator::MoreauJean { theta } => {
                    moreau_jean::corrected_state(system, theta, window.h, lu)
                }
                Integrator::EulerMoreau { .. } => {
                    euler_moreau::corrected_state(system, window.h, lu)
                }
            }
            .map_err(|source| IntegrationError::IterationMatrix { system: id, source })?;
            *system.state_mut() = state;
        }
        Ok(())
    }

    /// Returns the max-norm of the discretized residual over all systems.
    #[must_use]
    pub fn compute_residual(&self, systems: &SystemStore, window: Window) -> f64 {
        systems
            .iter()
            .zip(&self.strategies)
            .map(|((_, system), strategy)| residual(system, strategy.integrator, window))
            .fold(0.0, f64::max)
    }
}

impl Strategy {
    fn lu(&self, id: SystemId) -> Result<&Lu, IntegrationError> {
        self.w
            .as_ref()
            .map(|(_, lu)| lu)
            .ok_or(IntegrationError::NotInitialized(id))
    }
}

fn residual(system: &DynamicalSystem, integrator: Integrator, window: Window) -> f64 {
    match integrator {
        Integrator::MoreauJean { theta } => {
            let r = moreau_jean::free_residual(system, theta, window.h, &system.state().velocity)
                - system.input(1);
            norm_inf(&r)
        }
        Integrator::EulerMoreau { theta } => {
            let r = euler_moreau::free_residual(system, theta, window, &system.state().position)
                - &(system.input(0) * window.h);
            norm_inf(&r)
        }
    }
}

impl IterationMatrix for Integrators {
    fn w_solve(&self, system: SystemId, rhs: &Matrix) -> Result<Matrix, AssemblyError> {
        let strategy = self
            .strategies
            .get(system.index())
            .ok_or(AssemblyError::MissingOperator(system))?;
        let lu = strategy
            .lu(system)
            .map_err(|_| AssemblyError::MissingOperator(system))?;
        lu.solve_matrix(rhs)
            .map_err(|source: LinalgError| AssemblyError::Operator { system, source })
    }

    fn reaction_scale(&self, system: SystemId) -> f64 {
        match self.strategies.get(system.index()) {
            Some(Strategy {
                integrator: Integrator::EulerMoreau { .. },
                w: Some((h, _)),
            }) => *h,
            _ => 1.0,
        }
    }
}
