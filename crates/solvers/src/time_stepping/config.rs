use impulse_core::topology::DEFAULT_TOLERANCE;
use thiserror::Error;

use crate::{complementarity::SolverOptions, integration::DEFAULT_THETA};

/// How the Newton loop of a step terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum NewtonMode {
    /// Exactly one predict–solve–update cycle per step.
    Linear,

    /// Iterate until every enabled residual is below tolerance.
    #[default]
    NonLinear,
}

/// Configuration for time-stepping simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    newton_mode: NewtonMode,
    newton_tolerance: f64,
    newton_max_iters: usize,
    output_residual: bool,
    input_residual: bool,
    activation_tolerance: f64,
    theta: f64,
    solver_options: SolverOptions,
}

/// Errors that can occur when validating a time-stepping config.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("newton_tolerance must be finite and positive, got {0}")]
    NewtonTolerance(f64),

    #[error("newton_max_iters must be at least 1")]
    NewtonMaxIters,

    #[error("activation_tolerance must be finite and non-negative, got {0}")]
    ActivationTolerance(f64),

    #[error("theta must lie in [0, 1], got {0}")]
    Theta(f64),
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(NewtonMode::NonLinear, 1e-6, 50).unwrap()
    }
}

impl Config {
    /// Creates a config with the given Newton settings and default
    /// activation tolerance, θ, and solver options.
    ///
    /// # Errors
    ///
    /// Returns an error if the tolerance is not finite and positive or if
    /// `newton_max_iters` is zero.
    pub fn new(
        newton_mode: NewtonMode,
        newton_tolerance: f64,
        newton_max_iters: usize,
    ) -> Result<Self, ConfigError> {
        if !newton_tolerance.is_finite() || newton_tolerance <= 0.0 {
            return Err(ConfigError::NewtonTolerance(newton_tolerance));
        }
        if newton_max_iters == 0 {
            return Err(ConfigError::NewtonMaxIters);
        }

        Ok(Self {
            newton_mode,
            newton_tolerance,
            newton_max_iters,
            output_residual: false,
            input_residual: false,
            activation_tolerance: DEFAULT_TOLERANCE,
            theta: DEFAULT_THETA,
            solver_options: SolverOptions::default(),
        })
    }

    /// Creates a config that runs one cycle per step.
    #[must_use]
    pub fn linear() -> Self {
        Self {
            newton_mode: NewtonMode::Linear,
            ..Self::default()
        }
    }

    /// Sets the activation tolerance used by index-set updates.
    ///
    /// # Errors
    ///
    /// Returns an error if `tolerance` is negative or not finite.
    pub fn with_activation_tolerance(mut self, tolerance: f64) -> Result<Self, ConfigError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::ActivationTolerance(tolerance));
        }
        self.activation_tolerance = tolerance;
        Ok(self)
    }

    /// Sets θ for every integrator.
    ///
    /// # Errors
    ///
    /// Returns an error if `theta` is outside `[0, 1]`.
    pub fn with_theta(mut self, theta: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&theta) {
            return Err(ConfigError::Theta(theta));
        }
        self.theta = theta;
        Ok(self)
    }

    /// Enables the output (`y`) and input (`λ`) Newton residuals.
    #[must_use]
    pub fn with_residuals(mut self, output: bool, input: bool) -> Self {
        self.output_residual = output;
        self.input_residual = input;
        self
    }

    #[must_use]
    pub fn with_solver_options(mut self, options: SolverOptions) -> Self {
        self.solver_options = options;
        self
    }

    #[must_use]
    pub fn newton_mode(&self) -> NewtonMode {
        self.newton_mode
    }

    #[must_use]
    pub fn newton_tolerance(&self) -> f64 {
        self.newton_tolerance
    }

    /// Returns the maximum number of Newton iterations per step.
    #[must_use]
    pub fn newton_max_iters(&self) -> usize {
        self.newton_max_iters
    }

    #[must_use]
    pub fn output_residual(&self) -> bool {
        self.output_residual
    }

    #[must_use]
    pub fn input_residual(&self) -> bool {
        self.input_residual
    }

    #[must_use]
    pub fn activation_tolerance(&self) -> f64 {
        self.activation_tolerance
    }

    #[must_use]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    #[must_use]
    pub fn solver_options(&self) -> &SolverOptions {
        &self.solver_options
    }
}
