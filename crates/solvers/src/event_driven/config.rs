use impulse_core::topology::DEFAULT_TOLERANCE;
use thiserror::Error;

use crate::{complementarity::SolverOptions, root};

/// Configuration for event-driven simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    substeps: usize,
    tolerance: f64,
    root: root::Config,
    solver_options: SolverOptions,
}

/// Errors that can occur when validating an event-driven config.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("substeps must be at least 1")]
    Substeps,

    #[error("tolerance must be finite and non-negative, got {0}")]
    Tolerance(f64),
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(10, DEFAULT_TOLERANCE).unwrap()
    }
}

impl Config {
    /// Creates a config with default root-finding and solver options.
    ///
    /// `substeps` is the number of constant-acceleration intervals each
    /// step between two events is split into. `tolerance` is used for
    /// activation, the approach test before an impact, and the
    /// detachment test at acceleration level.
    ///
    /// # Errors
    ///
    /// Returns an error if `substeps` is zero or `tolerance` is negative or
    /// non-finite.
    pub fn new(substeps: usize, tolerance: f64) -> Result<Self, ConfigError> {
        if substeps == 0 {
            return Err(ConfigError::Substeps);
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Tolerance(tolerance));
        }

        Ok(Self {
            substeps,
            tolerance,
            root: root::Config::default(),
            solver_options: SolverOptions::default(),
        })
    }

    /// Replaces the bisection settings used to locate events.
    #[must_use]
    pub fn with_root_config(mut self, root: root::Config) -> Self {
        self.root = root;
        self
    }

    #[must_use]
    pub fn with_solver_options(mut self, options: SolverOptions) -> Self {
        self.solver_options = options;
        self
    }

    #[must_use]
    pub fn substeps(&self) -> usize {
        self.substeps
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    #[must_use]
    pub fn root(&self) -> &root::Config {
        &self.root
    }

    #[must_use]
    pub fn solver_options(&self) -> &SolverOptions {
        &self.solver_options
    }
}
