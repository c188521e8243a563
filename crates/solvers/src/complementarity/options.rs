use thiserror::Error;

/// Immutable options passed to every complementarity solve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverOptions {
    max_iters: usize,
    tolerance: f64,
    warm_start: bool,
}

/// Errors that can occur when validating solver options.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OptionsError {
    #[error("max_iters must be positive")]
    MaxIters,

    #[error("tolerance must be finite and non-negative")]
    Tolerance,
}

impl Default for SolverOptions {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(1000, 1e-12, true).unwrap()
    }
}

impl SolverOptions {
    /// Creates validated solver options.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_iters` is zero or `tolerance` is negative or
    /// non-finite.
    pub fn new(max_iters: usize, tolerance: f64, warm_start: bool) -> Result<Self, OptionsError> {
        if max_iters == 0 {
            return Err(OptionsError::MaxIters);
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(OptionsError::Tolerance);
        }

        Ok(Self {
            max_iters,
            tolerance,
            warm_start,
        })
    }

    /// Returns the maximum number of sweeps.
    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Returns the tolerance on the natural-map residual.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns whether solves start from the previous step's reactions.
    #[must_use]
    pub fn warm_start(&self) -> bool {
        self.warm_start
    }
}
