//! Time discretisation: the ordered instants bounding simulation steps.

use thiserror::Error;

/// Errors that can occur when building a time discretisation.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum TimeError {
    #[error("initial time must be finite, got {0}")]
    InitialTime(f64),

    #[error("time step must be finite and positive, got {0}")]
    Step(f64),

    #[error("at least two instants are required, got {0}")]
    TooFewInstants(usize),

    #[error("instants must be finite and strictly increasing, failed at index {index}")]
    NotIncreasing { index: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum Grid {
    Uniform { t0: f64, h: f64 },
    Instants(Vec<f64>),
}

/// An ordered, possibly non-uniform sequence of instants `t_0 < t_1 < ...`.
///
/// The discretisation keeps a cursor `k` on its current instant. A uniform
/// grid never runs out of instants; a grid built from explicit instants
/// reports no next time once the cursor reaches the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeDiscretisation {
    grid: Grid,
    k: usize,
}

impl TimeDiscretisation {
    /// Creates a uniform grid `t_k = t0 + k * h`.
    ///
    /// # Errors
    ///
    /// Returns an error if `t0` is not finite or `h` is not finite and positive.
    pub fn uniform(t0: f64, h: f64) -> Result<Self, TimeError> {
        if !t0.is_finite() {
            return Err(TimeError::InitialTime(t0));
        }
        if !h.is_finite() || h <= 0.0 {
            return Err(TimeError::Step(h));
        }
        Ok(Self {
            grid: Grid::Uniform { t0, h },
            k: 0,
        })
    }

    /// Creates a grid from explicit instants.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two instants are given, or if they are
    /// not finite and strictly increasing.
    pub fn from_instants(instants: Vec<f64>) -> Result<Self, TimeError> {
        if instants.len() < 2 {
            return Err(TimeError::TooFewInstants(instants.len()));
        }
        if let Some(index) = instants.iter().position(|t| !t.is_finite()) {
            return Err(TimeError::NotIncreasing { index });
        }
        if let Some(index) = instants.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(TimeError::NotIncreasing { index: index + 1 });
        }
        Ok(Self {
            grid: Grid::Instants(instants),
            k: 0,
        })
    }

    /// Returns the `k`-th instant, if it exists.
    #[must_use]
    pub fn instant(&self, k: usize) -> Option<f64> {
        match &self.grid {
            #[allow(clippy::cast_precision_loss)]
            Grid::Uniform { t0, h } => Some(t0 + k as f64 * h),
            Grid::Instants(instants) => instants.get(k).copied(),
        }
    }

    /// Returns the first instant.
    #[must_use]
    pub fn initial_time(&self) -> f64 {
        match &self.grid {
            Grid::Uniform { t0, .. } => *t0,
            Grid::Instants(instants) => instants[0],
        }
    }

    /// Returns the index of the current instant.
    #[must_use]
    pub fn current_step(&self) -> usize {
        self.k
    }

    /// Returns the current instant `t_k`.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        // The cursor only advances onto existing instants.
        self.instant(self.k).unwrap_or_else(|| self.initial_time())
    }

    /// Returns `t_{k+1}`, or `None` once the grid is exhausted.
    #[must_use]
    pub fn next_time(&self) -> Option<f64> {
        self.instant(self.k + 1)
    }

    /// Returns `t_{k+1} - t_k`, or `None` once the grid is exhausted.
    #[must_use]
    pub fn time_step(&self) -> Option<f64> {
        self.next_time().map(|next| next - self.current_time())
    }

    /// Moves the cursor to the next instant.
    ///
    /// Returns `false` and leaves the cursor unchanged if there is no next
    /// instant.
    pub fn increment(&mut self) -> bool {
        if self.next_time().is_some() {
            self.k += 1;
            true
        } else {
            false
        }
    }
}
