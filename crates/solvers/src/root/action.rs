use super::Sign;

/// Control actions supported by the bisection solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the solver early and return the current bracket.
    StopEarly,

    /// Assume a residual sign for the bracket update.
    AssumeResidualSign(Sign),
}

impl Action {
    /// Assumes a positive residual sign for the bracket update.
    #[must_use]
    pub fn assume_positive() -> Self {
        Self::AssumeResidualSign(Sign::Positive)
    }

    /// Assumes a non-positive residual sign for the bracket update.
    #[must_use]
    pub fn assume_negative() -> Self {
        Self::AssumeResidualSign(Sign::Negative)
    }
}
