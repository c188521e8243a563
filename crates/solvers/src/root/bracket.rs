use thiserror::Error;

use super::{Config, Solution, Status};

/// Side of the sign change a residual falls on.
///
/// Zero is [`Sign::Negative`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

impl Sign {
    #[must_use]
    pub fn of(value: f64) -> Self {
        if value > 0.0 {
            Self::Positive
        } else {
            Self::Negative
        }
    }
}

/// Errors raised when validating a bracket.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum BracketError {
    #[error("bracket bounds must be finite: [{0}, {1}]")]
    NonFinite(f64, f64),

    #[error("residuals must be finite: [{0}, {1}]")]
    NonFiniteResidual(f64, f64),

    #[error("no sign change in bracket, residuals [{0}, {1}]")]
    NoSignChange(f64, f64),
}

/// Bracket tracked by end sign rather than left/right order.
#[derive(Debug, Clone, Copy)]
pub(super) struct Bracket {
    positive: (f64, f64),
    negative: (f64, f64),
}

impl Bracket {
    pub(super) fn new(bounds: [f64; 2], residuals: [f64; 2]) -> Result<Self, BracketError> {
        let [a, b] = bounds;
        let [ga, gb] = residuals;
        if !a.is_finite() || !b.is_finite() {
            return Err(BracketError::NonFinite(a, b));
        }
        if ga.is_nan() || gb.is_nan() {
            return Err(BracketError::NonFiniteResidual(ga, gb));
        }

        match (Sign::of(ga), Sign::of(gb)) {
            (Sign::Positive, Sign::Negative) => Ok(Self {
                positive: (a, ga),
                negative: (b, gb),
            }),
            (Sign::Negative, Sign::Positive) => Ok(Self {
                positive: (b, gb),
                negative: (a, ga),
            }),
            _ => Err(BracketError::NoSignChange(ga, gb)),
        }
    }

    pub(super) fn midpoint(&self) -> f64 {
        0.5 * (self.positive.0 + self.negative.0)
    }

    pub(super) fn width(&self) -> f64 {
        (self.negative.0 - self.positive.0).abs()
    }

    /// Returns the bounds in ascending order.
    pub(super) fn bounds(&self) -> [f64; 2] {
        let (p, n) = (self.positive.0, self.negative.0);
        if p <= n { [p, n] } else { [n, p] }
    }

    pub(super) fn shrink(&mut self, x: f64, residual: f64, sign: Sign) {
        match sign {
            Sign::Positive => self.positive = (x, residual),
            Sign::Negative => self.negative = (x, residual),
        }
    }

    pub(super) fn is_converged(&self, config: &Config) -> bool {
        let scale = self.positive.0.abs().max(self.negative.0.abs());
        self.width() <= config.x_abs_tol() + config.x_rel_tol() * scale
    }

    pub(super) fn finish(self, status: Status, iters: usize) -> Solution {
        Solution {
            status,
            x: self.negative.0,
            residual: self.negative.1,
            bracket: self.bounds(),
            iters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn zero_counts_as_negative() {
        assert_eq!(Sign::of(0.0), Sign::Negative);
        assert_eq!(Sign::of(-0.0), Sign::Negative);
        assert_eq!(Sign::of(1e-300), Sign::Positive);
    }

    #[test]
    fn accepts_either_orientation() {
        let forward = Bracket::new([0.0, 1.0], [2.0, -1.0]).expect("should bracket");
        let reverse = Bracket::new([0.0, 1.0], [-1.0, 2.0]).expect("should bracket");

        assert_eq!(forward.bounds(), [0.0, 1.0]);
        assert_eq!(reverse.bounds(), [0.0, 1.0]);
        assert_relative_eq!(forward.finish(Status::Converged, 0).x, 1.0);
        assert_relative_eq!(reverse.finish(Status::Converged, 0).x, 0.0);
    }

    #[test]
    fn rejects_brackets_without_sign_change() {
        assert_eq!(
            Bracket::new([0.0, 1.0], [1.0, 2.0]).err(),
            Some(BracketError::NoSignChange(1.0, 2.0))
        );
        assert_eq!(
            Bracket::new([0.0, 1.0], [0.0, -2.0]).err(),
            Some(BracketError::NoSignChange(0.0, -2.0))
        );
        assert!(matches!(
            Bracket::new([f64::NAN, 1.0], [1.0, -1.0]),
            Err(BracketError::NonFinite(..))
        ));
    }

    #[test]
    fn shrink_replaces_the_matching_end() {
        let mut bracket = Bracket::new([0.0, 1.0], [1.0, -1.0]).expect("should bracket");
        bracket.shrink(0.5, 0.25, Sign::Positive);
        assert_eq!(bracket.bounds(), [0.5, 1.0]);

        bracket.shrink(0.75, -0.1, Sign::Negative);
        assert_eq!(bracket.bounds(), [0.5, 0.75]);
        assert_relative_eq!(bracket.width(), 0.25);
    }
}
