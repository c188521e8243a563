use crate::assembly::SolveReport;

/// Whether the Newton loop of a step met its tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum StepStatus {
    /// All enabled residuals fell below tolerance, or the step ran in
    /// linear mode.
    Converged,

    /// The iteration limit was reached first.
    IterationCapped,
}

/// Max-norm residuals of the last Newton iteration.
///
/// Output and input residuals stay at zero unless enabled in the config.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct Residuals {
    pub state: f64,
    pub output: f64,
    pub input: f64,
}

impl Residuals {
    #[must_use]
    pub fn max(&self) -> f64 {
        self.state.max(self.output).max(self.input)
    }
}

/// Outcome of one step `[t_k, t_{k+1}]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// End of the step, `t_{k+1}`.
    pub time: f64,

    /// Step size.
    pub h: f64,

    pub status: StepStatus,

    /// Newton iterations performed.
    pub iterations: usize,

    pub residuals: Residuals,

    /// Last solve per reaction level, ascending.
    pub solves: Vec<(usize, SolveReport)>,
}

impl StepReport {
    #[must_use]
    pub fn converged(&self) -> bool {
        self.status == StepStatus::Converged
    }

    /// Returns `true` if every non-smooth solve of the last iteration
    /// succeeded or was skipped.
    #[must_use]
    pub fn solver_succeeded(&self) -> bool {
        self.solves
            .iter()
            .all(|(_, report)| report.status().is_none_or(|status| status.is_success()))
    }
}

/// Indicates how a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The time discretisation or horizon was exhausted.
    Complete,

    /// Stopped early due to an observer action.
    StoppedByObserver,
}

/// The result of a time-stepping run.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: Status,

    /// Number of steps committed during the run.
    pub steps: usize,

    /// Time reached.
    pub time: f64,

    /// Number of steps whose Newton loop hit the iteration limit.
    pub capped_steps: usize,
}
