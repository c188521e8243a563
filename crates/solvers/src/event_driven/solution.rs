use crate::assembly::SolveReport;

/// Outcome of one step between two events.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Time reached by the smooth integration.
    pub time: f64,

    /// `true` if an event function crossed zero before the next scheduled
    /// event and the step was cut at the located root.
    pub root_found: bool,

    /// Constant-acceleration intervals integrated.
    pub substeps: usize,

    /// Impacts processed during the step.
    pub impacts: usize,

    /// Last impulse solve, if an impact occurred.
    pub impulse: Option<SolveReport>,
}

/// Indicates how a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The time discretisation or horizon was exhausted.
    Complete,

    /// Stopped early due to an observer action.
    StoppedByObserver,
}

/// The result of an event-driven run.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: Status,

    /// Number of steps committed during the run.
    pub steps: usize,

    /// Time reached.
    pub time: f64,

    /// Total impacts processed.
    pub impacts: usize,
}
