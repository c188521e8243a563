/// Control actions supported by time-stepping simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the run after the current step.
    StopEarly,
}
