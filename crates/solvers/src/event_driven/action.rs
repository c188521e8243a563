/// Control actions supported by event-driven simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the run after the current step.
    StopEarly,
}
