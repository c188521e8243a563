use impulse_core::model::{Interaction, SystemStore};

use super::StepReport;

/// Event emitted after each committed step.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    /// The step number, starting at 1.
    pub step: usize,

    pub report: &'a StepReport,

    /// Systems after the events of the step were processed.
    pub systems: &'a SystemStore,

    pub interactions: &'a [Interaction],
}
