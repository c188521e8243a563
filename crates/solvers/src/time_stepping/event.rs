use impulse_core::model::{Interaction, SystemStore};

use super::StepReport;

/// Event emitted after each committed step.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    /// The step number, starting at 1.
    pub step: usize,

    /// Report of the committed step.
    pub report: &'a StepReport,

    /// Systems at the end of the step.
    pub systems: &'a SystemStore,

    /// Interactions at the end of the step.
    pub interactions: &'a [Interaction],
}
