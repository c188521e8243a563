use impulse_core::{Vector, model::Interaction, norm_inf};

/// Outputs and reactions of every interaction at one Newton iterate.
pub(super) struct Iterate {
    outputs: Vec<Vec<Vector>>,
    inputs: Vec<Vec<Vector>>,
}

impl Iterate {
    pub(super) fn capture(interactions: &[Interaction]) -> Self {
        let outputs = interactions
            .iter()
            .map(|interaction| {
                let levels = interaction.levels();
                (levels.lower_output..=levels.upper_output)
                    .map(|level| interaction.y(level).clone())
                    .collect()
            })
            .collect();
        let inputs = interactions
            .iter()
            .map(|interaction| {
                let levels = interaction.levels();
                (levels.lower_input..=levels.upper_input)
                    .map(|level| interaction.lambda(level).clone())
                    .collect()
            })
            .collect();
        Self { outputs, inputs }
    }

    /// Largest change of any output since the capture.
    pub(super) fn output_change(&self, interactions: &[Interaction]) -> f64 {
        change(&self.outputs, interactions, |interaction, offset| {
            interaction.y(interaction.levels().lower_output + offset)
        })
    }

    /// Largest change of any reaction since the capture.
    pub(super) fn input_change(&self, interactions: &[Interaction]) -> f64 {
        change(&self.inputs, interactions, |interaction, offset| {
            interaction.lambda(interaction.levels().lower_input + offset)
        })
    }
}

fn change<'a, F>(captured: &[Vec<Vector>], interactions: &'a [Interaction], current: F) -> f64
where
    F: Fn(&'a Interaction, usize) -> &'a Vector,
{
    captured
        .iter()
        .zip(interactions)
        .flat_map(|(levels, interaction)| {
            let current = &current;
            levels
                .iter()
                .enumerate()
                .map(move |(offset, old)| norm_inf(&(current(interaction, offset) - old)))
        })
        .fold(0.0, f64::max)
}
