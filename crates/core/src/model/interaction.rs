use crate::linalg::Vector;

use super::{LEVELS, ModelError, NonSmoothLaw, Relation, SystemId, SystemStore};

/// Handle to an interaction. It doubles as the vertex index in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InteractionId(pub(crate) usize);

impl InteractionId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Derivative levels an interaction takes part in.
///
/// Outputs `y[lower_output..=upper_output]` are computed from system states;
/// reactions `λ[lower_input..=upper_input]` are fed back as system inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct Levels {
    pub lower_output: usize,
    pub upper_output: usize,
    pub lower_input: usize,
    pub upper_input: usize,
}

/// Coupling of one or two dynamical systems through a relation and a
/// non-smooth law.
///
/// Outputs `y` and reactions `λ` are stored for every derivative level,
/// together with their values at the last committed step. The
/// velocity-level output just before an impact is kept apart as the
/// reference of the Newton impact law.
#[derive(Debug, Clone)]
pub struct Interaction {
    systems: Vec<SystemId>,
    relation: Relation,
    law: NonSmoothLaw,
    levels: Levels,
    y: Vec<Vector>,
    lambda: Vec<Vector>,
    y_old: Vec<Vector>,
    lambda_old: Vec<Vector>,
    pre_impact: Vector,
}

impl Interaction {
    /// Creates an interaction between one or two systems.
    ///
    /// # Errors
    ///
    /// Returns an error if the system list is empty, has more than two
    /// entries, repeats a system, or if the relation's row count differs
    /// from the law size.
    pub fn new(
        systems: Vec<SystemId>,
        relation: Relation,
        law: NonSmoothLaw,
    ) -> Result<Self, ModelError> {
        let distinct = systems.len() != 2 || systems[0] != systems[1];
        if systems.is_empty() || systems.len() > 2 || !distinct {
            return Err(ModelError::SystemCount(systems));
        }
        if relation.rows() != law.size() {
            return Err(ModelError::LawSize {
                relation: relation.rows(),
                law: law.size(),
            });
        }

        let size = law.size();
        let zeros = vec![Vector::zeros(size); LEVELS];
        Ok(Self {
            systems,
            relation,
            law,
            levels: Levels::default(),
            y: zeros.clone(),
            lambda: zeros.clone(),
            y_old: zeros.clone(),
            lambda_old: zeros,
            pre_impact: Vector::zeros(size),
        })
    }

    #[must_use]
    pub fn systems(&self) -> &[SystemId] {
        &self.systems
    }

    #[must_use]
    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    #[must_use]
    pub fn law(&self) -> &NonSmoothLaw {
        &self.law
    }

    /// Returns the number of constraint rows.
    #[must_use]
    pub fn size(&self) -> usize {
        self.law.size()
    }

    #[must_use]
    pub fn levels(&self) -> Levels {
        self.levels
    }

    /// Sets the interaction levels. Simulations call this once during
    /// initialization.
    pub fn set_levels(&mut self, levels: Levels) {
        self.levels = levels;
    }

    /// Returns the output at `level`.
    ///
    /// # Panics
    ///
    /// Panics if `level >= LEVELS`.
    #[must_use]
    pub fn y(&self, level: usize) -> &Vector {
        &self.y[level]
    }

    pub fn y_mut(&mut self, level: usize) -> &mut Vector {
        &mut self.y[level]
    }

    /// Returns the reaction at `level`.
    ///
    /// # Panics
    ///
    /// Panics if `level >= LEVELS`.
    #[must_use]
    pub fn lambda(&self, level: usize) -> &Vector {
        &self.lambda[level]
    }

    pub fn lambda_mut(&mut self, level: usize) -> &mut Vector {
        &mut self.lambda[level]
    }

    /// Returns the output at `level` from the last committed step.
    #[must_use]
    pub fn y_old(&self, level: usize) -> &Vector {
        &self.y_old[level]
    }

    /// Returns the reaction at `level` from the last committed step.
    #[must_use]
    pub fn lambda_old(&self, level: usize) -> &Vector {
        &self.lambda_old[level]
    }

    /// Returns the velocity-level output recorded before the last impact.
    #[must_use]
    pub fn pre_impact(&self) -> &Vector {
        &self.pre_impact
    }

    /// Records the current `y[1]` as the pre-impact velocity.
    pub fn record_pre_impact(&mut self) {
        self.pre_impact.assign(&self.y[1]);
    }

    /// Zeroes the reaction at `level`.
    pub fn reset_lambda(&mut self, level: usize) {
        if let Some(lambda) = self.lambda.get_mut(level) {
            lambda.fill(0.0);
        }
    }

    /// Saves outputs and reactions as the committed values.
    pub fn swap_in_memory(&mut self) {
        self.y_old.clone_from(&self.y);
        self.lambda_old.clone_from(&self.lambda);
    }

    /// Restores outputs and reactions from the committed values.
    pub fn restore_memory(&mut self) {
        self.y.clone_from(&self.y_old);
        self.lambda.clone_from(&self.lambda_old);
    }

    /// Returns `(system, offset, dim)` for each coupled system, where
    /// `offset` is the first column of the system in the relation operators.
    #[must_use]
    pub fn coordinates(&self, systems: &SystemStore) -> Vec<(SystemId, usize, usize)> {
        let mut offset = 0;
        self.systems
            .iter()
            .map(|&id| {
                let dim = systems[id].dim();
                let entry = (id, offset, dim);
                offset += dim;
                entry
            })
            .collect()
    }

    /// Recomputes `y[level]` from the working states of the coupled systems.
    pub fn compute_output(&mut self, _time: f64, level: usize, systems: &SystemStore) {
        let y = self.output_from(systems, level, false);
        self.y[level] = y;
    }

    /// Computes the output at `level` from the free states, without any
    /// reaction contribution.
    #[must_use]
    pub fn compute_free_output(&self, level: usize, systems: &SystemStore) -> Vector {
        self.output_from(systems, level, true)
    }

    /// Adds the contribution of `λ[level]` to the coupled systems' inputs.
    pub fn compute_input(&self, _time: f64, level: usize, systems: &mut SystemStore) {
        let lambda = &self.lambda[level];
        for (id, offset, dim) in self.coordinates(systems) {
            let contribution = self.relation.input_block(offset, dim).dot(lambda);
            *systems[id].input_mut(level) += &contribution;
        }
    }

    fn output_from(&self, systems: &SystemStore, level: usize, free: bool) -> Vector {
        match &self.relation {
            Relation::LagrangianLinear { h, b } => {
                let mut y = h.dot(&self.stacked(systems, level, free));
                if level == 0 {
                    y += b;
                }
                y
            }
            Relation::FirstOrderLinear { c, d, e, .. } if level == 0 => {
                let mut y = c.dot(&self.stacked(systems, 0, free)) + e;
                if !free {
                    y += &d.dot(&self.lambda[0]);
                }
                y
            }
            Relation::FirstOrderLinear { .. } => Vector::zeros(self.size()),
        }
    }

    fn stacked(&self, systems: &SystemStore, level: usize, free: bool) -> Vector {
        let mut values = Vec::new();
        for &id in &self.systems {
            let system = &systems[id];
            let state = if free {
                system.free_state()
            } else {
                system.state()
            };
            values.extend(state.level(level).iter().copied());
        }
        Vector::from(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ndarray::array;

    use crate::model::DynamicalSystem;

    fn two_particles() -> (SystemStore, SystemId, SystemId) {
        let mut store = SystemStore::new();
        let a = store.insert(
            DynamicalSystem::lagrangian(array![[1.0]], array![0.0], array![0.0], array![1.0])
                .expect("valid particle"),
        );
        let b = store.insert(
            DynamicalSystem::lagrangian(array![[2.0]], array![0.0], array![1.5], array![-1.0])
                .expect("valid particle"),
        );
        (store, a, b)
    }

    #[test]
    fn gap_and_relative_velocity_between_two_particles() {
        let (store, a, b) = two_particles();
        let relation = Relation::lagrangian_linear(array![[-1.0, 1.0]], array![-0.5])
            .expect("valid relation");
        let law = NonSmoothLaw::newton_impact(0.0).expect("valid law");
        let mut interaction =
            Interaction::new(vec![a, b], relation, law).expect("valid interaction");

        interaction.compute_output(0.0, 0, &store);
        interaction.compute_output(0.0, 1, &store);

        assert_relative_eq!(interaction.y(0)[0], 1.0);
        assert_relative_eq!(interaction.y(1)[0], -2.0);
    }

    #[test]
    fn reaction_is_distributed_through_the_transpose() {
        let (mut store, a, b) = two_particles();
        let relation = Relation::lagrangian(array![[-1.0, 1.0]]);
        let law = NonSmoothLaw::complementarity(1).expect("valid law");
        let mut interaction =
            Interaction::new(vec![a, b], relation, law).expect("valid interaction");

        interaction.lambda_mut(1)[0] = 3.0;
        interaction.compute_input(0.0, 1, &mut store);

        assert_relative_eq!(store[a].input(1)[0], -3.0);
        assert_relative_eq!(store[b].input(1)[0], 3.0);
    }

    #[test]
    fn first_order_output_includes_feedthrough() {
        let mut store = SystemStore::new();
        let id = store.insert(
            DynamicalSystem::first_order_linear(array![[0.0]], array![0.0], array![2.0])
                .expect("valid system"),
        );
        let relation = Relation::first_order_linear(
            array![[3.0]],
            array![[0.5]],
            array![[1.0]],
            array![1.0],
        )
        .expect("valid relation");
        let law = NonSmoothLaw::symmetric_relay(1, 1.0).expect("valid law");
        let mut interaction =
            Interaction::new(vec![id], relation, law).expect("valid interaction");

        interaction.lambda_mut(0)[0] = 2.0;
        interaction.compute_output(0.0, 0, &store);

        assert_relative_eq!(interaction.y(0)[0], 8.0);
        assert_relative_eq!(interaction.compute_free_output(0, &store)[0], 7.0);
    }

    #[test]
    fn pre_impact_velocity_survives_a_memory_swap() {
        let (store, a, b) = two_particles();
        let relation = Relation::lagrangian(array![[-1.0, 1.0]]);
        let law = NonSmoothLaw::newton_impact(0.5).expect("valid law");
        let mut interaction =
            Interaction::new(vec![a, b], relation, law).expect("valid interaction");

        interaction.compute_output(0.0, 1, &store);
        interaction.record_pre_impact();
        interaction.y_mut(1)[0] = 1.0;
        interaction.swap_in_memory();

        assert_relative_eq!(interaction.pre_impact()[0], -2.0);
        assert_relative_eq!(interaction.y_old(1)[0], 1.0);
    }

    #[test]
    fn rejects_repeated_systems_and_size_mismatch() {
        let (_, a, _) = two_particles();
        let law = NonSmoothLaw::complementarity(1).expect("valid law");

        let repeated = Relation::lagrangian(array![[1.0, -1.0]]);
        let result = Interaction::new(vec![a, a], repeated, law.clone());
        assert!(matches!(result, Err(ModelError::SystemCount(_))));

        let tall = Relation::lagrangian(array![[1.0], [2.0]]);
        let result = Interaction::new(vec![a], tall, law);
        assert!(matches!(
            result,
            Err(ModelError::LawSize {
                relation: 2,
                law: 1
            })
        ));
    }
}
