//! Dynamical systems, relations, non-smooth laws, and interactions.
//!
//! A [`Model`] owns every dynamical system (in a [`SystemStore`]) and every
//! [`Interaction`] over a time horizon. Interactions reference systems by
//! [`SystemId`] and are validated against them on insertion, so a model
//! that builds is dimensionally consistent.

mod error;
mod interaction;
mod law;
mod relation;
mod store;
mod system;

pub use error::ModelError;
pub use interaction::{Interaction, InteractionId, Levels};
pub use law::NonSmoothLaw;
pub use relation::Relation;
pub use store::{SystemId, SystemStore};
pub use system::{
    DEFAULT_HISTORY_DEPTH, DynamicalSystem, Dynamics, LEVELS, State, SystemKind, VectorField,
    VectorFieldJacobian,
};

/// A non-smooth dynamical system: systems, interactions, and a horizon.
#[derive(Debug, Clone)]
pub struct Model {
    t0: f64,
    t_final: f64,
    systems: SystemStore,
    interactions: Vec<Interaction>,
}

impl Model {
    /// Creates an empty model over `[t0, t_final]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the horizon is not finite and ordered.
    pub fn new(t0: f64, t_final: f64) -> Result<Self, ModelError> {
        if !t0.is_finite() || !t_final.is_finite() || t_final <= t0 {
            return Err(ModelError::Horizon { t0, t_final });
        }
        Ok(Self {
            t0,
            t_final,
            systems: SystemStore::new(),
            interactions: Vec::new(),
        })
    }

    /// Adds a dynamical system.
    pub fn add_system(&mut self, system: DynamicalSystem) -> SystemId {
        self.systems.insert(system)
    }

    /// Adds an interaction after checking it against the coupled systems.
    ///
    /// # Errors
    ///
    /// Returns an error if a coupled system is unknown, has a kind that does
    /// not match the relation, or if the relation width differs from the
    /// stacked system dimensions.
    pub fn add_interaction(
        &mut self,
        interaction: Interaction,
    ) -> Result<InteractionId, ModelError> {
        let relation = interaction.relation();

        let mut width = 0;
        for &id in interaction.systems() {
            let system = self.systems.get(id).ok_or(ModelError::UnknownSystem(id))?;
            if system.kind() != relation.kind() {
                return Err(ModelError::KindMismatch(id));
            }
            width += system.dim();
        }

        if relation.cols() != width {
            return Err(ModelError::RelationWidth {
                relation: relation.cols(),
                systems: width,
            });
        }

        self.interactions.push(interaction);
        Ok(InteractionId(self.interactions.len() - 1))
    }

    /// Returns `(t0, t_final)`.
    #[must_use]
    pub fn horizon(&self) -> (f64, f64) {
        (self.t0, self.t_final)
    }

    #[must_use]
    pub fn systems(&self) -> &SystemStore {
        &self.systems
    }

    pub fn systems_mut(&mut self) -> &mut SystemStore {
        &mut self.systems
    }

    #[must_use]
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn interactions_mut(&mut self) -> &mut [Interaction] {
        &mut self.interactions
    }

    #[must_use]
    pub fn interaction(&self, id: InteractionId) -> Option<&Interaction> {
        self.interactions.get(id.0)
    }

    /// Iterates over interaction handles in declaration order.
    pub fn interaction_ids(&self) -> impl Iterator<Item = InteractionId> {
        (0..self.interactions.len()).map(InteractionId)
    }

    /// Splits the model into its system store and interactions for
    /// simultaneous mutation.
    pub fn parts_mut(&mut self) -> (&mut SystemStore, &mut [Interaction]) {
        (&mut self.systems, &mut self.interactions)
    }
}
