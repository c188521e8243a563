use impulse_core::{
    Lu, Matrix, Vector,
    model::{Dynamics, SystemId, SystemStore},
};

use crate::assembly::{AssemblyError, IterationMatrix};

use super::Error;

/// Factored mass matrices of Lagrangian systems, indexed by system.
///
/// Serves as the operator `W = M` for impact and acceleration problems.
#[derive(Debug, Clone)]
pub struct MassMatrices {
    factors: Vec<Lu>,
}

impl MassMatrices {
    /// Factors the mass matrix of every system.
    ///
    /// # Errors
    ///
    /// Returns an error if a system is first-order or its mass matrix is
    /// singular.
    pub fn new(systems: &SystemStore) -> Result<Self, Error> {
        let factors = systems
            .iter()
            .map(|(id, system)| match system.dynamics() {
                Dynamics::LagrangianLinear { mass, .. } => {
                    Lu::factor(mass).map_err(|source| Error::Mass { system: id, source })
                }
                _ => Err(Error::FirstOrderSystem(id)),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { factors })
    }

    /// Returns `M⁻¹ rhs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the system is unknown or the sizes disagree.
    pub fn solve(&self, system: SystemId, rhs: &Vector) -> Result<Vector, Error> {
        let lu = self
            .factors
            .get(system.index())
            .ok_or(AssemblyError::MissingOperator(system))?;
        lu.solve(rhs).map_err(|source| Error::Mass { system, source })
    }

    /// Computes `a_free = M⁻¹ (f − C v − K q)` for every system and stores
    /// it as both the free and the working acceleration.
    ///
    /// Free positions and velocities are set to the working ones and the
    /// acceleration-level inputs are cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if a mass solve fails.
    pub fn free_accelerations(&self, systems: &mut SystemStore) -> Result<(), Error> {
        for (id, system) in systems.iter_mut() {
            let Dynamics::LagrangianLinear {
                stiffness,
                damping,
                force,
                ..
            } = system.dynamics()
            else {
                return Err(Error::FirstOrderSystem(id));
            };
            let state = system.state();
            let rhs = force - &stiffness.dot(&state.position) - &damping.dot(&state.velocity);
            let acceleration = self.solve(id, &rhs)?;

            let mut free = state.clone();
            free.acceleration.assign(&acceleration);
            *system.free_state_mut() = free;
            system.state_mut().acceleration = acceleration;
            system.reset_input(2);
        }
        Ok(())
    }
}

impl IterationMatrix for MassMatrices {
    fn w_solve(&self, system: SystemId, rhs: &Matrix) -> Result<Matrix, AssemblyError> {
        let lu = self
            .factors
            .get(system.index())
            .ok_or(AssemblyError::MissingOperator(system))?;
        lu.solve_matrix(rhs)
            .map_err(|source| AssemblyError::Operator { system, source })
    }

    fn reaction_scale(&self, _system: SystemId) -> f64 {
        1.0
    }
}
