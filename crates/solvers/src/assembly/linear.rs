use impulse_core::{
    Matrix, Vector,
    model::{Interaction, InteractionId, SystemId, SystemStore},
    topology::Topology,
};
use ndarray::s;

use crate::complementarity::{
    BoxedProblem, FrictionCone, NonSmoothSolver, SolverOptions, SolverOutput, SolverStatus,
};

use super::{AssemblyError, Blocks, Coupling, IterationMatrix, OsnsMatrix};

/// Read-only inputs shared by every assembly of one step.
#[derive(Clone, Copy)]
pub struct Assembly<'a> {
    pub topology: &'a Topology,
    pub systems: &'a SystemStore,
    pub interactions: &'a [Interaction],
    pub operators: &'a dyn IterationMatrix,
}

/// Outcome of one [`LinearOsns::compute`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolveReport {
    /// The index set was empty; no problem was built.
    Skipped,
    /// The problem of the given size was handed to the solver.
    Solved { size: usize, status: SolverStatus },
}

impl SolveReport {
    /// Returns the solver status, if a solve happened.
    #[must_use]
    pub fn status(&self) -> Option<SolverStatus> {
        match self {
            Self::Skipped => None,
            Self::Solved { status, .. } => Some(*status),
        }
    }
}

/// The linear one-step non-smooth problem at one derivative level.
///
/// Built over index set `level`, restricted to interactions whose input
/// levels include `level`.
#[derive(Debug, Clone)]
pub struct LinearOsns {
    level: usize,
    matrix: OsnsMatrix,
    generation: Option<u64>,
    q: Vector,
    lower: Vector,
    upper: Vector,
    initial: Vector,
    cones: Vec<FrictionCone>,
    output: Option<SolverOutput>,
}

impl LinearOsns {
    #[must_use]
    pub fn new(level: usize) -> Self {
        Self {
            level,
            matrix: OsnsMatrix::new(),
            generation: None,
            q: Vector::zeros(0),
            lower: Vector::zeros(0),
            upper: Vector::zeros(0),
            initial: Vector::zeros(0),
            cones: Vec::new(),
            output: None,
        }
    }

    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns the size of the last assembled problem.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.matrix.dim()
    }

    #[must_use]
    pub fn matrix(&self) -> &OsnsMatrix {
        &self.matrix
    }

    #[must_use]
    pub fn q(&self) -> &Vector {
        &self.q
    }

    /// Returns the friction cones of the last assembled problem.
    #[must_use]
    pub fn cones(&self) -> &[FrictionCone] {
        &self.cones
    }

    /// Returns the last solver output, if any.
    #[must_use]
    pub fn output(&self) -> Option<&SolverOutput> {
        self.output.as_ref()
    }

    /// Returns the absolute position of an interaction in the problem.
    #[must_use]
    pub fn absolute_position(&self, id: InteractionId) -> Option<usize> {
        self.matrix.position(id)
    }

    /// Computes block operators and `q`, then fills the block matrix.
    ///
    /// Positions are recomputed when the index set's generation changed or
    /// `force_rebuild` is set. Returns the problem size.
    ///
    /// # Errors
    ///
    /// Returns an error if an operator cannot be applied or a block has the
    /// wrong shape.
    pub fn pre_compute(
        &mut self,
        assembly: &Assembly<'_>,
        options: &SolverOptions,
        force_rebuild: bool,
    ) -> Result<usize, AssemblyError> {
        let level = self.level;
        let interactions = assembly.interactions;
        let index_set = assembly.topology.index_set(level);

        let generation = index_set.generation();
        let stale = self.generation != Some(generation);
        if force_rebuild || stale {
            let members = index_set.iter().filter_map(|id| {
                let interaction = interactions.get(id.index())?;
                let levels = interaction.levels();
                (levels.lower_input..=levels.upper_input)
                    .contains(&level)
                    .then(|| (id, interaction.size()))
            });
            self.matrix.update_size_and_positions(members);
            self.generation = Some(generation);
        }

        let blocks = self.blocks(assembly)?;
        self.matrix.fill(&blocks, force_rebuild || stale)?;
        self.build_vectors(assembly, options);

        Ok(self.matrix.dim())
    }

    /// Hands `(M, q)` to the solver. A failed solve is reported, never
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the assembled problem is malformed.
    pub fn compute(
        &mut self,
        time: f64,
        solver: &dyn NonSmoothSolver,
        options: &SolverOptions,
    ) -> Result<SolveReport, AssemblyError> {
        let size = self.matrix.dim();
        if size == 0 {
            self.output = None;
            return Ok(SolveReport::Skipped);
        }

        let problem = BoxedProblem::new(
            self.matrix.matrix().clone(),
            self.q.clone(),
            self.lower.clone(),
            self.upper.clone(),
        )?
        .with_initial_guess(self.initial.clone())?
        .with_friction_cones(self.cones.clone())?;

        let output = solver.solve(&problem, options);
        let status = output.status;
        if !status.is_success() {
            tracing::warn!(
                level = self.level,
                time,
                code = status.code(),
                ?status,
                "non-smooth solver failed"
            );
        }
        self.output = Some(output);

        Ok(SolveReport::Solved { size, status })
    }

    /// Scatters `z → λ[level]` and `w → y[level]` at each absolute position.
    ///
    /// At the velocity level the Newton impact shift is removed from the
    /// output, `y = w − e · ẏ⁻` with the recorded pre-impact velocity.
    pub fn post_compute(&self, interactions: &mut [Interaction]) {
        let Some(output) = &self.output else {
            return;
        };
        let level = self.level;

        for &id in self.matrix.members() {
            let (Some(pos), Some(interaction)) =
                (self.matrix.position(id), interactions.get_mut(id.index()))
            else {
                continue;
            };
            let size = interaction.size();

            interaction
                .lambda_mut(level)
                .assign(&output.z.slice(s![pos..pos + size]));

            let mut y = output.w.slice(s![pos..pos + size]).to_owned();
            if level == 1 {
                if let Some(shift) = interaction.law().impact_shift(interaction.pre_impact()) {
                    y -= &shift;
                }
            }
            interaction.y_mut(level).assign(&y);
        }
    }

    fn blocks(&self, assembly: &Assembly<'_>) -> Result<Blocks, AssemblyError> {
        let systems = assembly.systems;
        let operators = assembly.operators;
        let mut blocks = Blocks::default();

        for &id in self.matrix.members() {
            let interaction = &assembly.interactions[id.index()];
            let relation = interaction.relation();
            let size = interaction.size();

            let mut diagonal = relation
                .feedthrough()
                .cloned()
                .unwrap_or_else(|| Matrix::zeros((size, size)));
            for (system, offset, dim) in interaction.coordinates(systems) {
                let input = relation.input_block(offset, dim);
                let correction = operators.w_solve(system, &input)?;
                let block = relation.jacobian_block(offset, dim).dot(&correction);
                diagonal += &(block * operators.reaction_scale(system));
            }
            blocks.diagonal.push((id, diagonal));
        }

        for edge in assembly.topology.edges(self.level) {
            let assembled = |id| self.matrix.position(id).is_some();
            if !assembled(edge.source) || !assembled(edge.target) {
                continue;
            }
            let a = &assembly.interactions[edge.source.index()];
            let b = &assembly.interactions[edge.target.index()];
            let slot_a = slot_of(a, systems, edge.system);
            let slot_b = slot_of(b, systems, edge.system);
            let (Some((offset_a, dim)), Some((offset_b, _))) = (slot_a, slot_b) else {
                continue;
            };

            let scale = operators.reaction_scale(edge.system);
            let input_b = b.relation().input_block(offset_b, dim);
            let input_a = a.relation().input_block(offset_a, dim);
            let w_inv_b = operators.w_solve(edge.system, &input_b)?;
            let w_inv_a = operators.w_solve(edge.system, &input_a)?;
            blocks.couplings.push(Coupling {
                source: edge.source,
                target: edge.target,
                forward: a.relation().jacobian_block(offset_a, dim).dot(&w_inv_b) * scale,
                backward: b.relation().jacobian_block(offset_b, dim).dot(&w_inv_a) * scale,
            });
        }

        Ok(blocks)
    }

    fn build_vectors(&mut self, assembly: &Assembly<'_>, options: &SolverOptions) {
        let size = self.matrix.dim();
        let level = self.level;
        self.q = Vector::zeros(size);
        self.lower = Vector::zeros(size);
        self.upper = Vector::zeros(size);
        self.initial = Vector::zeros(size);
        self.cones.clear();

        for &id in self.matrix.members() {
            let Some(pos) = self.matrix.position(id) else {
                continue;
            };
            let interaction = &assembly.interactions[id.index()];
            let law = interaction.law();
            let n = interaction.size();

            let mut q = interaction.compute_free_output(level, assembly.systems);
            if level == 1 {
                if let Some(shift) = law.impact_shift(interaction.pre_impact()) {
                    q += &shift;
                }
            }
            self.q.slice_mut(s![pos..pos + n]).assign(&q);

            for row in 0..n {
                let (lo, hi) = law.bounds(row);
                self.lower[pos + row] = lo;
                self.upper[pos + row] = hi;
            }
            if let Some(mu) = law.friction() {
                self.cones.push(FrictionCone {
                    normal: pos,
                    tangents: n - 1,
                    mu,
                });
            }

            if options.warm_start() {
                self.initial
                    .slice_mut(s![pos..pos + n])
                    .assign(interaction.lambda_old(level));
            }
        }
    }
}

fn slot_of(
    interaction: &Interaction,
    systems: &SystemStore,
    system: SystemId,
) -> Option<(usize, usize)> {
    interaction
        .coordinates(systems)
        .into_iter()
        .find(|(id, _, _)| *id == system)
        .map(|(_, offset, dim)| (offset, dim))
}
