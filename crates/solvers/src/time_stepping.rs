//! Time-stepping simulation with Newton iterations.
//!
//! Each step `[t_k, t_{k+1}]` runs the cycle
//!
//! ```text
//! predict → activate → solve → update → converge check → commit
//! ```
//!
//! 1. *Predict*: factor the iteration matrices, compute free states from
//!    the current iterate, and evaluate predicted outputs. For Lagrangian
//!    interactions `y[0]` holds the predicted gap `y + h/2 · ẏ`.
//! 2. *Activate*: on the first iteration, update the index sets in
//!    ascending order from the predicted outputs. A unilateral interaction
//!    is active while its predicted gap is closed, whatever its rate.
//! 3. *Solve*: assemble and solve one [`LinearOsns`] per reaction level,
//!    over the index set of that level.
//! 4. *Update*: feed reactions back as system inputs, correct the states,
//!    and recompute outputs.
//! 5. *Converge check*: in [`NewtonMode::Linear`] stop after one cycle;
//!    otherwise stop once every enabled residual is below tolerance, or
//!    report [`StepStatus::IterationCapped`] at the iteration limit.
//! 6. *Commit*: push states into each system's history, save `y`/`λ` as
//!    the committed values, and process the events at `t_{k+1}`.
//!
//! A caller may reject a computed step with [`TimeStepping::rollback`]
//! before committing it.
//!
//! # Observer
//!
//! [`TimeStepping::run`] emits one [`Event`] per committed step and stops
//! when the observer returns [`Action::StopEarly`].

mod action;
mod config;
mod error;
mod event;
mod newton;
mod solution;


pub use action::Action;
pub use config::{Config, ConfigError, NewtonMode};
pub use error::Error;
pub use event::Event;
pub use solution::{Residuals, Solution, Status, StepReport, StepStatus};

use impulse_core::{
    Observer,
    events::{EventHandle, EventKind, EventsManager},
    model::{Interaction, InteractionId, LEVELS, Levels, Model, SystemKind, SystemStore},
    time::TimeDiscretisation,
    topology::{Activation, IndexSetView, Topology},
};

use crate::{
    assembly::{Assembly, LinearOsns},
    complementarity::{NonSmoothSolver, ProjectedGaussSeidel},
    control::{Actuator, Controls, Sensor},
    integration::{Integrators, Window},
};

use newton::Iterate;

/// A time-stepping simulation that owns its model.
pub struct TimeStepping {
    model: Model,
    topology: Topology,
    integrators: Integrators,
    problems: Vec<LinearOsns>,
    solver: Box<dyn NonSmoothSolver>,
    events: EventsManager,
    controls: Controls,
    config: Config,
    level_min: usize,
    level_max: usize,
    step: usize,
}

impl TimeStepping {
    /// Initializes a simulation of `model` over the instants of `clock`.
    ///
    /// Interaction levels are fixed from the relation kinds, every system
    /// is paired with its integrator, initial outputs are computed and
    /// committed, and the index sets are filled from them.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock does not start inside the model's
    /// horizon or an integrator cannot be paired.
    pub fn new(mut model: Model, clock: TimeDiscretisation, config: Config) -> Result<Self, Error> {
        let (t0, t_final) = model.horizon();
        let mut events = EventsManager::new(t0, t_final)?;
        events.insert(EventKind::TimeDiscretisation, clock)?;

        let integrators = Integrators::resolve(model.systems(), config.theta())?;

        let (systems, interactions) = model.parts_mut();
        for interaction in interactions.iter_mut() {
            interaction.set_levels(levels_for(interaction.relation().kind()));
            refresh_outputs(interaction, t0, systems);
            interaction.swap_in_memory();
        }

        let level_min = interactions
            .iter()
            .map(|i| i.levels().lower_output)
            .min()
            .unwrap_or(0);
        let level_max = interactions
            .iter()
            .map(|i| i.levels().upper_output)
            .max()
            .unwrap_or(0);

        let mut topology =
            Topology::new(interactions, level_max + 1).with_activation(Activation::Closed);
        topology.update_index_sets(interactions, config.activation_tolerance())?;

        let problems = integrators.input_levels().map(LinearOsns::new).collect();

        tracing::info!(
            systems = systems.len(),
            interactions = interactions.len(),
            index_sets = topology.index_set_count(),
            t0,
            t_final,
            "initialized time-stepping simulation"
        );

        Ok(Self {
            model,
            topology,
            integrators,
            problems,
            solver: Box::new(ProjectedGaussSeidel),
            events,
            controls: Controls::new(),
            config,
            level_min,
            level_max,
            step: 0,
        })
    }

    /// Replaces the non-smooth solver.
    #[must_use]
    pub fn with_solver(mut self, solver: Box<dyn NonSmoothSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Registers a sensor captured at the instants of `clock`.
    ///
    /// Steps end at every sensor instant.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock starts outside the horizon or in the
    /// past.
    pub fn add_sensor(
        &mut self,
        sensor: Box<dyn Sensor>,
        clock: TimeDiscretisation,
    ) -> Result<EventHandle, Error> {
        let handle = self
            .controls
            .add_sensor(&mut self.events, sensor, clock, self.model.systems())?;
        Ok(handle)
    }

    /// Registers an actuator applied at the instants of `clock`.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock starts outside the horizon or in the
    /// past.
    pub fn add_actuator(
        &mut self,
        actuator: Box<dyn Actuator>,
        clock: TimeDiscretisation,
    ) -> Result<EventHandle, Error> {
        let handle = self.controls.add_actuator(
            &mut self.events,
            actuator,
            clock,
            self.model.systems_mut(),
        )?;
        Ok(handle)
    }

    /// Runs until the time discretisation or horizon is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if a step fails fatally.
    pub fn run<Obs>(&mut self, mut observer: Obs) -> Result<Solution, Error>
    where
        Obs: for<'a> Observer<Event<'a>, Action>,
    {
        let mut steps = 0;
        let mut capped_steps = 0;

        while self.has_next_event() {
            let report = self.compute_one_step()?;
            steps += 1;
            if !report.converged() {
                capped_steps += 1;
            }

            let event = Event {
                step: self.step,
                report: &report,
                systems: self.model.systems(),
                interactions: self.model.interactions(),
            };
            if let Some(Action::StopEarly) = observer.observe(&event) {
                return Ok(Solution {
                    status: Status::StoppedByObserver,
                    steps,
                    time: self.current_time(),
                    capped_steps,
                });
            }
        }

        tracing::info!(
            steps,
            capped_steps,
            time = self.current_time(),
            "time-stepping run complete"
        );
        Ok(Solution {
            status: Status::Complete,
            steps,
            time: self.current_time(),
            capped_steps,
        })
    }

    /// Runs to the end without observation.
    ///
    /// # Errors
    ///
    /// Returns an error if a step fails fatally.
    pub fn run_unobserved(&mut self) -> Result<Solution, Error> {
        self.run(())
    }

    /// Computes and commits one step.
    ///
    /// # Errors
    ///
    /// Returns an error if no step is left or the step fails fatally.
    pub fn compute_one_step(&mut self) -> Result<StepReport, Error> {
        let report = self.advance_to_event()?;
        self.next_step();
        Ok(report)
    }

    /// Computes the state at the next event time without committing it.
    ///
    /// # Errors
    ///
    /// Returns an error if no step is left, an iteration matrix is
    /// singular, or assembly fails.
    pub fn advance_to_event(&mut self) -> Result<StepReport, Error> {
        let t = self.events.current_time();
        let t_next = self.events.next_time().ok_or(Error::Finished(t))?;
        let window = Window { t, h: t_next - t };

        for interaction in self.model.interactions_mut() {
            interaction.record_pre_impact();
            for level in 0..LEVELS {
                interaction.reset_lambda(level);
            }
        }

        let max_iters = match self.config.newton_mode() {
            NewtonMode::Linear => 1,
            NewtonMode::NonLinear => self.config.newton_max_iters(),
        };

        let mut residuals = Residuals::default();
        let mut solves = Vec::new();
        let mut iterations = 0;
        let mut converged = false;

        while iterations < max_iters && !converged {
            iterations += 1;

            self.integrators.compute_w(self.model.systems(), window)?;
            self.integrators
                .compute_free_state(self.model.systems_mut(), window)?;

            let force_rebuild = if iterations == 1 {
                self.predict_outputs(window);
                let tolerance = self.config.activation_tolerance();
                self.topology
                    .update_index_sets(self.model.interactions_mut(), tolerance)?;
                self.topology.take_changed()
            } else {
                false
            };

            let previous = Iterate::capture(self.model.interactions());
            solves = self.solve(t_next, force_rebuild)?;
            self.update(window)?;

            residuals = self.residuals(&previous, window);
            converged = match self.config.newton_mode() {
                NewtonMode::Linear => true,
                NewtonMode::NonLinear => residuals.max() <= self.config.newton_tolerance(),
            };
            tracing::trace!(iterations, ?residuals, "newton iteration");
        }

        let status = if converged {
            StepStatus::Converged
        } else {
            tracing::warn!(
                time = t_next,
                iterations,
                state = residuals.state,
                output = residuals.output,
                input = residuals.input,
                "Newton process stopped: max. number of steps reached"
            );
            StepStatus::IterationCapped
        };

        tracing::debug!(
            step = self.step + 1,
            time = t_next,
            h = window.h,
            iterations,
            active = self.topology.index_set(1).len(),
            "computed step"
        );

        Ok(StepReport {
            time: t_next,
            h: window.h,
            status,
            iterations,
            residuals,
            solves,
        })
    }

    /// Commits the computed step and processes the events at its end.
    pub fn next_step(&mut self) {
        let (systems, interactions) = self.model.parts_mut();
        for (_, system) in systems.iter_mut() {
            system.commit();
        }
        for interaction in interactions.iter_mut() {
            interaction.swap_in_memory();
        }

        for event in self.events.process() {
            self.controls.dispatch(&event, systems);
        }
        self.step += 1;
    }

    /// Discards a computed step, restoring the last committed states,
    /// outputs, and reactions.
    pub fn rollback(&mut self) {
        let (systems, interactions) = self.model.parts_mut();
        for (_, system) in systems.iter_mut() {
            system.rollback();
        }
        for interaction in interactions.iter_mut() {
            interaction.restore_memory();
        }
    }

    /// Returns `true` while another step can be computed.
    #[must_use]
    pub fn has_next_event(&self) -> bool {
        self.events.has_next()
    }

    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.events.current_time()
    }

    #[must_use]
    pub fn next_time(&self) -> Option<f64> {
        self.events.next_time()
    }

    /// Returns the size of the next step.
    #[must_use]
    pub fn time_step(&self) -> Option<f64> {
        self.next_time().map(|next| next - self.current_time())
    }

    /// Returns the number of committed steps.
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    #[must_use]
    pub fn index_set(&self, level: usize) -> IndexSetView<'_> {
        self.topology.index_set(level)
    }

    /// Returns an interaction's position in the problem of its reaction
    /// level, as of the last assembly.
    #[must_use]
    pub fn absolute_position(&self, id: InteractionId) -> Option<usize> {
        self.problems
            .iter()
            .find_map(|problem| problem.absolute_position(id))
    }

    /// Returns the lowest output level over all interactions.
    #[must_use]
    pub fn level_min(&self) -> usize {
        self.level_min
    }

    /// Returns the highest output level over all interactions.
    #[must_use]
    pub fn level_max(&self) -> usize {
        self.level_max
    }

    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    #[must_use]
    pub fn problems(&self) -> &[LinearOsns] {
        &self.problems
    }

    #[must_use]
    pub fn systems(&self) -> &SystemStore {
        self.model.systems()
    }

    #[must_use]
    pub fn interactions(&self) -> &[Interaction] {
        self.model.interactions()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn events(&self) -> &EventsManager {
        &self.events
    }

    /// Evaluates outputs from the working states and replaces each
    /// Lagrangian gap by its prediction at mid-step.
    fn predict_outputs(&mut self, window: Window) {
        let (systems, interactions) = self.model.parts_mut();
        for interaction in interactions.iter_mut() {
            refresh_outputs(interaction, window.t, systems);
            if interaction.levels().upper_output >= 1 {
                let rate = interaction.y(1) * (0.5 * window.h);
                *interaction.y_mut(0) += &rate;
            }
        }
    }

    fn solve(
        &mut self,
        time: f64,
        force_rebuild: bool,
    ) -> Result<Vec<(usize, crate::assembly::SolveReport)>, Error> {
        let options = *self.config.solver_options();
        let (systems, interactions) = self.model.parts_mut();
        let mut reports = Vec::with_capacity(self.problems.len());

        for problem in &mut self.problems {
            let assembly = Assembly {
                topology: &self.topology,
                systems,
                interactions,
                operators: &self.integrators,
            };
            problem.pre_compute(&assembly, &options, force_rebuild)?;
            let report = problem.compute(time, self.solver.as_ref(), &options)?;
            problem.post_compute(interactions);
            reports.push((problem.level(), report));
        }

        Ok(reports)
    }

    fn update(&mut self, window: Window) -> Result<(), Error> {
        let t_next = window.t_next();
        let (systems, interactions) = self.model.parts_mut();

        for level in self.integrators.input_levels() {
            for (_, system) in systems.iter_mut() {
                system.reset_input(level);
            }
            for interaction in interactions.iter() {
                let levels = interaction.levels();
                if (levels.lower_input..=levels.upper_input).contains(&level) {
                    interaction.compute_input(t_next, level, systems);
                }
            }
            self.integrators.update_state(systems, level, window)?;
        }

        for interaction in interactions.iter_mut() {
            refresh_outputs(interaction, t_next, systems);
        }
        Ok(())
    }

    fn residuals(&self, previous: &Iterate, window: Window) -> Residuals {
        let interactions = self.model.interactions();
        Residuals {
            state: self
                .integrators
                .compute_residual(self.model.systems(), window),
            output: if self.config.output_residual() {
                previous.output_change(interactions)
            } else {
                0.0
            },
            input: if self.config.input_residual() {
                previous.input_change(interactions)
            } else {
                0.0
            },
        }
    }
}

/// Levels of an interaction under time-stepping.
fn levels_for(kind: SystemKind) -> Levels {
    match kind {
        SystemKind::Lagrangian => Levels {
            lower_output: 0,
            upper_output: 1,
            lower_input: 1,
            upper_input: 1,
        },
        SystemKind::FirstOrder => Levels::default(),
    }
}

fn refresh_outputs(interaction: &mut Interaction, time: f64, systems: &SystemStore) {
    let levels = interaction.levels();
    for level in levels.lower_output..=levels.upper_output {
        interaction.compute_output(time, level, systems);
    }
}
