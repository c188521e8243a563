//! Event-driven simulation of Lagrangian systems.
//!
//! Between events the systems are integrated smoothly: each interval up to
//! the next scheduled event is split into substeps of constant
//! acceleration, where the acceleration comes from the smooth dynamics and
//! the contact forces of the interactions in index set 2.
//!
//! Each open unilateral interaction contributes an event function, its
//! gap `y[0]`. When a gap leaves the positive half-line inside a substep
//! the crossing is located by [`bisection`](crate::root::bisect), the
//! state is moved to the root, and a non-smooth event is scheduled there.
//! Interactions in index set 2 are monitored through their contact force
//! instead: when `λ[2]` vanishes while the constraint acceleration is
//! positive the contact detaches. Whenever accelerations are recomputed,
//! interactions whose gap has opened leave index set 1.
//!
//! Processing a non-smooth event runs, as one unit:
//!
//! 1. recompute `y[0]`, `y[1]` and update index set 1;
//! 2. if an active interaction approaches (`y[1] < −tol`), record the
//!    pre-impact velocities, solve the impulse problem at level 1 with the
//!    mass matrix, and apply the velocity jump;
//! 3. recompute free accelerations and update index sets 1 and 2;
//! 4. solve the contact-force problem at level 2 and detach the contacts
//!    that have no force and a positive acceleration.
//!
//! Frictional contacts are handled by time stepping only.
//!
//! # Observer
//!
//! [`EventDriven::run`] emits one [`Event`] per committed step and stops
//! when the observer returns [`Action::StopEarly`].

mod action;
mod config;
mod error;
mod event;
mod mass;
mod solution;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::Event;
pub use mass::MassMatrices;
pub use solution::{Solution, Status, StepReport};

use std::convert::Infallible;

use impulse_core::{
    Observer,
    events::{EventHandle, EventKind, EventsManager},
    model::{Interaction, InteractionId, LEVELS, Levels, Model, SystemStore},
    time::TimeDiscretisation,
    topology::{IndexSetView, Topology},
};

use crate::{
    assembly::{Assembly, LinearOsns, SolveReport},
    complementarity::{NonSmoothSolver, ProjectedGaussSeidel},
    control::{Actuator, Controls, Sensor},
    root,
};

/// Interaction levels under event-driven simulation.
const EVENT_DRIVEN_LEVELS: Levels = Levels {
    lower_output: 0,
    upper_output: 2,
    lower_input: 1,
    upper_input: 2,
};

/// An event-driven simulation that owns its model.
pub struct EventDriven {
    model: Model,
    topology: Topology,
    masses: MassMatrices,
    impulse: LinearOsns,
    contact: LinearOsns,
    solver: Box<dyn NonSmoothSolver>,
    events: EventsManager,
    controls: Controls,
    config: Config,
    located: Option<EventHandle>,
    step: usize,
    impacts: usize,
}

impl EventDriven {
    /// Initializes a simulation of `model`, stopping at the instants of
    /// `clock`.
    ///
    /// Mass matrices are factored, outputs are computed and committed, and
    /// the initial state is processed like a non-smooth event, so a system
    /// that starts in contact with an approaching velocity is hit at `t0`.
    ///
    /// # Errors
    ///
    /// Returns an error if a system is first-order, an interaction has a
    /// friction law, a mass matrix is singular, or the clock does not start
    /// inside the model's horizon.
    pub fn new(
        mut model: Model,
        clock: TimeDiscretisation,
        config: Config,
    ) -> Result<Self, Error> {
        if let Some((id, _)) = model
            .interaction_ids()
            .zip(model.interactions())
            .find(|(_, interaction)| interaction.law().friction().is_some())
        {
            return Err(Error::FrictionalContact(id));
        }

        let (t0, t_final) = model.horizon();
        let mut events = EventsManager::new(t0, t_final)?;
        events.insert(EventKind::TimeDiscretisation, clock)?;

        let masses = MassMatrices::new(model.systems())?;

        let (systems, interactions) = model.parts_mut();
        for interaction in interactions.iter_mut() {
            interaction.set_levels(EVENT_DRIVEN_LEVELS);
            refresh_outputs(interaction, t0, systems, 1);
            interaction.swap_in_memory();
        }
        let topology = Topology::new(interactions, LEVELS);

        tracing::info!(
            systems = systems.len(),
            interactions = interactions.len(),
            t0,
            t_final,
            "initialized event-driven simulation"
        );

        let mut simulation = Self {
            model,
            topology,
            masses,
            impulse: LinearOsns::new(1),
            contact: LinearOsns::new(2),
            solver: Box::new(ProjectedGaussSeidel),
            events,
            controls: Controls::new(),
            config,
            located: None,
            step: 0,
            impacts: 0,
        };
        simulation.process_impact(t0)?;
        simulation.commit();
        Ok(simulation)
    }

    /// Replaces the non-smooth solver.
    #[must_use]
    pub fn with_solver(mut self, solver: Box<dyn NonSmoothSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Registers a sensor captured at the instants of `clock`.
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

    /// Runs until the event queue is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if a step fails.
    pub fn run<Obs>(&mut self, mut observer: Obs) -> Result<Solution, Error>
    where
        Obs: for<'a> Observer<Event<'a>, Action>,
    {
        let mut steps = 0;
        let mut impacts = 0;

        while self.has_next_event() {
            let report = self.compute_one_step()?;
            steps += 1;
            impacts += report.impacts;

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
                    impacts,
                });
            }
        }

        tracing::info!(
            steps,
            impacts,
            time = self.current_time(),
            "event-driven run complete"
        );
        Ok(Solution {
            status: Status::Complete,
            steps,
            time: self.current_time(),
            impacts,
        })
    }

    /// Runs to the end without observation.
    ///
    /// # Errors
    ///
    /// Returns an error if a step fails.
    pub fn run_unobserved(&mut self) -> Result<Solution, Error> {
        self.run(())
    }

    /// Integrates to the next event, processes it, and commits.
    ///
    /// # Errors
    ///
    /// Returns an error if no step is left or the step fails.
    pub fn compute_one_step(&mut self) -> Result<StepReport, Error> {
        let mut report = self.advance_to_event()?;
        if let Some(impulse) = self.next_step()? {
            report.impacts += 1;
            report.impulse = Some(impulse);
        }
        Ok(report)
    }

    /// Integrates smoothly until the next scheduled event or the first
    /// located root, without committing.
    ///
    /// # Errors
    ///
    /// Returns an error if no step is left, a mass solve or assembly fails,
    /// or a root cannot be located.
    pub fn advance_to_event(&mut self) -> Result<StepReport, Error> {
        let t = self.events.current_time();
        let t_next = self.events.next_time().ok_or(Error::Finished(t))?;

        let mut report = StepReport {
            time: t,
            root_found: false,
            substeps: 0,
            impacts: 0,
            impulse: None,
        };
        let mut remaining = self.config.substeps();

        while remaining > 0 {
            self.compute_accelerations(report.time, false)?;
            let dt = (t_next - report.time) / remaining as f64;
            report.substeps += 1;

            let Some(tau) = self.locate_root(dt)? else {
                self.integrate(dt);
                remaining -= 1;
                report.time = if remaining == 0 { t_next } else { report.time + dt };
                continue;
            };

            self.integrate(tau);
            report.time += tau;
            self.refresh_outputs(report.time, 1);

            if self.events.is_now(report.time) {
                if let Some(impulse) = self.process_impact(report.time)? {
                    report.impacts += 1;
                    report.impulse = Some(impulse);
                }
                continue;
            }

            self.located = Some(self.events.schedule(EventKind::NonSmooth, report.time)?);
            report.root_found = true;
            tracing::debug!(
                time = report.time,
                substeps = report.substeps,
                "located non-smooth event"
            );
            return Ok(report);
        }

        self.refresh_outputs(t_next, 2);
        self.release_separated(t_next)?;
        tracing::debug!(
            step = self.step + 1,
            time = t_next,
            substeps = report.substeps,
            "reached event"
        );
        Ok(report)
    }

    /// Processes the events at the reached time and commits the state.
    ///
    /// Returns the impulse solve if a non-smooth event produced an impact.
    ///
    /// # Errors
    ///
    /// Returns an error if impact processing fails.
    pub fn next_step(&mut self) -> Result<Option<SolveReport>, Error> {
        self.located = None;
        let mut impulse = None;

        for event in self.events.process() {
            match event.kind() {
                EventKind::NonSmooth => {
                    if let Some(report) = self.process_impact(event.time())? {
                        impulse = Some(report);
                    }
                }
                _ => self.controls.dispatch(&event, self.model.systems_mut()),
            }
        }

        self.commit();
        self.step += 1;
        Ok(impulse)
    }

    /// Discards an uncommitted advance, restoring the last committed
    /// states, outputs, and reactions, and unscheduling a located event.
    ///
    /// Index sets keep their latest membership.
    ///
    /// # Errors
    ///
    /// Returns an error if the located event cannot be unscheduled.
    pub fn rollback(&mut self) -> Result<(), Error> {
        if let Some(handle) = self.located.take() {
            self.events.remove(handle)?;
        }
        let (systems, interactions) = self.model.parts_mut();
        for (_, system) in systems.iter_mut() {
            system.rollback();
        }
        for interaction in interactions.iter_mut() {
            interaction.restore_memory();
        }
        Ok(())
    }

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

    /// Returns the number of committed steps.
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Returns the number of impacts processed since initialization.
    #[must_use]
    pub fn impacts(&self) -> usize {
        self.impacts
    }

    #[must_use]
    pub fn index_set(&self, level: usize) -> IndexSetView<'_> {
        self.topology.index_set(level)
    }

    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The velocity-level problem solved at impacts.
    #[must_use]
    pub fn impulse_problem(&self) -> &LinearOsns {
        &self.impulse
    }

    /// The acceleration-level problem giving contact forces.
    #[must_use]
    pub fn contact_problem(&self) -> &LinearOsns {
        &self.contact
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

    /// Pushes working states into the histories and saves `y`/`λ` as the
    /// committed values.
    fn commit(&mut self) {
        let (systems, interactions) = self.model.parts_mut();
        for (_, system) in systems.iter_mut() {
            system.commit();
        }
        for interaction in interactions.iter_mut() {
            interaction.swap_in_memory();
        }
    }

    /// Handles a non-smooth event at `time`.
    ///
    /// Returns the impulse solve if an active interaction was approaching.
    fn process_impact(&mut self, time: f64) -> Result<Option<SolveReport>, Error> {
        let tolerance = self.config.tolerance();
        self.refresh_outputs(time, 1);
        self.topology
            .update_index_set(1, self.model.interactions_mut(), tolerance)?;

        let interactions = self.model.interactions();
        let approaching = self
            .topology
            .index_set(1)
            .iter()
            .any(|id| interactions[id.index()].y(1)[0] < -tolerance);

        let impulse = if approaching {
            Some(self.apply_impulse(time)?)
        } else {
            None
        };

        self.compute_accelerations(time, true)?;
        Ok(impulse)
    }

    /// Solves the level-1 problem over index set 1 with `W = M` and the
    /// pre-impact velocities as free state, then applies the jump.
    fn apply_impulse(&mut self, time: f64) -> Result<SolveReport, Error> {
        let options = *self.config.solver_options();
        let force_rebuild = self.topology.take_changed();
        let (systems, interactions) = self.model.parts_mut();

        for interaction in interactions.iter_mut() {
            interaction.record_pre_impact();
            interaction.reset_lambda(1);
        }
        for (_, system) in systems.iter_mut() {
            let state = system.state().clone();
            *system.free_state_mut() = state;
            system.reset_input(1);
        }

        let assembly = Assembly {
            topology: &self.topology,
            systems,
            interactions,
            operators: &self.masses,
        };
        self.impulse.pre_compute(&assembly, &options, force_rebuild)?;
        let report = self.impulse.compute(time, self.solver.as_ref(), &options)?;
        self.impulse.post_compute(interactions);

        for interaction in interactions.iter() {
            interaction.compute_input(time, 1, systems);
        }
        for (id, system) in systems.iter_mut() {
            let jump = self.masses.solve(id, system.input(1))?;
            system.state_mut().velocity += &jump;
        }
        for interaction in interactions.iter_mut() {
            interaction.compute_output(time, 1, systems);
        }

        self.impacts += 1;
        tracing::debug!(
            time,
            active = self.topology.index_set(1).len(),
            ?report,
            "processed impact"
        );
        Ok(report)
    }

    /// Computes accelerations and contact forces at `time`.
    ///
    /// With `update_sets`, index sets 1 and 2 are refreshed from the free
    /// accelerations before the contact problem is solved; otherwise
    /// interactions whose gap has opened only leave index set 1. Contacts
    /// left with no force and a positive acceleration are removed from
    /// index set 2 afterwards.
    fn compute_accelerations(&mut self, time: f64, update_sets: bool) -> Result<(), Error> {
        let tolerance = self.config.tolerance();
        self.masses.free_accelerations(self.model.systems_mut())?;

        let (systems, interactions) = self.model.parts_mut();
        for interaction in interactions.iter_mut() {
            refresh_outputs(interaction, time, systems, 2);
            interaction.reset_lambda(2);
        }

        if update_sets {
            for update in self.topology.update_index_sets(interactions, tolerance)? {
                if !update.is_empty() {
                    tracing::debug!(time, ?update, "index sets changed");
                }
            }
        } else {
            self.release_separated(time)?;
        }
        let (systems, interactions) = self.model.parts_mut();
        if self.topology.index_set(2).is_empty() {
            return Ok(());
        }

        let options = *self.config.solver_options();
        let force_rebuild = self.topology.take_changed();
        let assembly = Assembly {
            topology: &self.topology,
            systems,
            interactions,
            operators: &self.masses,
        };
        self.contact.pre_compute(&assembly, &options, force_rebuild)?;
        self.contact.compute(time, self.solver.as_ref(), &options)?;
        self.contact.post_compute(interactions);

        for interaction in interactions.iter() {
            interaction.compute_input(time, 2, systems);
        }
        for (id, system) in systems.iter_mut() {
            let correction = self.masses.solve(id, system.input(2))?;
            system.state_mut().acceleration += &correction;
        }
        for interaction in interactions.iter_mut() {
            interaction.compute_output(time, 2, systems);
        }

        let detached: Vec<InteractionId> = self
            .topology
            .index_set(2)
            .iter()
            .filter(|id| {
                let interaction = &interactions[id.index()];
                interaction.law().is_unilateral()
                    && interaction.lambda(2)[0] <= tolerance
                    && interaction.y(2)[0] > tolerance
            })
            .collect();
        for id in detached {
            self.topology.remove(2, id)?;
            interactions[id.index()].reset_lambda(2);
            tracing::debug!(time, ?id, "contact detached");
        }
        Ok(())
    }

    /// Removes from index set 1 the interactions whose gap has opened.
    fn release_separated(&mut self, time: f64) -> Result<(), Error> {
        let tolerance = self.config.tolerance();
        let update = self
            .topology
            .release_index_set(1, self.model.interactions_mut(), tolerance)?;
        if !update.removed.is_empty() {
            tracing::debug!(time, released = ?update.removed, "contacts separated");
        }
        Ok(())
    }

    /// Returns the earliest time offset in `[0, dt]` at which an open
    /// unilateral gap closes under the current constant accelerations.
    fn locate_root(&self, dt: f64) -> Result<Option<f64>, Error> {
        let tolerance = self.config.tolerance();
        let contacts = self.topology.index_set(2);
        let mut earliest: Option<f64> = None;

        for (id, interaction) in self.model.interaction_ids().zip(self.model.interactions()) {
            if contacts.contains(id) || !interaction.law().is_unilateral() {
                continue;
            }
            let [gap, rate, curvature] = [0, 1, 2].map(|level| interaction.y(level)[0]);
            if gap <= tolerance {
                continue;
            }
            let event_function = |tau: f64| gap + tau * (rate + 0.5 * curvature * tau);
            if event_function(dt) > 0.0 {
                continue;
            }

            let solution = root::bisect_unobserved(
                |tau| Ok::<_, Infallible>(event_function(tau)),
                [0.0, dt],
                self.config.root(),
            )?;
            tracing::trace!(?id, tau = solution.x, iters = solution.iters, "gap closes");
            earliest = Some(earliest.map_or(solution.x, |tau| tau.min(solution.x)));
        }

        Ok(earliest)
    }

    /// Moves every working state forward by `tau` at constant
    /// acceleration.
    fn integrate(&mut self, tau: f64) {
        for (_, system) in self.model.systems_mut().iter_mut() {
            let state = system.state_mut();
            let displacement =
                &state.velocity * tau + &state.acceleration * (0.5 * tau * tau);
            state.position += &displacement;
            let increment = &state.acceleration * tau;
            state.velocity += &increment;
        }
    }

    /// Recomputes outputs `0..=upper` of every interaction.
    fn refresh_outputs(&mut self, time: f64, upper: usize) {
        let (systems, interactions) = self.model.parts_mut();
        for interaction in interactions.iter_mut() {
            refresh_outputs(interaction, time, systems, upper);
        }
    }
}

fn refresh_outputs(
    interaction: &mut Interaction,
    time: f64,
    systems: &SystemStore,
    upper: usize,
) {
    for level in 0..=upper {
        interaction.compute_output(time, level, systems);
    }
}
