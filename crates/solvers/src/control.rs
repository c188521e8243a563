//! Sensors and actuators driven by the event queue.
//!
//! A sensor reads the systems at the instants of its own clock; an
//! actuator may change them. Both are registered with a
//! [`TimeDiscretisation`] and dispatched by the owning simulation whenever
//! their events are processed. Closures implement both traits directly.

use impulse_core::{
    events::{Event, EventError, EventHandle, EventKind, EventsManager},
    model::SystemStore,
    time::TimeDiscretisation,
};

/// Reads the dynamical systems at scheduled instants.
pub trait Sensor {
    fn capture(&mut self, time: f64, systems: &SystemStore);
}

impl<F> Sensor for F
where
    F: FnMut(f64, &SystemStore),
{
    fn capture(&mut self, time: f64, systems: &SystemStore) {
        self(time, systems);
    }
}

/// Acts on the dynamical systems at scheduled instants, typically by
/// changing applied forces through [`DynamicalSystem::dynamics_mut`].
///
/// [`DynamicalSystem::dynamics_mut`]: impulse_core::model::DynamicalSystem::dynamics_mut
pub trait Actuator {
    fn actuate(&mut self, time: f64, systems: &mut SystemStore);
}

impl<F> Actuator for F
where
    F: FnMut(f64, &mut SystemStore),
{
    fn actuate(&mut self, time: f64, systems: &mut SystemStore) {
        self(time, systems);
    }
}

/// Registered sensors and actuators, indexed by their event kinds.
#[derive(Default)]
pub struct Controls {
    sensors: Vec<Box<dyn Sensor>>,
    actuators: Vec<Box<dyn Actuator>>,
}

impl Controls {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sensor and inserts its recurring event.
    ///
    /// A first occurrence at the current instant is captured immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock starts outside the horizon or in the
    /// past.
    pub fn add_sensor(
        &mut self,
        events: &mut EventsManager,
        sensor: Box<dyn Sensor>,
        clock: TimeDiscretisation,
        systems: &SystemStore,
    ) -> Result<EventHandle, EventError> {
        let index = self.sensors.len();
        let start = clock.current_time();
        let handle = events.insert(EventKind::Sensor(index), clock)?;
        self.sensors.push(sensor);

        if events.is_now(start) {
            self.sensors[index].capture(start, systems);
        }
        Ok(handle)
    }

    /// Registers an actuator and inserts its recurring event.
    ///
    /// A first occurrence at the current instant acts immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock starts outside the horizon or in the
    /// past.
    pub fn add_actuator(
        &mut self,
        events: &mut EventsManager,
        actuator: Box<dyn Actuator>,
        clock: TimeDiscretisation,
        systems: &mut SystemStore,
    ) -> Result<EventHandle, EventError> {
        let index = self.actuators.len();
        let start = clock.current_time();
        let handle = events.insert(EventKind::Actuator(index), clock)?;
        self.actuators.push(actuator);

        if events.is_now(start) {
            self.actuators[index].actuate(start, systems);
        }
        Ok(handle)
    }

    #[must_use]
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    #[must_use]
    pub fn actuator_count(&self) -> usize {
        self.actuators.len()
    }

    /// Hands a processed event to its sensor or actuator.
    ///
    /// Other kinds are ignored.
    pub fn dispatch(&mut self, event: &Event, systems: &mut SystemStore) {
        match event.kind() {
            EventKind::Sensor(index) => {
                if let Some(sensor) = self.sensors.get_mut(index) {
                    sensor.capture(event.time(), systems);
                }
            }
            EventKind::Actuator(index) => {
                if let Some(actuator) = self.actuators.get_mut(index) {
                    actuator.actuate(event.time(), systems);
                }
            }
            EventKind::NonSmooth | EventKind::TimeDiscretisation => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::mpsc;

    use approx::assert_relative_eq;
    use impulse_core::model::{DynamicalSystem, Dynamics};
    use ndarray::array;

    fn store() -> SystemStore {
        let mut systems = SystemStore::new();
        systems.insert(
            DynamicalSystem::lagrangian(array![[1.0]], array![0.0], array![0.0], array![0.0])
                .expect("valid particle"),
        );
        systems
    }

    #[test]
    fn sensors_capture_at_their_instants() {
        let mut systems = store();
        let mut events = EventsManager::new(0.0, 1.0).expect("valid horizon");
        let mut controls = Controls::new();
        let (tx, rx) = mpsc::channel();

        let clock = TimeDiscretisation::uniform(0.0, 0.5).expect("valid clock");
        controls
            .add_sensor(
                &mut events,
                Box::new(move |time: f64, _: &SystemStore| {
                    tx.send(time).expect("receiver alive");
                }),
                clock,
                &systems,
            )
            .expect("should register");

        while events.has_next() {
            for event in events.process() {
                controls.dispatch(&event, &mut systems);
            }
        }

        let times: Vec<f64> = rx.try_iter().collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn actuators_change_the_applied_force() {
        let mut systems = store();
        let mut events = EventsManager::new(0.0, 1.0).expect("valid horizon");
        let mut controls = Controls::new();

        let clock = TimeDiscretisation::from_instants(vec![0.25, 0.75]).expect("valid clock");
        controls
            .add_actuator(
                &mut events,
                Box::new(|time: f64, systems: &mut SystemStore| {
                    for (_, system) in systems.iter_mut() {
                        if let Dynamics::LagrangianLinear { force, .. } = system.dynamics_mut() {
                            force[0] = -time;
                        }
                    }
                }),
                clock,
                &mut systems,
            )
            .expect("should register");
        assert_eq!(controls.actuator_count(), 1);

        for event in events.process() {
            controls.dispatch(&event, &mut systems);
        }

        let (_, system) = systems.iter().next().expect("one system");
        let Dynamics::LagrangianLinear { force, .. } = system.dynamics() else {
            panic!("expected a Lagrangian system");
        };
        assert_relative_eq!(force[0], -0.25);
    }
}
