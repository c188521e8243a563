use impulse_core::Observer;

use crate::traits::{CanStopEarly, HasTime};

/// Records one sample per event, keyed by the event's time.
///
/// The extractor picks the value to record, for example a coordinate of a
/// system or the reaction of an interaction.
///
/// ```rust
/// use impulse_observers::Recorder;
/// use impulse_solvers::time_stepping;
///
/// let recorder = Recorder::new(|event: &time_stepping::Event<'_>| {
///     event.report.iterations as f64
/// });
/// assert!(recorder.samples().is_empty());
/// ```
pub struct Recorder<F> {
    extract: F,
    samples: Vec<(f64, f64)>,
}

impl<F> Recorder<F> {
    pub fn new(extract: F) -> Self {
        Self {
            extract,
            samples: Vec::new(),
        }
    }

    /// Returns the recorded `(time, value)` pairs in emission order.
    #[must_use]
    pub fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }

    #[must_use]
    pub fn into_samples(self) -> Vec<(f64, f64)> {
        self.samples
    }
}

impl<E, A, F> Observer<E, A> for Recorder<F>
where
    E: HasTime,
    F: FnMut(&E) -> f64,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        let value = (self.extract)(event);
        self.samples.push((event.time(), value));
        None
    }
}

/// Stops a run once an event reports a time at or past `time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopAt {
    pub time: f64,
}

impl<E, A> Observer<E, A> for StopAt
where
    E: HasTime,
    A: CanStopEarly,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        (event.time() >= self.time).then(A::stop_early)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use impulse_core::{
        model::{DynamicalSystem, Model},
        time::TimeDiscretisation,
    };
    use impulse_solvers::time_stepping::{self, Config, Status, TimeStepping};
    use ndarray::array;

    fn falling_ball() -> TimeStepping {
        let mut model = Model::new(0.0, 1.0).expect("valid horizon");
        model.add_system(
            DynamicalSystem::lagrangian(array![[1.0]], array![-9.81], array![10.0], array![0.0])
                .expect("valid ball"),
        );
        let clock = TimeDiscretisation::uniform(0.0, 0.25).expect("valid clock");
        TimeStepping::new(model, clock, Config::default()).expect("should init")
    }

    #[test]
    fn recorder_samples_every_step() {
        let mut simulation = falling_ball();
        let mut recorder = Recorder::new(|event: &time_stepping::Event<'_>| {
            event.systems.iter().next().expect("one system").1.state().velocity[0]
        });

        simulation
            .run(|event: &time_stepping::Event<'_>| -> Option<time_stepping::Action> {
                recorder.observe(event)
            })
            .expect("should run");

        let samples = recorder.into_samples();
        assert_eq!(samples.len(), 4);
        assert_relative_eq!(samples[0].0, 0.25);
        assert_relative_eq!(samples[3].0, 1.0);
        assert_relative_eq!(samples[3].1, -9.81, epsilon = 1e-12);
    }

    #[test]
    fn stop_at_halts_the_run() {
        let mut simulation = falling_ball();

        let solution = simulation.run(StopAt { time: 0.4 }).expect("should run");

        assert_eq!(solution.status, Status::StoppedByObserver);
        assert_eq!(solution.steps, 2);
    }
}
