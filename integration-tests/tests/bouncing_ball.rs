use approx::assert_relative_eq;
use impulse_core::Observer;
use impulse_observers::{Recorder, StopAt};
use impulse_solvers::{
    event_driven::{self, EventDriven},
    time_stepping::{self, Config, TimeStepping},
};
use integration_tests::{GRAVITY, bouncing_ball, uniform};
use tracing_subscriber::EnvFilter;

// --- Test fixtures ---

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn first_impact_time(height: f64) -> f64 {
    (2.0 * height / GRAVITY).sqrt()
}

// --- Tests ---

#[test]
fn time_stepping_and_event_driven_agree_on_the_first_impact() {
    init_logging();
    let h = 1e-3;

    let mut stepping =
        TimeStepping::new(bouncing_ball(1.0, 0.5, 0.6), uniform(h), Config::default())
            .expect("should init");
    let mut velocities = Recorder::new(|event: &time_stepping::Event<'_>| {
        event.systems.iter().next().expect("one system").1.state().velocity[0]
    });
    stepping
        .run(|event: &time_stepping::Event<'_>| -> Option<time_stepping::Action> {
            velocities.observe(event)
        })
        .expect("should run");

    let samples = velocities.into_samples();
    let rebound = samples
        .iter()
        .position(|&(_, v)| v > 0.0)
        .expect("ball should bounce");
    let (t_stepping, _) = samples[rebound];

    let mut driven = EventDriven::new(
        bouncing_ball(1.0, 0.5, 0.6),
        uniform(0.1),
        event_driven::Config::default(),
    )
    .expect("should init");
    let t_driven = loop {
        let report = driven.compute_one_step().expect("should step");
        if report.impacts > 0 {
            break report.time;
        }
    };

    assert_relative_eq!(t_driven, first_impact_time(1.0), epsilon = 1e-9);
    assert!((t_stepping - t_driven).abs() <= 2.0 * h);
}

#[test]
fn event_driven_rebound_follows_newton_impact_law() {
    init_logging();
    let restitution = 0.8;
    let mut simulation = EventDriven::new(
        bouncing_ball(2.0, restitution, 1.0),
        uniform(0.25),
        event_driven::Config::default(),
    )
    .expect("should init");

    let report = loop {
        let report = simulation.advance_to_event().expect("should advance");
        if report.root_found {
            break report;
        }
        simulation.next_step().expect("should commit");
    };
    let v_minus = simulation.systems().iter().next().expect("one system").1.state().velocity[0];
    simulation.next_step().expect("should process the impact");
    let v_plus = simulation.systems().iter().next().expect("one system").1.state().velocity[0];

    assert_relative_eq!(report.time, first_impact_time(2.0), epsilon = 1e-9);
    assert_relative_eq!(v_minus, -GRAVITY * report.time, max_relative = 1e-9);
    assert_relative_eq!(v_plus, -restitution * v_minus, max_relative = 1e-9);
}

#[test]
fn forced_single_iteration_runs_one_cycle_per_step() {
    init_logging();
    let mut simulation =
        TimeStepping::new(bouncing_ball(0.5, 0.5, 1.0), uniform(1e-2), Config::linear())
            .expect("should init");

    let mut iterations = Vec::new();
    let solution = simulation
        .run(|event: &time_stepping::Event<'_>| -> Option<time_stepping::Action> {
            iterations.push(event.report.iterations);
            None
        })
        .expect("should run");

    assert_eq!(solution.steps, 100);
    assert_eq!(solution.capped_steps, 0);
    assert!(iterations.iter().all(|&n| n == 1));
}

#[test]
fn observers_stop_either_simulation() {
    let mut stepping =
        TimeStepping::new(bouncing_ball(1.0, 0.5, 1.0), uniform(0.1), Config::default())
            .expect("should init");
    let solution = stepping.run(StopAt { time: 0.25 }).expect("should run");
    assert_eq!(solution.status, time_stepping::Status::StoppedByObserver);
    assert_relative_eq!(solution.time, 0.3, epsilon = 1e-12);

    let mut driven = EventDriven::new(
        bouncing_ball(1.0, 0.5, 1.0),
        uniform(0.1),
        event_driven::Config::default(),
    )
    .expect("should init");
    let solution = driven.run(StopAt { time: 0.25 }).expect("should run");
    assert_eq!(solution.status, event_driven::Status::StoppedByObserver);
    assert_relative_eq!(solution.time, 0.3, epsilon = 1e-12);
}
