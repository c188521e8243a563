use approx::assert_relative_eq;
use impulse_core::{
    model::{Dynamics, InteractionId, SystemId, SystemStore},
    time::TimeDiscretisation,
};
use impulse_solvers::{
    event_driven::{self, EventDriven},
    time_stepping::{Config, TimeStepping},
};
use integration_tests::{GRAVITY, TwoBodies, two_bodies, uniform};

// --- Test fixtures ---

fn position(systems: &SystemStore, id: SystemId) -> f64 {
    systems.get(id).expect("system exists").state().position[0]
}

// --- Tests ---

#[test]
fn time_stepping_index_set_follows_the_gap() {
    let TwoBodies {
        model,
        ground,
        between,
        ..
    } = two_bodies(0.5, 0.5, 0.5);
    let mut simulation =
        TimeStepping::new(model, uniform(1e-3), Config::default()).expect("should init");

    assert!(simulation.index_set(1).contains(ground));
    assert!(!simulation.index_set(1).contains(between));

    let mut membership = Vec::new();
    while simulation.has_next_event() {
        simulation.compute_one_step().expect("should step");
        membership.push(simulation.index_set(1).contains(between));
    }

    let entered = membership
        .iter()
        .position(|&active| active)
        .expect("bodies should collide");
    let left = membership[entered..]
        .iter()
        .position(|&active| !active)
        .expect("upper body should rebound");
    assert!(entered > 0);
    assert!(left > 0);
}

#[test]
fn event_driven_index_sets_fill_and_empty() {
    let TwoBodies {
        model,
        upper,
        ground,
        between,
        ..
    } = two_bodies(0.5, 0.0, 1.0);
    let config = event_driven::Config::new(10, 1e-9).expect("valid config");
    let mut simulation = EventDriven::new(model, uniform(0.1), config).expect("should init");
    simulation
        .add_actuator(
            Box::new(move |_: f64, systems: &mut SystemStore| {
                let Some(system) = systems.get_mut(upper) else {
                    return;
                };
                if let Dynamics::LagrangianLinear { force, .. } = system.dynamics_mut() {
                    force[0] = 20.0;
                }
            }),
            TimeDiscretisation::from_instants(vec![0.6, 1.0]).expect("valid clock"),
        )
        .expect("should register");

    // The lower body rests on the ground from the start.
    assert!(simulation.index_set(2).contains(ground));
    assert!(!simulation.index_set(1).contains(between));

    let report = loop {
        let report = simulation.compute_one_step().expect("should step");
        if report.impacts > 0 {
            break report;
        }
    };
    assert_relative_eq!(report.time, (1.0 / GRAVITY).sqrt(), epsilon = 1e-9);

    // Plastic impact: the upper body now rests on the lower one.
    assert!(simulation.index_set(1).contains(between));
    assert!(simulation.index_set(2).contains(between));
    let interactions = simulation.interactions();
    let lambda = |id: InteractionId| interactions[id.index()].lambda(2)[0];
    assert_relative_eq!(lambda(between), GRAVITY, epsilon = 1e-6);
    assert_relative_eq!(lambda(ground), 2.0 * GRAVITY, epsilon = 1e-6);

    let solution = simulation.run_unobserved().expect("should run");

    // Lifted at t = 0.6 with a net upward acceleration of 20.
    assert_eq!(solution.impacts, 0);
    assert!(!simulation.index_set(2).contains(between));
    assert!(!simulation.index_set(1).contains(between));
    assert!(simulation.index_set(2).contains(ground));
    assert_relative_eq!(
        position(simulation.systems(), upper),
        0.5 * 20.0 * 0.4 * 0.4,
        epsilon = 1e-6
    );
}
