use super::*;

use approx::assert_relative_eq;
use impulse_core::model::{DynamicalSystem, Dynamics, NonSmoothLaw, Relation};
use ndarray::array;

// --- Test fixtures ---

const GRAVITY: f64 = 9.81;

fn ball(height: f64, velocity: f64, restitution: Option<f64>, t_final: f64) -> Model {
    let mut model = Model::new(0.0, t_final).expect("valid horizon");
    let ball = model.add_system(
        DynamicalSystem::lagrangian(
            array![[1.0]],
            array![-GRAVITY],
            array![height],
            array![velocity],
        )
        .expect("valid ball"),
    );
    if let Some(e) = restitution {
        let ground = Interaction::new(
            vec![ball],
            Relation::lagrangian(array![[1.0]]),
            NonSmoothLaw::newton_impact(e).expect("valid law"),
        )
        .expect("valid contact");
        model.add_interaction(ground).expect("should add contact");
    }
    model
}

fn clock(h: f64) -> TimeDiscretisation {
    TimeDiscretisation::uniform(0.0, h).expect("valid clock")
}

fn position(simulation: &EventDriven) -> f64 {
    simulation.systems().iter().next().expect("one system").1.state().position[0]
}

fn velocity(simulation: &EventDriven) -> f64 {
    simulation.systems().iter().next().expect("one system").1.state().velocity[0]
}

fn impact_time(height: f64) -> f64 {
    (2.0 * height / GRAVITY).sqrt()
}

// --- Tests ---

#[test]
fn impact_is_located_and_rebounds() {
    let mut simulation =
        EventDriven::new(ball(1.0, 0.0, Some(0.5), 1.0), clock(0.1), Config::default())
            .expect("should init");

    let report = loop {
        let report = simulation.compute_one_step().expect("should step");
        if report.root_found {
            break report;
        }
        assert_eq!(report.impacts, 0);
    };

    let t_impact = impact_time(1.0);
    assert_relative_eq!(report.time, t_impact, epsilon = 1e-9);
    assert_eq!(report.impacts, 1);
    assert!(matches!(report.impulse, Some(SolveReport::Solved { size: 1, .. })));
    assert_relative_eq!(velocity(&simulation), 0.5 * GRAVITY * t_impact, max_relative = 1e-9);
    assert!(position(&simulation).abs() < 1e-9);
    assert!(simulation.index_set(1).is_empty());
    assert_eq!(simulation.impacts(), 1);
}

#[test]
fn full_run_counts_impacts() {
    let mut simulation =
        EventDriven::new(ball(1.0, 0.0, Some(0.5), 1.0), clock(0.1), Config::default())
            .expect("should init");

    let mut lowest = f64::INFINITY;
    let solution = simulation
        .run(|event: &Event<'_>| -> Option<Action> {
            let state = event.systems.iter().next().expect("one system").1.state();
            lowest = lowest.min(state.position[0]);
            None
        })
        .expect("should run");

    // First impact at √(2/g), second one flight time 2 e v / g later.
    assert_eq!(solution.status, Status::Complete);
    assert_eq!(solution.impacts, 2);
    assert_relative_eq!(solution.time, 1.0);
    assert!(lowest > -1e-9);
    assert!(solution.steps > 10);
}

#[test]
fn resting_contact_holds_with_gravity_force() {
    let mut simulation =
        EventDriven::new(ball(0.0, 0.0, Some(0.0), 0.2), clock(0.05), Config::default())
            .expect("should init");
    let contact = simulation
        .index_set(0)
        .iter()
        .next()
        .expect("one interaction");

    assert!(simulation.index_set(2).contains(contact));

    let solution = simulation.run_unobserved().expect("should run");

    assert_eq!(solution.impacts, 0);
    assert_relative_eq!(position(&simulation), 0.0);
    assert_relative_eq!(velocity(&simulation), 0.0);
    assert_relative_eq!(simulation.interactions()[0].lambda(2)[0], GRAVITY, epsilon = 1e-12);
    assert_eq!(simulation.contact_problem().dim(), 1);
}

#[test]
fn contact_detaches_when_force_reverses() {
    let mut simulation =
        EventDriven::new(ball(0.0, 0.0, Some(0.0), 0.5), clock(0.05), Config::default())
            .expect("should init");
    let lift = TimeDiscretisation::from_instants(vec![0.25, 0.5]).expect("valid clock");
    simulation
        .add_actuator(
            Box::new(|_: f64, systems: &mut SystemStore| {
                for (_, system) in systems.iter_mut() {
                    if let Dynamics::LagrangianLinear { force, .. } = system.dynamics_mut() {
                        force[0] = 1.0;
                    }
                }
            }),
            lift,
        )
        .expect("should register");

    let solution = simulation.run_unobserved().expect("should run");

    assert_eq!(solution.impacts, 0);
    assert!(simulation.index_set(2).is_empty());
    assert!(simulation.index_set(1).is_empty());
    assert_relative_eq!(position(&simulation), 0.5 * 0.25 * 0.25, epsilon = 1e-12);
    assert_relative_eq!(velocity(&simulation), 0.25, epsilon = 1e-12);
}

#[test]
fn approaching_contact_is_hit_at_start() {
    let simulation =
        EventDriven::new(ball(0.0, -2.0, Some(0.5), 1.0), clock(0.1), Config::default())
            .expect("should init");

    assert_eq!(simulation.impacts(), 1);
    assert_relative_eq!(velocity(&simulation), 1.0, epsilon = 1e-12);
    assert!(simulation.index_set(1).is_empty());
}

#[test]
fn separated_contact_leaves_index_set_one_between_events() {
    let mut simulation =
        EventDriven::new(ball(0.0, 0.0, Some(0.0), 1.0), clock(0.5), Config::default())
            .expect("should init");
    simulation
        .add_actuator(
            Box::new(|_: f64, systems: &mut SystemStore| {
                for (_, system) in systems.iter_mut() {
                    if let Dynamics::LagrangianLinear { force, .. } = system.dynamics_mut() {
                        force[0] = 2.0;
                    }
                }
            }),
            TimeDiscretisation::from_instants(vec![0.1, 0.9]).expect("valid clock"),
        )
        .expect("should register");

    // Lift at 0.1, then one smooth advance up to 0.5.
    simulation.advance_to_event().expect("should advance");
    simulation.next_step().expect("should commit");
    let contact = simulation
        .index_set(0)
        .iter()
        .next()
        .expect("one interaction");
    assert!(simulation.index_set(1).contains(contact));

    let report = simulation.advance_to_event().expect("should advance");

    assert!(!report.root_found);
    assert_relative_eq!(report.time, 0.5);
    assert!(simulation.index_set(1).is_empty());
    assert!(simulation.index_set(2).is_empty());
    assert!(simulation.interactions()[0].y(0)[0] > 0.0);
}

#[test]
fn rollback_after_an_impact_keeps_the_post_impact_state() {
    let mut simulation =
        EventDriven::new(ball(0.0, -2.0, Some(0.5), 1.0), clock(0.1), Config::default())
            .expect("should init");
    let contact = &simulation.interactions()[0];
    assert_relative_eq!(contact.pre_impact()[0], -2.0);
    assert_relative_eq!(contact.y_old(1)[0], 1.0, epsilon = 1e-12);

    simulation.advance_to_event().expect("should advance");
    simulation.rollback().expect("should roll back");

    let contact = &simulation.interactions()[0];
    assert_relative_eq!(position(&simulation), 0.0);
    assert_relative_eq!(velocity(&simulation), 1.0, epsilon = 1e-12);
    assert_relative_eq!(contact.y(1)[0], velocity(&simulation), epsilon = 1e-12);
}

#[test]
fn rollback_unschedules_the_located_event() {
    let mut simulation =
        EventDriven::new(ball(1.0, 0.0, Some(0.5), 1.0), clock(0.5), Config::default())
            .expect("should init");

    let first = simulation.advance_to_event().expect("should advance");
    assert!(first.root_found);
    assert_relative_eq!(simulation.next_time().expect("pending"), first.time, epsilon = 1e-9);

    simulation.rollback().expect("should roll back");
    assert_relative_eq!(simulation.next_time().expect("pending"), 0.5);
    assert_relative_eq!(position(&simulation), 1.0);
    assert_relative_eq!(velocity(&simulation), 0.0);

    let second = simulation.advance_to_event().expect("should advance again");
    assert_eq!(first, second);
}

#[test]
fn observer_can_stop_early() {
    let mut simulation =
        EventDriven::new(ball(10.0, 0.0, None, 1.0), clock(0.1), Config::default())
            .expect("should init");

    let solution = simulation
        .run(|event: &Event<'_>| (event.step == 2).then_some(Action::StopEarly))
        .expect("should stop");

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.steps, 2);
    assert_relative_eq!(simulation.current_time(), 0.2, epsilon = 1e-12);
    assert_relative_eq!(position(&simulation), 10.0 - 0.5 * GRAVITY * 0.04, epsilon = 1e-12);
}

#[test]
fn first_order_systems_are_rejected() {
    let mut model = Model::new(0.0, 1.0).expect("valid horizon");
    model.add_system(
        DynamicalSystem::first_order_linear(array![[-1.0]], array![0.0], array![1.0])
            .expect("valid system"),
    );

    assert!(matches!(
        EventDriven::new(model, clock(0.1), Config::default()),
        Err(Error::FirstOrderSystem(_))
    ));
}

#[test]
fn frictional_contacts_are_rejected() {
    let mut model = ball(0.0, 0.0, None, 1.0);
    let block = model.systems().iter().next().expect("one system").0;
    let contact = Interaction::new(
        vec![block],
        Relation::lagrangian(array![[1.0], [0.0]]),
        NonSmoothLaw::newton_impact_friction(0.0, 0.5, 2).expect("valid law"),
    )
    .expect("valid contact");
    let id = model.add_interaction(contact).expect("should add contact");

    assert!(matches!(
        EventDriven::new(model, clock(0.1), Config::default()),
        Err(Error::FrictionalContact(found)) if found == id
    ));
}

#[test]
fn exhausted_clock_is_reported() {
    let mut simulation =
        EventDriven::new(ball(10.0, 0.0, None, 0.2), clock(0.1), Config::default())
            .expect("should init");
    simulation.run_unobserved().expect("should run");

    assert!(matches!(
        simulation.advance_to_event(),
        Err(Error::Finished(t)) if (t - 0.2).abs() < 1e-12
    ));
}

#[test]
fn config_rejects_bad_values() {
    assert_eq!(Config::new(0, 1e-12), Err(ConfigError::Substeps));
    assert_eq!(Config::new(10, -1.0), Err(ConfigError::Tolerance(-1.0)));
    assert_eq!(Config::default().substeps(), 10);
}
