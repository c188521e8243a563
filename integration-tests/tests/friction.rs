use approx::assert_relative_eq;
use impulse_core::model::{SystemId, SystemStore};
use impulse_solvers::time_stepping::{Config, TimeStepping};
use integration_tests::{GRAVITY, sliding_block, uniform};

// --- Test fixtures ---

const FRICTION: f64 = 0.5;

fn simulate(push: f64) -> (TimeStepping, SystemId) {
    let (model, block, floor) = sliding_block(push, FRICTION, 1.0);
    let config = Config::default().with_theta(0.5).expect("valid theta");
    let mut simulation = TimeStepping::new(model, uniform(1e-3), config).expect("should init");

    while simulation.has_next_event() {
        let report = simulation.compute_one_step().expect("should step");
        assert!(report.solver_succeeded());
        assert!(simulation.index_set(1).contains(floor));
    }
    (simulation, block)
}

fn state(systems: &SystemStore, id: SystemId) -> (f64, f64, f64) {
    let state = systems.get(id).expect("system exists").state();
    (state.position[0], state.position[1], state.velocity[0])
}

// --- Tests ---

#[test]
fn block_sticks_below_the_friction_limit() {
    let (simulation, block) = simulate(2.0);
    let (x, z, vx) = state(simulation.systems(), block);

    assert_relative_eq!(vx, 0.0, epsilon = 1e-10);
    assert_relative_eq!(x, 0.0, epsilon = 1e-10);
    assert!(z.abs() < 1e-10);

    // Tangential impulse balances the push over one step.
    let lambda = simulation.interactions()[0].lambda(1).clone();
    assert_relative_eq!(lambda[0], GRAVITY * 1e-3, epsilon = 1e-10);
    assert_relative_eq!(lambda[1], -2.0 * 1e-3, epsilon = 1e-10);
}

#[test]
fn block_slips_above_the_friction_limit() {
    let (simulation, block) = simulate(10.0);
    let (x, z, vx) = state(simulation.systems(), block);

    let acceleration = 10.0 - FRICTION * GRAVITY;
    assert_relative_eq!(vx, acceleration, max_relative = 1e-6);
    assert_relative_eq!(x, 0.5 * acceleration, max_relative = 1e-6);
    assert!(z.abs() < 1e-10);

    // Sliding friction sits on the cone boundary, opposing the motion.
    let lambda = simulation.interactions()[0].lambda(1).clone();
    assert_relative_eq!(lambda[1], -FRICTION * lambda[0], max_relative = 1e-9);
}
