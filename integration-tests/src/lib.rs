//! Shared scenarios for the integration tests.

use impulse_core::{
    Matrix,
    model::{
        DynamicalSystem, Interaction, InteractionId, Model, NonSmoothLaw, Relation, SystemId,
    },
    time::TimeDiscretisation,
};
use ndarray::array;

pub const GRAVITY: f64 = 9.81;

/// A unit-mass ball above the ground `q ≥ 0`.
pub fn bouncing_ball(height: f64, restitution: f64, t_final: f64) -> Model {
    let mut model = Model::new(0.0, t_final).expect("valid horizon");
    let ball = model.add_system(
        DynamicalSystem::lagrangian(
            array![[1.0]],
            array![-GRAVITY],
            array![height],
            array![0.0],
        )
        .expect("valid ball"),
    );
    let ground = Interaction::new(
        vec![ball],
        Relation::lagrangian(array![[1.0]]),
        NonSmoothLaw::newton_impact(restitution).expect("valid law"),
    )
    .expect("valid contact");
    model.add_interaction(ground).expect("should add contact");
    model
}

/// Handles into a [`two_bodies`] model.
pub struct TwoBodies {
    pub model: Model,
    pub lower: SystemId,
    pub upper: SystemId,
    pub ground: InteractionId,
    pub between: InteractionId,
}

/// Two unit-mass particles on a vertical line: `lower` rests on the
/// ground, `upper` starts `gap` above it.
pub fn two_bodies(gap: f64, restitution: f64, t_final: f64) -> TwoBodies {
    let mut model = Model::new(0.0, t_final).expect("valid horizon");
    let particle = |q: f64| {
        DynamicalSystem::lagrangian(array![[1.0]], array![-GRAVITY], array![q], array![0.0])
            .expect("valid particle")
    };
    let lower = model.add_system(particle(0.0));
    let upper = model.add_system(particle(gap));

    let ground = model
        .add_interaction(
            Interaction::new(
                vec![lower],
                Relation::lagrangian(array![[1.0]]),
                NonSmoothLaw::newton_impact(0.0).expect("valid law"),
            )
            .expect("valid contact"),
        )
        .expect("should add ground");
    let between = model
        .add_interaction(
            Interaction::new(
                vec![lower, upper],
                Relation::lagrangian(array![[-1.0, 1.0]]),
                NonSmoothLaw::newton_impact(restitution).expect("valid law"),
            )
            .expect("valid contact"),
        )
        .expect("should add contact between bodies");

    TwoBodies {
        model,
        lower,
        upper,
        ground,
        between,
    }
}

/// A unit-mass block with coordinates `(x, z)` resting on the floor
/// `z ≥ 0`, pushed along `x` by `push`. The contact's normal row is `z`
/// and its tangent row `x`.
pub fn sliding_block(push: f64, friction: f64, t_final: f64) -> (Model, SystemId, InteractionId) {
    let mut model = Model::new(0.0, t_final).expect("valid horizon");
    let block = model.add_system(
        DynamicalSystem::lagrangian(
            Matrix::eye(2),
            array![push, -GRAVITY],
            array![0.0, 0.0],
            array![0.0, 0.0],
        )
        .expect("valid block"),
    );
    let floor = model
        .add_interaction(
            Interaction::new(
                vec![block],
                Relation::lagrangian(array![[0.0, 1.0], [1.0, 0.0]]),
                NonSmoothLaw::newton_impact_friction(0.0, friction, 2).expect("valid law"),
            )
            .expect("valid contact"),
        )
        .expect("should add floor");
    (model, block, floor)
}

/// A static relay `λ ∈ −sgn(y)·α` driven by a frozen first-order state
/// `s`: the output is `y = s + λ` and the reaction does not feed back.
pub fn static_relay(s: f64, alpha: f64) -> Model {
    let mut model = Model::new(0.0, 1.0).expect("valid horizon");
    let source = model.add_system(
        DynamicalSystem::first_order_linear(array![[0.0]], array![0.0], array![s])
            .expect("valid source"),
    );
    let relation = Relation::first_order_linear(
        array![[1.0]],
        array![[1.0]],
        Matrix::zeros((1, 1)),
        array![0.0],
    )
    .expect("valid relation");
    model
        .add_interaction(
            Interaction::new(
                vec![source],
                relation,
                NonSmoothLaw::symmetric_relay(1, alpha).expect("valid relay"),
            )
            .expect("valid relay interaction"),
        )
        .expect("should add relay");
    model
}

pub fn uniform(h: f64) -> TimeDiscretisation {
    TimeDiscretisation::uniform(0.0, h).expect("valid clock")
}
