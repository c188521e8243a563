//! Moreau–Jean scheme for `M q̈ + C q̇ + K q = f + p`.
//!
//! With `q(v) = q_k + h (θ v + (1 − θ) v_k)`:
//!
//! ```text
//! R_free(v) = M (v − v_k) + h [ C (θ v + (1 − θ) v_k) + K (θ q(v) + (1 − θ) q_k) − f ]
//! W         = M + h θ C + h² θ² K
//! ```
//!
//! and the reaction is the impulse `p = Hᵀ λ` over the step.

use impulse_core::{
    LinalgError, Lu, Matrix, Vector,
    model::{DynamicalSystem, Dynamics, State},
};

pub(super) fn iteration_matrix(system: &DynamicalSystem, theta: f64, h: f64) -> Matrix {
    match system.dynamics() {
        Dynamics::LagrangianLinear {
            mass,
            stiffness,
            damping,
            ..
        } => mass + &(damping * (h * theta)) + &(stiffness * (h * h * theta * theta)),
        Dynamics::FirstOrderLinear { a, .. } => Matrix::eye(a.nrows()),
        Dynamics::FirstOrderNonLinear { .. } => Matrix::eye(system.dim()),
    }
}

pub(super) fn position(system: &DynamicalSystem, theta: f64, h: f64, v: &Vector) -> Vector {
    let committed = system.committed();
    &committed.position + &((v * theta + &committed.velocity * (1.0 - theta)) * h)
}

pub(super) fn free_residual(system: &DynamicalSystem, theta: f64, h: f64, v: &Vector) -> Vector {
    let Dynamics::LagrangianLinear {
        mass,
        stiffness,
        damping,
        force,
    } = system.dynamics()
    else {
        return Vector::zeros(v.len());
    };

    let committed = system.committed();
    let v_mid = v * theta + &committed.velocity * (1.0 - theta);
    let q_mid = position(system, theta, h, v) * theta + &committed.position * (1.0 - theta);
    let smooth = damping.dot(&v_mid) + stiffness.dot(&q_mid) - force;

    mass.dot(&(v - &committed.velocity)) + &(smooth * h)
}

pub(super) fn free_state(
    system: &DynamicalSystem,
    theta: f64,
    h: f64,
    lu: &Lu,
) -> Result<State, LinalgError> {
    let iterate = &system.state().velocity;
    let velocity = iterate - &lu.solve(&free_residual(system, theta, h, iterate))?;
    Ok(kinematics(system, theta, h, velocity))
}

pub(super) fn corrected_state(
    system: &DynamicalSystem,
    theta: f64,
    h: f64,
    lu: &Lu,
) -> Result<State, LinalgError> {
    let velocity = &system.free_state().velocity + &lu.solve(system.input(1))?;
    Ok(kinematics(system, theta, h, velocity))
}

fn kinematics(system: &DynamicalSystem, theta: f64, h: f64, velocity: Vector) -> State {
    let position = position(system, theta, h, &velocity);
    let acceleration = (&velocity - &system.committed().velocity) / h;
    State {
        position,
        velocity,
        acceleration,
    }
}
