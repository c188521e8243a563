//! Euler–Moreau θ-method for `ẋ = f(t, x) + r`.
//!
//! ```text
//! R_free(x) = x − x_k − h [ θ f(t_{k+1}, x) + (1 − θ) f(t_k, x_k) ]
//! W         = I − h θ ∂f/∂x (t_{k+1}, x^α)
//! ```
//!
//! The reaction enters as `h r` with `r = B λ`.

use impulse_core::{
    LinalgError, Lu, Matrix, Vector,
    model::{DynamicalSystem, Dynamics, State},
};

use super::Window;

fn field(dynamics: &Dynamics, t: f64, x: &Vector) -> Vector {
    match dynamics {
        Dynamics::FirstOrderLinear { a, b } => a.dot(x) + b,
        Dynamics::FirstOrderNonLinear { field, .. } => field(t, x),
        Dynamics::LagrangianLinear { .. } => Vector::zeros(x.len()),
    }
}

fn jacobian(dynamics: &Dynamics, t: f64, x: &Vector) -> Matrix {
    match dynamics {
        Dynamics::FirstOrderLinear { a, .. } => a.clone(),
        Dynamics::FirstOrderNonLinear { jacobian, .. } => jacobian(t, x),
        Dynamics::LagrangianLinear { .. } => Matrix::zeros((x.len(), x.len())),
    }
}

pub(super) fn iteration_matrix(system: &DynamicalSystem, theta: f64, window: Window) -> Matrix {
    let x = &system.state().position;
    let j = jacobian(system.dynamics(), window.t_next(), x);
    Matrix::eye(x.len()) - &(j * (window.h * theta))
}

pub(super) fn free_residual(
    system: &DynamicalSystem,
    theta: f64,
    window: Window,
    x: &Vector,
) -> Vector {
    let dynamics = system.dynamics();
    let x_k = &system.committed().position;
    let f_next = field(dynamics, window.t_next(), x);
    let f_k = field(dynamics, window.t, x_k);

    x - x_k - &((f_next * theta + &(f_k * (1.0 - theta))) * window.h)
}

pub(super) fn free_state(
    system: &DynamicalSystem,
    theta: f64,
    window: Window,
    lu: &Lu,
) -> Result<State, LinalgError> {
    let iterate = &system.state().position;
    let position = iterate - &lu.solve(&free_residual(system, theta, window, iterate))?;
    Ok(first_order(position))
}

pub(super) fn corrected_state(
    system: &DynamicalSystem,
    h: f64,
    lu: &Lu,
) -> Result<State, LinalgError> {
    let correction = lu.solve(&(system.input(0) * h))?;
    Ok(first_order(&system.free_state().position + &correction))
}

fn first_order(position: Vector) -> State {
    State {
        position,
        velocity: Vector::zeros(0),
        acceleration: Vector::zeros(0),
    }
}
