use std::collections::VecDeque;

use crate::linalg::{Matrix, Vector};

use super::ModelError;

/// Number of derivative levels carried by states, inputs, and outputs.
pub const LEVELS: usize = 3;

/// Default number of committed states kept per system.
pub const DEFAULT_HISTORY_DEPTH: usize = 2;

/// Right-hand side `f(t, x)` of a nonlinear first-order system.
pub type VectorField = fn(f64, &Vector) -> Vector;

/// Jacobian `∂f/∂x (t, x)` of a [`VectorField`].
pub type VectorFieldJacobian = fn(f64, &Vector) -> Matrix;

/// Broad family of a dynamical system, used to pick integrators and levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum SystemKind {
    /// Second-order mechanical system in generalized coordinates.
    Lagrangian,
    /// First-order system `ẋ = f(t, x) + r`.
    FirstOrder,
}

/// Smooth dynamics of a system.
#[derive(Debug, Clone)]
pub enum Dynamics {
    /// `M q̈ + C q̇ + K q = f + p`.
    LagrangianLinear {
        mass: Matrix,
        stiffness: Matrix,
        damping: Matrix,
        force: Vector,
    },
    /// `ẋ = A x + b + r`.
    FirstOrderLinear { a: Matrix, b: Vector },
    /// `ẋ = f(t, x) + r`.
    FirstOrderNonLinear {
        field: VectorField,
        jacobian: VectorFieldJacobian,
    },
}

impl Dynamics {
    #[must_use]
    pub fn kind(&self) -> SystemKind {
        match self {
            Self::LagrangianLinear { .. } => SystemKind::Lagrangian,
            Self::FirstOrderLinear { .. } | Self::FirstOrderNonLinear { .. } => {
                SystemKind::FirstOrder
            }
        }
    }

    /// Returns `true` if the dynamics are linear in the state.
    #[must_use]
    pub fn is_linear(&self) -> bool {
        !matches!(self, Self::FirstOrderNonLinear { .. })
    }
}

/// State of a dynamical system.
///
/// Lagrangian systems use all three vectors. First-order systems store `x`
/// in `position` and leave the other two empty.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub position: Vector,
    pub velocity: Vector,
    pub acceleration: Vector,
}

impl State {
    /// Returns the vector for a derivative level: position, velocity, or
    /// acceleration.
    #[must_use]
    pub fn level(&self, level: usize) -> &Vector {
        match level {
            0 => &self.position,
            1 => &self.velocity,
            _ => &self.acceleration,
        }
    }
}

/// A dynamical system with its working state, free state, reaction inputs,
/// and a bounded history of committed states.
///
/// The working state is the candidate being computed for the current step.
/// It becomes part of the history only when [`commit`](Self::commit) is
/// called, so a rejected step can always be undone with
/// [`rollback`](Self::rollback).
#[derive(Debug, Clone)]
pub struct DynamicalSystem {
    dynamics: Dynamics,
    state: State,
    free: State,
    inputs: Vec<Vector>,
    history: VecDeque<State>,
    history_depth: usize,
}

impl DynamicalSystem {
    /// Creates a linear time-invariant Lagrangian system.
    ///
    /// # Errors
    ///
    /// Returns an error if any operator or initial condition does not match
    /// the size of `q0`.
    pub fn lagrangian_linear(
        mass: Matrix,
        stiffness: Matrix,
        damping: Matrix,
        force: Vector,
        q0: Vector,
        v0: Vector,
    ) -> Result<Self, ModelError> {
        let n = q0.len();
        if n == 0 {
            return Err(ModelError::EmptySystem);
        }
        check_shape("mass matrix", &mass, (n, n))?;
        check_shape("stiffness matrix", &stiffness, (n, n))?;
        check_shape("damping matrix", &damping, (n, n))?;
        check_length("external force", &force, n)?;
        check_length("initial velocity", &v0, n)?;

        let state = State {
            position: q0,
            velocity: v0,
            acceleration: Vector::zeros(n),
        };
        Ok(Self::from_parts(
            Dynamics::LagrangianLinear {
                mass,
                stiffness,
                damping,
                force,
            },
            state,
        ))
    }

    /// Creates a Lagrangian system subject only to a constant force.
    ///
    /// # Errors
    ///
    /// Returns an error if the mass matrix, force, or initial conditions do
    /// not match the size of `q0`.
    pub fn lagrangian(
        mass: Matrix,
        force: Vector,
        q0: Vector,
        v0: Vector,
    ) -> Result<Self, ModelError> {
        let n = q0.len();
        Self::lagrangian_linear(
            mass,
            Matrix::zeros((n, n)),
            Matrix::zeros((n, n)),
            force,
            q0,
            v0,
        )
    }

    /// Creates a linear first-order system `ẋ = A x + b + r`.
    ///
    /// # Errors
    ///
    /// Returns an error if `a` or `b` do not match the size of `x0`.
    pub fn first_order_linear(a: Matrix, b: Vector, x0: Vector) -> Result<Self, ModelError> {
        let n = x0.len();
        if n == 0 {
            return Err(ModelError::EmptySystem);
        }
        check_shape("state matrix", &a, (n, n))?;
        check_length("constant term", &b, n)?;

        Ok(Self::from_parts(
            Dynamics::FirstOrderLinear { a, b },
            first_order_state(x0),
        ))
    }

    /// Creates a nonlinear first-order system `ẋ = f(t, x) + r`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x0` is empty.
    pub fn first_order_nonlinear(
        field: VectorField,
        jacobian: VectorFieldJacobian,
        x0: Vector,
    ) -> Result<Self, ModelError> {
        if x0.is_empty() {
            return Err(ModelError::EmptySystem);
        }
        Ok(Self::from_parts(
            Dynamics::FirstOrderNonLinear { field, jacobian },
            first_order_state(x0),
        ))
    }

    /// Sets how many committed states are kept (at least one).
    #[must_use]
    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth.max(1);
        while self.history.len() > self.history_depth {
            self.history.pop_front();
        }
        self
    }

    fn from_parts(dynamics: Dynamics, state: State) -> Self {
        let n = state.position.len();
        let mut history = VecDeque::with_capacity(DEFAULT_HISTORY_DEPTH);
        history.push_back(state.clone());
        Self {
            dynamics,
            free: state.clone(),
            state,
            inputs: vec![Vector::zeros(n); LEVELS],
            history,
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SystemKind {
        self.dynamics.kind()
    }

    /// Returns the number of coordinates (`q` for Lagrangian, `x` otherwise).
    #[must_use]
    pub fn dim(&self) -> usize {
        self.state.position.len()
    }

    #[must_use]
    pub fn dynamics(&self) -> &Dynamics {
        &self.dynamics
    }

    /// Gives mutable access to the dynamics, e.g. for actuators that change
    /// the applied force between steps.
    pub fn dynamics_mut(&mut self) -> &mut Dynamics {
        &mut self.dynamics
    }

    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Returns the free (unconstrained) state of the current iterate.
    #[must_use]
    pub fn free_state(&self) -> &State {
        &self.free
    }

    pub fn free_state_mut(&mut self) -> &mut State {
        &mut self.free
    }

    /// Returns the reaction input at `level`.
    ///
    /// # Panics
    ///
    /// Panics if `level >= LEVELS`.
    #[must_use]
    pub fn input(&self, level: usize) -> &Vector {
        &self.inputs[level]
    }

    /// Returns the reaction input at `level` for accumulation.
    ///
    /// # Panics
    ///
    /// Panics if `level >= LEVELS`.
    pub fn input_mut(&mut self, level: usize) -> &mut Vector {
        &mut self.inputs[level]
    }

    /// Zeroes the reaction input at `level`.
    pub fn reset_input(&mut self, level: usize) {
        if let Some(input) = self.inputs.get_mut(level) {
            input.fill(0.0);
        }
    }

    /// Returns the last committed state.
    #[must_use]
    pub fn committed(&self) -> &State {
        self.history.back().unwrap_or(&self.state)
    }

    /// Iterates over committed states, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &State> {
        self.history.iter()
    }

    /// Pushes the working state into the bounded history.
    pub fn commit(&mut self) {
        if self.history.len() == self.history_depth {
            self.history.pop_front();
        }
        self.history.push_back(self.state.clone());
    }

    /// Restores the working and free states to the last committed state and
    /// clears the reaction inputs.
    pub fn rollback(&mut self) {
        let committed = self.committed().clone();
        self.free.clone_from(&committed);
        self.state = committed;
        for input in &mut self.inputs {
            input.fill(0.0);
        }
    }
}

fn first_order_state(x0: Vector) -> State {
    State {
        position: x0,
        velocity: Vector::zeros(0),
        acceleration: Vector::zeros(0),
    }
}

fn check_shape(
    what: &'static str,
    matrix: &Matrix,
    expected: (usize, usize),
) -> Result<(), ModelError> {
    if matrix.dim() == expected {
        Ok(())
    } else {
        Err(ModelError::Shape {
            what,
            expected,
            found: matrix.dim(),
        })
    }
}

fn check_length(what: &'static str, vector: &Vector, expected: usize) -> Result<(), ModelError> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(ModelError::Length {
            what,
            expected,
            found: vector.len(),
        })
    }
}
