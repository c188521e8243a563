use ndarray::{ArrayView2, s};

use crate::linalg::{Matrix, Vector};

use super::{ModelError, SystemKind};

/// Linear relation between system coordinates and interaction outputs.
///
/// Operators span the stacked coordinates of every coupled system, in the
/// order the systems are listed on the interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// `y = H q + b` with reaction `p = Hᵀ λ`.
    LagrangianLinear { h: Matrix, b: Vector },
    /// `y = C x + D λ + e` with reaction `r = B λ`.
    FirstOrderLinear {
        c: Matrix,
        d: Matrix,
        b: Matrix,
        e: Vector,
    },
}

impl Relation {
    /// Creates `y = H q + b`.
    ///
    /// # Errors
    ///
    /// Returns an error if `b` does not have one entry per row of `h`.
    pub fn lagrangian_linear(h: Matrix, b: Vector) -> Result<Self, ModelError> {
        if b.len() != h.nrows() {
            return Err(ModelError::Length {
                what: "relation offset",
                expected: h.nrows(),
                found: b.len(),
            });
        }
        Ok(Self::LagrangianLinear { h, b })
    }

    /// Creates `y = H q`.
    #[must_use]
    pub fn lagrangian(h: Matrix) -> Self {
        let b = Vector::zeros(h.nrows());
        Self::LagrangianLinear { h, b }
    }

    /// Creates `y = C x + D λ + e` with `r = B λ`.
    ///
    /// # Errors
    ///
    /// Returns an error if `d`, `b`, or `e` do not match the shape of `c`.
    pub fn first_order_linear(
        c: Matrix,
        d: Matrix,
        b: Matrix,
        e: Vector,
    ) -> Result<Self, ModelError> {
        let (m, n) = c.dim();
        if d.dim() != (m, m) {
            return Err(ModelError::Shape {
                what: "feedthrough matrix",
                expected: (m, m),
                found: d.dim(),
            });
        }
        if b.dim() != (n, m) {
            return Err(ModelError::Shape {
                what: "input matrix",
                expected: (n, m),
                found: b.dim(),
            });
        }
        if e.len() != m {
            return Err(ModelError::Length {
                what: "relation offset",
                expected: m,
                found: e.len(),
            });
        }
        Ok(Self::FirstOrderLinear { c, d, b, e })
    }

    #[must_use]
    pub fn kind(&self) -> SystemKind {
        match self {
            Self::LagrangianLinear { .. } => SystemKind::Lagrangian,
            Self::FirstOrderLinear { .. } => SystemKind::FirstOrder,
        }
    }

    /// Returns the number of outputs.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.output_operator().nrows()
    }

    /// Returns the number of stacked system coordinates.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.output_operator().ncols()
    }

    /// Returns `H` or `C`.
    #[must_use]
    pub fn output_operator(&self) -> &Matrix {
        match self {
            Self::LagrangianLinear { h, .. } => h,
            Self::FirstOrderLinear { c, .. } => c,
        }
    }

    /// Returns the output columns acting on one system's coordinates.
    #[must_use]
    pub fn jacobian_block(&self, offset: usize, dim: usize) -> ArrayView2<'_, f64> {
        self.output_operator().slice(s![.., offset..offset + dim])
    }

    /// Returns the operator mapping `λ` to one system's reaction input.
    #[must_use]
    pub fn input_block(&self, offset: usize, dim: usize) -> Matrix {
        match self {
            Self::LagrangianLinear { h, .. } => {
                h.slice(s![.., offset..offset + dim]).t().to_owned()
            }
            Self::FirstOrderLinear { b, .. } => b.slice(s![offset..offset + dim, ..]).to_owned(),
        }
    }

    /// Returns the direct feedthrough `D`, if any.
    #[must_use]
    pub fn feedthrough(&self) -> Option<&Matrix> {
        match self {
            Self::LagrangianLinear { .. } => None,
            Self::FirstOrderLinear { d, .. } => Some(d),
        }
    }

    /// Returns the constant output term (`b` or `e`).
    #[must_use]
    pub fn offset(&self) -> &Vector {
        match self {
            Self::LagrangianLinear { b, .. } => b,
            Self::FirstOrderLinear { e, .. } => e,
        }
    }
}
