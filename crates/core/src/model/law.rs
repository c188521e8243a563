use crate::linalg::Vector;

use super::ModelError;

/// Non-smooth law relating an interaction's output to its reaction.
#[derive(Debug, Clone, PartialEq)]
pub enum NonSmoothLaw {
    /// `0 ≤ y ⊥ λ ≥ 0`.
    Complementarity { size: usize },
    /// Unilateral contact with Newton's impact law `ẏ⁺ = -e ẏ⁻`.
    NewtonImpact { restitution: f64 },
    /// `-y ∈ N_[lower, upper](λ)`.
    Relay { lower: Vector, upper: Vector },
    /// `y = 0`, always active.
    Equality { size: usize },
    /// Unilateral contact with Coulomb friction.
    ///
    /// Row 0 is the normal direction, following Newton's impact law; the
    /// remaining one or two rows are tangent directions whose reaction lies
    /// in the disk of radius `friction · λ_n`.
    NewtonImpactFriction {
        restitution: f64,
        friction: f64,
        size: usize,
    },
}

impl NonSmoothLaw {
    /// Creates a complementarity law of the given size.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero.
    pub fn complementarity(size: usize) -> Result<Self, ModelError> {
        if size == 0 {
            return Err(ModelError::EmptyLaw);
        }
        Ok(Self::Complementarity { size })
    }

    /// Creates a scalar Newton impact law.
    ///
    /// # Errors
    ///
    /// Returns an error if `restitution` is outside `[0, 1]`.
    pub fn newton_impact(restitution: f64) -> Result<Self, ModelError> {
        if !(0.0..=1.0).contains(&restitution) {
            return Err(ModelError::Restitution(restitution));
        }
        Ok(Self::NewtonImpact { restitution })
    }

    /// Creates a frictional contact law with one normal row and
    /// `size - 1` tangent rows.
    ///
    /// # Errors
    ///
    /// Returns an error if `restitution` is outside `[0, 1]`, `friction` is
    /// negative or not finite, or `size` is not 2 (planar) or 3 (spatial).
    pub fn newton_impact_friction(
        restitution: f64,
        friction: f64,
        size: usize,
    ) -> Result<Self, ModelError> {
        if !(0.0..=1.0).contains(&restitution) {
            return Err(ModelError::Restitution(restitution));
        }
        if !(friction.is_finite() && friction >= 0.0) {
            return Err(ModelError::FrictionCoefficient(friction));
        }
        if !(2..=3).contains(&size) {
            return Err(ModelError::FrictionSize(size));
        }
        Ok(Self::NewtonImpactFriction {
            restitution,
            friction,
            size,
        })
    }

    /// Creates a relay law with per-component bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds are empty, differ in length, are not
    /// finite, or are not ordered.
    pub fn relay(lower: Vector, upper: Vector) -> Result<Self, ModelError> {
        if lower.is_empty() {
            return Err(ModelError::EmptyLaw);
        }
        let valid = lower.len() == upper.len()
            && lower
                .iter()
                .zip(upper.iter())
                .all(|(lo, hi)| lo.is_finite() && hi.is_finite() && lo <= hi);
        if !valid {
            return Err(ModelError::RelayBounds);
        }
        Ok(Self::Relay { lower, upper })
    }

    /// Creates a relay law bounded by `[-alpha, alpha]` in every component.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero or `alpha` is negative or not finite.
    pub fn symmetric_relay(size: usize, alpha: f64) -> Result<Self, ModelError> {
        Self::relay(Vector::from_elem(size, -alpha), Vector::from_elem(size, alpha))
    }

    /// Creates an equality law of the given size.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero.
    pub fn equality(size: usize) -> Result<Self, ModelError> {
        if size == 0 {
            return Err(ModelError::EmptyLaw);
        }
        Ok(Self::Equality { size })
    }

    /// Returns the number of constraint rows.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Complementarity { size }
            | Self::Equality { size }
            | Self::NewtonImpactFriction { size, .. } => *size,
            Self::NewtonImpact { .. } => 1,
            Self::Relay { lower, .. } => lower.len(),
        }
    }

    /// Returns `true` for laws that are enforced at every level.
    #[must_use]
    pub fn is_equality(&self) -> bool {
        matches!(self, Self::Equality { .. })
    }

    /// Returns `true` for laws that can open and close: complementarity,
    /// Newton impact, and frictional contact.
    #[must_use]
    pub fn is_unilateral(&self) -> bool {
        matches!(
            self,
            Self::Complementarity { .. }
                | Self::NewtonImpact { .. }
                | Self::NewtonImpactFriction { .. }
        )
    }

    /// Evaluates the activation predicate on an output and its rate.
    ///
    /// Unilateral laws are active while the gap is closed (`y ≤ tol`) and
    /// not opening (`ẏ ≤ tol`). Relays and equalities are always active.
    #[must_use]
    pub fn is_active(&self, y: f64, y_dot: f64, tolerance: f64) -> bool {
        self.is_closed(y, tolerance) && (!self.is_unilateral() || y_dot <= tolerance)
    }

    /// Evaluates the gap-only activation predicate.
    ///
    /// Unilateral laws are active while `y ≤ tol`, whatever the rate.
    /// Relays and equalities are always active.
    #[must_use]
    pub fn is_closed(&self, y: f64, tolerance: f64) -> bool {
        !self.is_unilateral() || y <= tolerance
    }

    /// Returns the admissible interval `[lo, hi]` of `λ` for a row.
    ///
    /// Tangent rows of a frictional contact are unbounded here; their
    /// reaction is limited by the friction cone instead.
    #[must_use]
    pub fn bounds(&self, row: usize) -> (f64, f64) {
        match self {
            Self::Complementarity { .. } | Self::NewtonImpact { .. } => (0.0, f64::INFINITY),
            Self::NewtonImpactFriction { .. } if row == 0 => (0.0, f64::INFINITY),
            Self::Relay { lower, upper } => (lower[row], upper[row]),
            Self::Equality { .. } | Self::NewtonImpactFriction { .. } => {
                (f64::NEG_INFINITY, f64::INFINITY)
            }
        }
    }

    /// Returns the restitution coefficient, zero for laws without impact.
    #[must_use]
    pub fn restitution(&self) -> f64 {
        match self {
            Self::NewtonImpact { restitution } | Self::NewtonImpactFriction { restitution, .. } => {
                *restitution
            }
            _ => 0.0,
        }
    }

    /// Returns the friction coefficient of a frictional contact.
    #[must_use]
    pub fn friction(&self) -> Option<f64> {
        match self {
            Self::NewtonImpactFriction { friction, .. } => Some(*friction),
            _ => None,
        }
    }

    /// Returns the velocity shift `e · ẏ⁻` added by Newton's impact law, or
    /// `None` for laws without restitution.
    ///
    /// Only the normal row of a frictional contact is shifted.
    #[must_use]
    pub fn impact_shift(&self, pre_impact: &Vector) -> Option<Vector> {
        let restitution = self.restitution();
        if restitution <= 0.0 {
            return None;
        }
        let mut shift = Vector::zeros(self.size());
        match self {
            Self::NewtonImpactFriction { .. } => shift[0] = restitution * pre_impact[0],
            _ => shift.assign(&(pre_impact * restitution)),
        }
        Some(shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    #[test]
    fn unilateral_activation_needs_closed_and_non_separating() {
        let law = NonSmoothLaw::newton_impact(0.5).expect("valid law");
        let tol = 1e-9;

        assert!(!law.is_active(0.1, -1.0, tol));
        assert!(law.is_active(0.0, -1.0, tol));
        assert!(law.is_active(-1e-3, 0.0, tol));
        assert!(!law.is_active(0.0, 0.5, tol));
        assert!(law.is_unilateral());
    }

    #[test]
    fn relay_and_equality_are_always_active() {
        let relay = NonSmoothLaw::symmetric_relay(1, 2.0).expect("valid relay");
        let equality = NonSmoothLaw::equality(2).expect("valid law");

        assert!(relay.is_active(5.0, 5.0, 0.0));
        assert!(equality.is_active(5.0, 5.0, 0.0));
        assert!(equality.is_equality());
        assert!(!relay.is_unilateral());
        assert_eq!(relay.bounds(0), (-2.0, 2.0));
        assert_eq!(equality.size(), 2);
    }

    #[test]
    fn gap_only_predicate_ignores_the_rate() {
        let law = NonSmoothLaw::newton_impact(0.0).expect("valid law");
        let tol = 10.0 * f64::EPSILON;

        assert!(law.is_closed(5.96e-16, tol));
        assert!(!law.is_active(5.96e-16, 2.3e-15, tol));
        assert!(!law.is_closed(1e-3, tol));
    }

    #[test]
    fn friction_law_has_normal_and_tangent_rows() {
        let planar = NonSmoothLaw::newton_impact_friction(0.5, 0.3, 2).expect("valid law");

        assert_eq!(planar.size(), 2);
        assert!(planar.is_unilateral());
        assert_eq!(planar.friction(), Some(0.3));
        assert_eq!(planar.bounds(0), (0.0, f64::INFINITY));
        assert_eq!(planar.bounds(1), (f64::NEG_INFINITY, f64::INFINITY));

        let shift = planar.impact_shift(&array![-2.0, 4.0]).expect("has restitution");
        assert_eq!(shift, array![-1.0, 0.0]);
        let plastic = NonSmoothLaw::newton_impact(0.0).expect("valid law");
        assert_eq!(plastic.impact_shift(&array![-2.0]), None);
    }

    #[test]
    fn rejects_invalid_laws() {
        assert_eq!(NonSmoothLaw::complementarity(0), Err(ModelError::EmptyLaw));
        assert_eq!(
            NonSmoothLaw::newton_impact(1.5),
            Err(ModelError::Restitution(1.5))
        );
        assert_eq!(
            NonSmoothLaw::relay(array![1.0], array![-1.0]),
            Err(ModelError::RelayBounds)
        );
        assert_eq!(
            NonSmoothLaw::symmetric_relay(1, -1.0),
            Err(ModelError::RelayBounds)
        );
        assert_eq!(
            NonSmoothLaw::newton_impact_friction(0.0, -0.1, 2),
            Err(ModelError::FrictionCoefficient(-0.1))
        );
        assert_eq!(
            NonSmoothLaw::newton_impact_friction(0.0, 0.3, 4),
            Err(ModelError::FrictionSize(4))
        );
    }
}
