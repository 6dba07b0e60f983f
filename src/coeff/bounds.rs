use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How an out-of-range coefficient is turned into a soft penalty
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BoundsPenaltyForm {
    /// `scale * excess^2`
    #[default]
    Quadratic,
    /// `scale * excess`
    Linear,
}

impl BoundsPenaltyForm {
    #[inline]
    pub fn penalty(self, scale: f64, excess: f64) -> f64 {
        match self {
            Self::Quadratic => scale * excess * excess,
            Self::Linear => scale * excess,
        }
    }
}

/// Distance by which `x` lies outside `[lower, upper]`, zero inside
#[inline]
pub(super) fn bound_excess(x: f64, lower: f64, upper: f64) -> f64 {
    if x < lower {
        lower - x
    } else if x > upper {
        x - upper
    } else {
        0.0
    }
}

pub(super) fn within_bounds<'a>(
    x: impl IntoIterator<Item = &'a f64>,
    limits: impl IntoIterator<Item = (f64, f64)>,
) -> bool {
    x.into_iter()
        .zip(limits)
        .all(|(&x, (lower, upper))| x >= lower && x <= upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excess_is_zero_inside() {
        assert_eq!(bound_excess(0.0, -1.0, 1.0), 0.0);
        assert_eq!(bound_excess(1.0, -1.0, 1.0), 0.0);
        assert_eq!(bound_excess(-1.0, -1.0, 1.0), 0.0);
    }

    #[test]
    fn excess_measures_distance_to_nearest_limit() {
        assert_eq!(bound_excess(1.5, -1.0, 1.0), 0.5);
        assert_eq!(bound_excess(-3.0, -1.0, 1.0), 2.0);
    }

    #[test]
    fn infinite_limits_never_penalize() {
        assert_eq!(bound_excess(1e300, f64::NEG_INFINITY, f64::INFINITY), 0.0);
    }

    #[test]
    fn penalty_forms() {
        assert_eq!(BoundsPenaltyForm::Quadratic.penalty(100.0, 0.5), 25.0);
        assert_eq!(BoundsPenaltyForm::Linear.penalty(100.0, 0.5), 50.0);
    }

    #[test]
    fn within_bounds_checks_every_dimension() {
        let limits = [(0.0, 1.0), (-1.0, 1.0)];
        assert!(within_bounds(&[0.5, 0.0], limits));
        assert!(!within_bounds(&[0.5, 1.5], limits));
    }
}
