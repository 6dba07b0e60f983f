//! Coefficient vectors and their per-dimension metadata.
//!
//! A coefficient vector is a flat `Array1<f64>` whose layout is fixed by the model (see
//! [HandCoeff]). Every dimension carries a [CoeffDim]: soft limits, the scale of the soft
//! penalty for leaving them, whether the dimension is an angle, and the optimizer's search
//! radius around a seed. Angle dimensions live on the circle `[-π, π)`, so they are wrapped
//! instead of clamped and moved along the shortest arc.

mod angle;
pub use angle::{shortest_arc, wrap_angle};

mod bounds;
pub use bounds::BoundsPenaltyForm;
use bounds::{bound_excess, within_bounds};

mod hand_coeff;
pub use hand_coeff::{
    CoeffRecord, FINGER_NUM_COEFF, FingerCoeff, HAND_NUM_COEFF, HandCoeff, HandShape, NUM_FINGERS,
    default_hand_coeffs,
};

use crate::error::ConfigurationError;

use ndarray::{ArrayView1, ArrayViewMut1};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata of a single coefficient dimension
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CoeffDim {
    /// Soft lower limit, may be `-inf`
    pub min: f64,
    /// Soft upper limit, may be `+inf`
    pub max: f64,
    /// Weight of the bounds penalty, zero disables it
    pub penalty_scale: f64,
    /// Angle dimensions are wrapped into `[-π, π)` and differenced along the shortest arc
    pub is_angle: bool,
    /// Half-width of the optimizer search box and velocity clamp, zero freezes the dimension
    pub pso_radius: f64,
}

impl CoeffDim {
    pub fn new(min: f64, max: f64, penalty_scale: f64, is_angle: bool, pso_radius: f64) -> Self {
        Self {
            min,
            max,
            penalty_scale,
            is_angle,
            pso_radius,
        }
    }

    /// Dimension which is never moved by the optimizer
    pub fn is_frozen(&self) -> bool {
        self.pso_radius == 0.0
    }

    fn validate(&self, index: usize) -> Result<(), ConfigurationError> {
        for (value, what) in [
            (self.min, "min limit"),
            (self.max, "max limit"),
            (self.penalty_scale, "penalty scale"),
            (self.pso_radius, "PSO radius"),
        ] {
            if value.is_nan() {
                return Err(ConfigurationError::NanValue { index, what });
            }
        }
        if self.min > self.max {
            return Err(ConfigurationError::InvertedLimits {
                index,
                min: self.min,
                max: self.max,
            });
        }
        for (value, what) in [
            (self.penalty_scale, "penalty scale"),
            (self.pso_radius, "PSO radius"),
        ] {
            if value < 0.0 {
                return Err(ConfigurationError::NegativeValue { index, what, value });
            }
        }
        Ok(())
    }

    /// Signed displacement from `from` to `to`, along the shortest arc for angles
    #[inline]
    pub fn displacement(&self, from: f64, to: f64) -> f64 {
        if self.is_angle {
            shortest_arc(from, to)
        } else {
            to - from
        }
    }

    /// Map a value into the canonical range of this dimension
    #[inline]
    pub fn wrap(&self, x: f64) -> f64 {
        if self.is_angle { wrap_angle(x) } else { x }
    }
}

/// Validated per-dimension metadata of a coefficient vector
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CoeffMetadata {
    dims: Vec<CoeffDim>,
}

impl CoeffMetadata {
    /// Create a new [CoeffMetadata] from per-dimension records
    ///
    /// Returns [ConfigurationError] if any record has NaN fields, `min > max`, or a negative
    /// penalty scale or search radius.
    pub fn new(dims: Vec<CoeffDim>) -> Result<Self, ConfigurationError> {
        for (index, dim) in dims.iter().enumerate() {
            dim.validate(index)?;
        }
        Ok(Self { dims })
    }

    /// Create a new [CoeffMetadata] from parallel tables
    ///
    /// # Arguments
    /// - `min`, `max`: soft limits
    /// - `penalty_scale`: bounds penalty weights
    /// - `is_angle`: angle flags
    /// - `pso_radius`: optimizer search radii
    ///
    /// All tables must have the same length as `min`.
    pub fn from_tables(
        min: &[f64],
        max: &[f64],
        penalty_scale: &[f64],
        is_angle: &[bool],
        pso_radius: &[f64],
    ) -> Result<Self, ConfigurationError> {
        let expected = min.len();
        for (table, actual) in [
            ("max", max.len()),
            ("penalty_scale", penalty_scale.len()),
            ("is_angle", is_angle.len()),
            ("pso_radius", pso_radius.len()),
        ] {
            if actual != expected {
                return Err(ConfigurationError::TableLength {
                    table,
                    actual,
                    expected,
                });
            }
        }
        let dims = (0..expected)
            .map(|i| CoeffDim::new(min[i], max[i], penalty_scale[i], is_angle[i], pso_radius[i]))
            .collect();
        Self::new(dims)
    }

    /// Metadata of the 48-dimensional hand layout
    pub fn hand() -> Self {
        hand_coeff::HAND_METADATA.clone()
    }

    /// Concatenate metadata of several models into one flat layout
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a CoeffMetadata>) -> Self {
        Self {
            dims: parts
                .into_iter()
                .flat_map(|part| part.dims.iter().copied())
                .collect(),
        }
    }

    /// Set the search radius of the given dimensions to zero, so the optimizer keeps them fixed
    pub fn freeze(
        mut self,
        indices: impl IntoIterator<Item = usize>,
    ) -> Result<Self, ConfigurationError> {
        for index in indices {
            self.dim_mut(index)?.pso_radius = 0.0;
        }
        Ok(self)
    }

    pub fn with_pso_radius(
        mut self,
        index: usize,
        radius: f64,
    ) -> Result<Self, ConfigurationError> {
        let dim = self.dim_mut(index)?;
        dim.pso_radius = radius;
        dim.validate(index)?;
        Ok(self)
    }

    fn dim_mut(&mut self, index: usize) -> Result<&mut CoeffDim, ConfigurationError> {
        let len = self.dims.len();
        self.dims
            .get_mut(index)
            .ok_or(ConfigurationError::CoeffIndex { index, len })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    #[inline]
    pub fn dims(&self) -> &[CoeffDim] {
        &self.dims
    }

    #[inline]
    pub fn dim(&self, index: usize) -> Option<&CoeffDim> {
        self.dims.get(index)
    }

    /// Check that `coeffs` has the length of this layout
    pub fn check_len(&self, coeffs: ArrayView1<f64>) -> Result<(), ConfigurationError> {
        if coeffs.len() == self.len() {
            Ok(())
        } else {
            Err(ConfigurationError::CoeffLength {
                actual: coeffs.len(),
                expected: self.len(),
            })
        }
    }

    /// Whether every coefficient lies within its soft limits
    pub fn within_limits(&self, coeffs: ArrayView1<f64>) -> bool {
        within_bounds(coeffs.iter(), self.dims.iter().map(|dim| (dim.min, dim.max)))
    }

    /// Soft penalty for coefficients outside their limits, zero when all are inside
    pub fn bounds_penalty(&self, coeffs: ArrayView1<f64>, form: BoundsPenaltyForm) -> f64 {
        coeffs
            .iter()
            .zip(&self.dims)
            .filter(|(_, dim)| dim.penalty_scale > 0.0)
            .map(|(&x, dim)| form.penalty(dim.penalty_scale, bound_excess(x, dim.min, dim.max)))
            .sum()
    }

    /// Wrap angle dimensions into `[-π, π)` in place, other dimensions are left as they are
    pub fn wrap(&self, mut coeffs: ArrayViewMut1<f64>) {
        coeffs
            .iter_mut()
            .zip(&self.dims)
            .for_each(|(x, dim)| *x = dim.wrap(*x));
    }

    /// Signed displacement along dimension `index`, shortest-arc for angles
    #[inline]
    pub fn displacement(&self, index: usize, from: f64, to: f64) -> f64 {
        self.dims[index].displacement(from, to)
    }

    /// Search box `seed ± pso_radius` per dimension
    pub fn seed_bounds(&self, seed: ArrayView1<f64>) -> Vec<(f64, f64)> {
        seed.iter()
            .zip(&self.dims)
            .map(|(&x, dim)| (x - dim.pso_radius, x + dim.pso_radius))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::f64::consts::PI;

    fn two_dim() -> CoeffMetadata {
        CoeffMetadata::from_tables(
            &[-1.0, f64::NEG_INFINITY],
            &[1.0, f64::INFINITY],
            &[100.0, 0.0],
            &[true, false],
            &[0.5, 10.0],
        )
        .unwrap()
    }

    #[test]
    fn tables_must_have_equal_length() {
        let err =
            CoeffMetadata::from_tables(&[0.0, 0.0], &[1.0], &[0.0, 0.0], &[false; 2], &[0.0; 2])
                .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::TableLength {
                table: "max",
                actual: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn inverted_limits_are_rejected() {
        let err = CoeffMetadata::new(vec![CoeffDim::new(1.0, -1.0, 0.0, false, 0.0)]).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvertedLimits { index: 0, .. }));
    }

    #[test]
    fn nan_and_negative_fields_are_rejected() {
        let err =
            CoeffMetadata::new(vec![CoeffDim::new(f64::NAN, 1.0, 0.0, false, 0.0)]).unwrap_err();
        assert!(matches!(err, ConfigurationError::NanValue { index: 0, .. }));
        let err = CoeffMetadata::new(vec![
            CoeffDim::new(0.0, 1.0, 0.0, false, 0.0),
            CoeffDim::new(0.0, 1.0, -1.0, false, 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::NegativeValue { index: 1, .. }));
    }

    #[test]
    fn bounds_penalty_is_zero_inside_limits() {
        let meta = two_dim();
        assert_eq!(meta.bounds_penalty(array![0.5, 1e6].view(), BoundsPenaltyForm::Quadratic), 0.0);
        assert!(meta.within_limits(array![0.5, 1e6].view()));
    }

    #[test]
    fn bounds_penalty_grows_outside_limits() {
        let meta = two_dim();
        let near = meta.bounds_penalty(array![1.1, 0.0].view(), BoundsPenaltyForm::Quadratic);
        let far = meta.bounds_penalty(array![1.2, 0.0].view(), BoundsPenaltyForm::Quadratic);
        assert_abs_diff_eq!(near, 1.0, epsilon = 1e-9);
        assert!(far > near);
        assert!(!meta.within_limits(array![1.1, 0.0].view()));
    }

    #[test]
    fn wrap_touches_angles_only() {
        let meta = two_dim();
        let mut x = array![PI + 0.5, 100.0];
        meta.wrap(x.view_mut());
        assert_abs_diff_eq!(x[0], -PI + 0.5, epsilon = 1e-12);
        assert_eq!(x[1], 100.0);
    }

    #[test]
    fn displacement_uses_shortest_arc_for_angles() {
        let meta = two_dim();
        assert_abs_diff_eq!(meta.displacement(0, 3.0, -3.0), 2.0 * PI - 6.0, epsilon = 1e-12);
        assert_eq!(meta.displacement(1, 3.0, -3.0), -6.0);
    }

    #[test]
    fn freeze_zeroes_radius() {
        let meta = two_dim().freeze([1]).unwrap();
        assert!(meta.dims()[1].is_frozen());
        assert!(!meta.dims()[0].is_frozen());
        assert!(two_dim().freeze([2]).is_err());
    }

    #[test]
    fn with_pso_radius_validates() {
        assert!(two_dim().with_pso_radius(0, -1.0).is_err());
        let meta = two_dim().with_pso_radius(0, 0.25).unwrap();
        assert_eq!(meta.dims()[0].pso_radius, 0.25);
    }

    #[test]
    fn concat_joins_layouts() {
        let meta = CoeffMetadata::concat([&two_dim(), &two_dim().freeze([0]).unwrap()]);
        assert_eq!(meta.len(), 4);
        assert!(!meta.dims()[0].is_frozen());
        assert!(meta.dims()[2].is_frozen());
    }

    #[test]
    fn seed_bounds_span_radius() {
        let meta = two_dim();
        let bounds = meta.seed_bounds(array![0.0, 5.0].view());
        assert_eq!(bounds, vec![(-0.5, 0.5), (-5.0, 15.0)]);
    }

    #[test]
    fn serde_round_trip() {
        // JSON has no infinities, so the round trip uses finite limits
        let meta = CoeffMetadata::from_tables(
            &[-1.0, -2.0],
            &[1.0, 2.0],
            &[100.0, 0.0],
            &[true, false],
            &[0.5, 0.0],
        )
        .unwrap();
        let json = serde_json::to_string(&meta).unwrap();
        let back: CoeffMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
    }
}
