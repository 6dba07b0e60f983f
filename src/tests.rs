pub use rand::prelude::*;

use crate::coeff::{HandCoeff, default_hand_coeffs};
use crate::error::RenderError;
use crate::kinematics::{
    HandKinematics, PlacedSphere, PosedGeometry, RestSkeleton, reference_hand_skeleton,
};
use crate::model::{HandModel, HandType};
use crate::render::{DepthFrame, ResidualRenderer};

use nalgebra::Point3;
use ndarray::ArrayView1;
use std::sync::Arc;

/// Depth of the test hands' root
pub const TEST_DEPTH: f64 = 300.0;

pub fn kinematics_for(skeleton: RestSkeleton) -> HandKinematics {
    HandKinematics::new(Arc::new(skeleton)).unwrap()
}

pub fn kinematics(hand_type: HandType) -> HandKinematics {
    kinematics_for(reference_hand_skeleton(hand_type).unwrap())
}

pub fn test_kinematics() -> HandKinematics {
    kinematics(HandType::Right)
}

/// Reference hand in the rest pose with its root at `(x, 0, TEST_DEPTH)`
pub fn hand_model(hand_type: HandType, x: f64) -> HandModel {
    let skeleton = Arc::new(reference_hand_skeleton(hand_type).unwrap());
    let mut model = HandModel::new(hand_type, skeleton).unwrap();
    let mut coeffs = default_hand_coeffs();
    coeffs[HandCoeff::HandPosX.index()] = x;
    coeffs[HandCoeff::HandPosZ.index()] = TEST_DEPTH;
    model.set_coeffs(coeffs.view()).unwrap();
    model
}

/// Spheres with centres uniform in a cube of side `spread` and radii in `[3, 12)`, each in its
/// own group
pub fn random_spheres(rng: &mut StdRng, n: usize, spread: f64) -> Vec<PlacedSphere> {
    (0..n)
        .map(|group| {
            let mut coord = || rng.random_range(-0.5 * spread..0.5 * spread);
            let center = Point3::new(coord(), coord(), coord());
            PlacedSphere {
                center,
                radius: rng.random_range(3.0..12.0),
                group,
                model: 0,
            }
        })
        .collect()
}

/// Renderer stub: the residual is the mean distance of the sphere centres from the plane
/// `z = TEST_DEPTH`
#[derive(Clone, Debug)]
pub struct PlaneDistanceRenderer {
    pub capacity: usize,
    /// Fail every call
    pub fail: bool,
    /// Fail once this many residuals were rendered
    pub fail_after: Option<usize>,
    pub rendered: usize,
}

impl PlaneDistanceRenderer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            fail: false,
            fail_after: None,
            rendered: 0,
        }
    }
}

impl ResidualRenderer for PlaneDistanceRenderer {
    fn max_batch_size(&self) -> usize {
        self.capacity
    }

    fn render_residual(
        &mut self,
        geometry: &PosedGeometry,
        _frame: &DepthFrame,
    ) -> Result<f64, RenderError> {
        if self.fail || self.fail_after.is_some_and(|n| self.rendered >= n) {
            return Err(RenderError::Backend("stub failure".into()));
        }
        self.rendered += 1;
        let (sum, count) = geometry
            .spheres()
            .fold((0.0, 0), |(sum, count), s| (sum + (s.center.z - TEST_DEPTH).abs(), count + 1));
        Ok(sum / count.max(1) as f64)
    }
}

pub fn sphere_function(x: ArrayView1<f64>) -> f64 {
    x.iter().map(|x| x * x).sum()
}

pub fn rosenbrock(x: ArrayView1<f64>) -> f64 {
    x.iter()
        .zip(x.iter().skip(1))
        .map(|(&a, &b)| 100.0 * (b - a * a).powi(2) + (1.0 - a).powi(2))
        .sum()
}

pub fn rastrigin(x: ArrayView1<f64>) -> f64 {
    10.0 * x.len() as f64
        + x.iter()
            .map(|&x| x * x - 10.0 * (2.0 * std::f64::consts::PI * x).cos())
            .sum::<f64>()
}
