use crate::splat::SphereSplatRenderer;

use hand_model_fit::coeff::{HandCoeff, default_hand_coeffs};
use hand_model_fit::kinematics::reference_hand_skeleton;
use hand_model_fit::{DepthFrame, HandModel, HandType, PosedGeometry, RestSkeleton};

use lazy_static::lazy_static;
use std::sync::Arc;

lazy_static! {
    pub static ref RIGHT_HAND_SKELETON: Arc<RestSkeleton> =
        Arc::new(reference_hand_skeleton(HandType::Right).unwrap());
    pub static ref LEFT_HAND_SKELETON: Arc<RestSkeleton> =
        Arc::new(reference_hand_skeleton(HandType::Left).unwrap());
}

/// Depth of the root of [reference_hand] models
pub const HAND_DEPTH: f64 = 300.0;

/// Reference hand in the rest pose with its root at `(x, y, HAND_DEPTH)`
pub fn reference_hand(hand_type: HandType, x: f64, y: f64) -> HandModel {
    let skeleton = match hand_type {
        HandType::Right => RIGHT_HAND_SKELETON.clone(),
        HandType::Left => LEFT_HAND_SKELETON.clone(),
    };
    let mut model = HandModel::new(hand_type, skeleton).unwrap();
    let mut coeffs = default_hand_coeffs();
    coeffs[HandCoeff::HandPosX.index()] = x;
    coeffs[HandCoeff::HandPosY.index()] = y;
    coeffs[HandCoeff::HandPosZ.index()] = HAND_DEPTH;
    model.set_coeffs(coeffs.view()).unwrap();
    model
}

/// 2 mm renderer framing one reference hand rooted near the world origin
pub fn single_hand_renderer() -> SphereSplatRenderer {
    SphereSplatRenderer::new((110, 110), 2.0, (-110.0, -30.0))
}

/// 2 mm renderer framing a left hand rooted near `x = -120` and a right one near `x = 120`
pub fn two_hand_renderer() -> SphereSplatRenderer {
    SphereSplatRenderer::new((110, 170), 2.0, (-170.0, -30.0))
}

/// Geometry of the models at their current coefficients
pub fn posed_geometry(models: &[HandModel]) -> PosedGeometry {
    PosedGeometry {
        models: models
            .iter()
            .enumerate()
            .map(|(index, model)| {
                model
                    .kinematics()
                    .pose(model.coeffs(), &model.shape(), index)
            })
            .collect(),
    }
}

/// Noise-free frame of the models at their current coefficients
pub fn synthetic_frame(renderer: &SphereSplatRenderer, models: &[HandModel]) -> DepthFrame {
    DepthFrame::new(renderer.render(&posed_geometry(models)))
}
