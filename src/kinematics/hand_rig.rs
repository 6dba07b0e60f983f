use crate::coeff::{FingerCoeff, HAND_NUM_COEFF, HandCoeff, HandShape, NUM_FINGERS};
use crate::error::ConfigurationError;
use crate::kinematics::posed::PosedModel;
use crate::kinematics::skeleton::RestSkeleton;
use crate::kinematics::transform::{euler, rot_x, rot_z, stretch_y, translate_y, translation_norm};

use nalgebra::{Matrix4, Vector3};
use ndarray::ArrayView1;
use std::sync::Arc;

/// Bone name of the wrist, driven by the wrist coefficients
pub const WRIST_BONE: &str = "carpals";
/// Bone name of the palm, kept in its rest pose
pub const PALM_BONE: &str = "metacarpals";
/// Bone names of the metacarpal root of each finger
pub const FINGER_ROOT_BONES: [&str; NUM_FINGERS] = ["Bone", "Bone.001", "Bone.002", "Bone.003"];
/// Bone names of the thumb, base to tip
pub const THUMB_BONES: [&str; 3] = ["finger5joint1", "finger5joint2", "finger5joint3"];

/// Bone name of phalanx `joint` (`0..3`, base to tip) of finger `finger` (`0..4`)
pub fn finger_joint_bone(finger: usize, joint: usize) -> String {
    format!("finger{}joint{}", finger + 1, joint + 1)
}

/// Bone indices driven by the hand coefficients
#[derive(Clone, Debug, PartialEq, Eq)]
struct HandRig {
    wrist: usize,
    finger_roots: [usize; NUM_FINGERS],
    /// Phalanges of every finger, base to tip
    fingers: [[usize; 3]; NUM_FINGERS],
    /// Thumb phalanges, base to tip
    thumb: [usize; 3],
}

impl HandRig {
    fn from_skeleton(skeleton: &RestSkeleton) -> Result<Self, ConfigurationError> {
        // The palm is never driven but must exist to carry the fingers
        skeleton.require_bone(PALM_BONE)?;

        let mut finger_roots = [0; NUM_FINGERS];
        let mut fingers = [[0; 3]; NUM_FINGERS];
        for finger in 0..NUM_FINGERS {
            finger_roots[finger] = skeleton.require_bone(FINGER_ROOT_BONES[finger])?;
            for joint in 0..3 {
                fingers[finger][joint] = skeleton.require_bone(&finger_joint_bone(finger, joint))?;
            }
        }
        let mut thumb = [0; 3];
        for (bone, name) in thumb.iter_mut().zip(THUMB_BONES) {
            *bone = skeleton.require_bone(name)?;
        }
        Ok(Self {
            wrist: skeleton.require_bone(WRIST_BONE)?,
            finger_roots,
            fingers,
            thumb,
        })
    }
}

/// Forward kinematics of the articulated hand
///
/// A pure function of the coefficient vector, the shared rest skeleton, and the per-frame
/// [HandShape]. Pose evaluation never mutates the skeleton, so a single instance is safely
/// shared between threads evaluating different candidates.
#[derive(Clone, Debug)]
pub struct HandKinematics {
    skeleton: Arc<RestSkeleton>,
    rig: HandRig,
}

impl HandKinematics {
    /// Create a new [HandKinematics], resolving the driven bones by name
    pub fn new(skeleton: Arc<RestSkeleton>) -> Result<Self, ConfigurationError> {
        let rig = HandRig::from_skeleton(&skeleton)?;
        Ok(Self { skeleton, rig })
    }

    #[inline]
    pub fn skeleton(&self) -> &RestSkeleton {
        &self.skeleton
    }

    /// Model root: `T(position) * euler(orientation) * scale`
    pub fn root_transform(coeffs: ArrayView1<f64>, shape: &HandShape) -> Matrix4<f64> {
        let position = Vector3::new(
            coeffs[HandCoeff::HandPosX.index()],
            coeffs[HandCoeff::HandPosY.index()],
            coeffs[HandCoeff::HandPosZ.index()],
        );
        let rotation = euler(
            coeffs[HandCoeff::HandOrientX.index()],
            coeffs[HandCoeff::HandOrientY.index()],
            coeffs[HandCoeff::HandOrientZ.index()],
        );
        Matrix4::new_translation(&position) * rotation * Matrix4::new_scaling(shape.scale)
    }

    /// Pose the hand into a fresh [PosedModel]
    ///
    /// # Arguments
    /// - `coeffs`: hand coefficients, at least [HAND_NUM_COEFF] values
    /// - `shape`: static per-frame shape
    /// - `model`: index of this hand among the models of a fit, copied into its spheres
    pub fn pose(&self, coeffs: ArrayView1<f64>, shape: &HandShape, model: usize) -> PosedModel {
        let mut posed = PosedModel::default();
        self.pose_into(coeffs, shape, model, &mut posed);
        posed
    }

    /// Pose the hand reusing the buffers of `out`
    pub fn pose_into(
        &self,
        coeffs: ArrayView1<f64>,
        shape: &HandShape,
        model: usize,
        out: &mut PosedModel,
    ) {
        debug_assert!(coeffs.len() >= HAND_NUM_COEFF);
        let skeleton = &*self.skeleton;
        out.local.clear();
        out.local
            .extend(skeleton.bones().iter().map(|bone| bone.rest_local));
        self.update_locals(coeffs, shape, &mut out.local);
        let root = Self::root_transform(coeffs, shape);
        skeleton.compose_world(&root, &out.local, &mut out.world);
        skeleton.place_spheres(&out.world, model, &mut out.spheres);
    }

    fn update_locals(
        &self,
        coeffs: ArrayView1<f64>,
        shape: &HandShape,
        local: &mut [Matrix4<f64>],
    ) {
        let rig = &self.rig;
        let rest = |bone: usize| &self.skeleton.bones()[bone].rest_local;
        // Child of a stretched phalanx: undo the parent's stretch, then slide the joint out by
        // the extra length of the parent
        let stretched_child = |bone: usize, rotation: Matrix4<f64>, length: f64| {
            let slide = translate_y(translation_norm(rest(bone)) * length);
            stretch_y(1.0 / (1.0 + length))
                * slide
                * rest(bone)
                * rotation
                * stretch_y(1.0 + length)
        };

        local[rig.wrist] = rest(rig.wrist)
            * rot_x(coeffs[HandCoeff::WristPhi.index()])
            * rot_z(coeffs[HandCoeff::WristTheta.index()]);

        for finger in 0..NUM_FINGERS {
            let c = |coeff: FingerCoeff| coeffs[HandCoeff::finger(finger, coeff)];
            let length = shape.finger_lengths[finger];
            let [k1, k2, k3] = rig.fingers[finger];
            let root = rig.finger_roots[finger];

            local[root] =
                rest(root) * euler(0.0, c(FingerCoeff::RootTheta), c(FingerCoeff::RootPhi));
            local[k1] = rest(k1)
                * euler(
                    coeffs[HandCoeff::finger_twist(finger)],
                    c(FingerCoeff::Theta),
                    c(FingerCoeff::Phi),
                )
                * stretch_y(1.0 + length);
            local[k2] = stretched_child(k2, rot_x(c(FingerCoeff::KnuckleMid)), length);
            local[k3] = stretched_child(k3, rot_x(c(FingerCoeff::KnuckleEnd)), length);
        }

        let length = shape.thumb_length;
        let [t1, t2, t3] = rig.thumb;
        local[t1] = rest(t1)
            * euler(
                coeffs[HandCoeff::ThumbTwist.index()],
                coeffs[HandCoeff::ThumbTheta.index()],
                coeffs[HandCoeff::ThumbPhi.index()],
            );
        local[t2] = rest(t2)
            * rot_z(coeffs[HandCoeff::ThumbK1Theta.index()])
            * rot_x(coeffs[HandCoeff::ThumbK1Phi.index()])
            * stretch_y(1.0 + length);
        local[t3] = stretched_child(t3, rot_x(coeffs[HandCoeff::ThumbK2Phi.index()]), length);
    }
}
