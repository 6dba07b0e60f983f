//! Procedural reference hand: a rest skeleton with the standard bone names and a 36-sphere
//! collision layout, in millimetres. The palm lies in the `xy` plane with fingers along `+y`.

use crate::coeff::NUM_FINGERS;
use crate::error::ConfigurationError;
use crate::kinematics::hand_rig::{
    FINGER_ROOT_BONES, PALM_BONE, THUMB_BONES, WRIST_BONE, finger_joint_bone,
};
use crate::kinematics::skeleton::{BoneSpec, RestSkeleton, SphereSpec};
use crate::kinematics::transform::rot_z;
use crate::model::HandType;

use nalgebra::{Matrix4, Vector3};

/// Length of the distal phalanx of every finger
pub const FINGERTIP_LENGTH: f64 = 20.0;
/// Number of bounding spheres per group
pub const SPHERES_PER_GROUP: usize = 6;
/// Interpenetration group of the thumb, fingers use `0..4`
pub const THUMB_GROUP: usize = NUM_FINGERS;
/// Interpenetration group of the palm
pub const PALM_GROUP: usize = NUM_FINGERS + 1;

const PALM_OFFSET: f64 = 10.0;
const METACARPAL_LENGTH: f64 = 70.0;
const FINGER_X: [f64; NUM_FINGERS] = [-27.0, -9.0, 9.0, 27.0];
/// Relative size of each finger, index to little finger
const FINGER_SIZE: [f64; NUM_FINGERS] = [1.0, 1.08, 1.0, 0.85];
const PROXIMAL_LENGTH: f64 = 40.0;
const MIDDLE_LENGTH: f64 = 25.0;
const FINGER_RADII: [f64; 3] = [8.0, 7.5, 7.0];

const THUMB_BASE: (f64, f64) = (-45.0, 5.0);
const THUMB_SPLAY: f64 = 0.6;
const THUMB_LENGTHS: [f64; 3] = [35.0, 30.0, 22.0];
const THUMB_RADII: [f64; 3] = [9.0, 8.5, 8.0];

const PALM_SPHERES: [(f64, f64); SPHERES_PER_GROUP] = [
    (-18.0, 20.0),
    (0.0, 20.0),
    (18.0, 20.0),
    (-18.0, 50.0),
    (0.0, 50.0),
    (18.0, 50.0),
];
const PALM_RADIUS: f64 = 14.0;

fn translation(x: f64, y: f64) -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(x, y, 0.0))
}

/// Two spheres at a quarter and three quarters along a phalanx
fn phalanx_spheres(bone: usize, length: f64, radius: f64, group: usize) -> [SphereSpec; 2] {
    [0.25, 0.75].map(|at| SphereSpec {
        bone,
        offset: Vector3::new(0.0, at * length, 0.0),
        radius,
        group,
    })
}

/// Build the reference hand skeleton, the left hand mirrors the right one in `x`
pub fn reference_hand_skeleton(hand_type: HandType) -> Result<RestSkeleton, ConfigurationError> {
    let mirror = match hand_type {
        HandType::Right => 1.0,
        HandType::Left => -1.0,
    };

    let mut bones = vec![
        BoneSpec::new(WRIST_BONE, None, Matrix4::identity()),
        BoneSpec::new(PALM_BONE, Some(0), translation(0.0, PALM_OFFSET)),
    ];
    let palm = 1;
    let mut spheres = vec![];

    for finger in 0..NUM_FINGERS {
        let size = FINGER_SIZE[finger];
        let lengths = [PROXIMAL_LENGTH * size, MIDDLE_LENGTH * size, FINGERTIP_LENGTH];
        let root = bones.len();
        bones.push(BoneSpec::new(
            FINGER_ROOT_BONES[finger],
            Some(palm),
            translation(mirror * FINGER_X[finger], 0.0),
        ));
        let mut parent = root;
        let mut parent_length = METACARPAL_LENGTH;
        for joint in 0..3 {
            let bone = bones.len();
            bones.push(BoneSpec::new(
                finger_joint_bone(finger, joint),
                Some(parent),
                translation(0.0, parent_length),
            ));
            spheres.extend(phalanx_spheres(
                bone,
                lengths[joint],
                FINGER_RADII[joint] * size.min(1.0),
                finger,
            ));
            parent = bone;
            parent_length = lengths[joint];
        }
    }

    let mut parent = palm;
    for (joint, name) in THUMB_BONES.into_iter().enumerate() {
        let rest_local = if joint == 0 {
            translation(mirror * THUMB_BASE.0, THUMB_BASE.1) * rot_z(mirror * THUMB_SPLAY)
        } else {
            translation(0.0, THUMB_LENGTHS[joint - 1])
        };
        let bone = bones.len();
        bones.push(BoneSpec::new(name, Some(parent), rest_local));
        spheres.extend(phalanx_spheres(
            bone,
            THUMB_LENGTHS[joint],
            THUMB_RADII[joint],
            THUMB_GROUP,
        ));
        parent = bone;
    }

    spheres.extend(PALM_SPHERES.iter().map(|&(x, y)| SphereSpec {
        bone: palm,
        offset: Vector3::new(mirror * x, y, 0.0),
        radius: PALM_RADIUS,
        group: PALM_GROUP,
    }));

    RestSkeleton::new(bones, spheres)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::kinematics::posed::PlacedSphere;
    use crate::penalty::{InterpenetrationPenalty, PenetrationMeasure};
    use crate::tests::*;

    #[test]
    fn layout() {
        let skeleton = reference_hand_skeleton(HandType::Right).unwrap();
        assert_eq!(skeleton.num_bones(), 2 + NUM_FINGERS * 4 + 3);
        assert_eq!(skeleton.spheres().len(), 36);
        assert_eq!(skeleton.num_groups(), 6);
        for (i, sphere) in skeleton.spheres().iter().enumerate() {
            assert_eq!(sphere.group, i / SPHERES_PER_GROUP);
        }
    }

    #[test]
    fn rest_pose_is_collision_free() {
        for hand_type in [HandType::Left, HandType::Right] {
            let kin = kinematics(hand_type);
            let coeffs = crate::coeff::default_hand_coeffs();
            let posed = kin.pose(coeffs.view(), &Default::default(), 0);
            let spheres: Vec<PlacedSphere> = posed.spheres;
            let penalty = InterpenetrationPenalty::new(1.0, PenetrationMeasure::SquaredDepth, None);
            assert_eq!(penalty.total_penetration_all_pairs(&spheres), 0.0);
        }
    }

    #[test]
    fn left_hand_mirrors_right() {
        let right = reference_hand_skeleton(HandType::Right).unwrap();
        let left = reference_hand_skeleton(HandType::Left).unwrap();
        let coeffs = crate::coeff::default_hand_coeffs();
        let r = kinematics_for(right).pose(coeffs.view(), &Default::default(), 0);
        let l = kinematics_for(left).pose(coeffs.view(), &Default::default(), 0);
        for (a, b) in r.spheres.iter().zip(&l.spheres) {
            approx::assert_relative_eq!(a.center.x, -b.center.x, epsilon = 1e-9);
            approx::assert_relative_eq!(a.center.y, b.center.y, epsilon = 1e-9);
        }
    }
}
