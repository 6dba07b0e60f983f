//! Forward kinematics: coefficient vector to posed bones and bounding spheres.

mod hand_rig;
pub use hand_rig::{
    FINGER_ROOT_BONES, HandKinematics, PALM_BONE, THUMB_BONES, WRIST_BONE, finger_joint_bone,
};

mod posed;
pub use posed::{PlacedSphere, PosedGeometry, PosedModel};

pub mod reference_hand;
pub use reference_hand::reference_hand_skeleton;

mod skeleton;
pub use skeleton::{BoneSpec, RestSkeleton, SphereSpec};

pub mod transform;
