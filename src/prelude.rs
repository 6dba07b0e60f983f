pub use crate::coeff::{HandCoeff, default_hand_coeffs};
pub use crate::kinematics::reference_hand_skeleton;
pub use crate::penalty::BroadPhaseTrait;
pub use crate::pso::BatchObjective;
pub use crate::render::ResidualRenderer;
pub use crate::{
    DepthFrame, FitError, FitSettings, HandModel, HandType, ModelFit, ObjectiveSettings,
    PsoSettings,
};
