#![doc = include_str!("../README.md")]

#[cfg(test)]
mod tests;

pub mod coeff;
pub use coeff::{CoeffDim, CoeffMetadata, CoeffRecord, HandCoeff, HandShape};

mod error;
pub use error::{ConfigurationError, EvaluationError, FitError, RenderError};

pub mod kinematics;
pub use kinematics::{HandKinematics, PlacedSphere, PosedGeometry, PosedModel, RestSkeleton};

mod model;
pub use model::{HandModel, HandType};

mod model_fit;
pub use model_fit::{FitReport, FitSettings, ModelFit};

pub mod objective;
pub use objective::{ObjectiveEvaluator, ObjectiveSettings, ObjectiveTerms};

pub mod penalty;
pub use penalty::InterpenetrationPenalty;

pub mod prelude;

pub mod pso;
pub use pso::{BatchObjective, CancelToken, ParticleSwarm, PsoSettings};

mod render;
pub use render::{DepthFrame, ResidualRenderer};

pub use nalgebra;
pub use ndarray;
