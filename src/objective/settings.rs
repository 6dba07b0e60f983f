use crate::coeff::{BoundsPenaltyForm, CoeffMetadata};
use crate::error::ConfigurationError;
use crate::penalty::{BroadPhaseKind, PenetrationMeasure};

use ndarray::ArrayView1;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How the objective terms are combined into one fitness value
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TermCombination {
    /// `data + interpenetration + bounds + prev_frame`
    #[default]
    Sum,
    /// `data * interpenetration * (1 + bounds + prev_frame)`
    Product,
}

/// Soft penalty for moving far from the previous frame's coefficients
///
/// Only dimensions with a non-zero bounds penalty scale take part. A dimension contributes
/// `(|Δ| - threshold * (max - min))^2` when its displacement `Δ` exceeds the threshold fraction
/// of its range, and the sum is multiplied by `scale`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PrevFramePenalty {
    pub scale: f64,
    pub threshold: f64,
}

impl PrevFramePenalty {
    pub fn new(scale: f64, threshold: f64) -> Result<Self, ConfigurationError> {
        let penalty = Self { scale, threshold };
        penalty.validate()?;
        Ok(penalty)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.scale >= 0.0 && self.scale.is_finite()) {
            return Err(ConfigurationError::Objective(
                "previous frame penalty scale must be finite and non-negative",
            ));
        }
        if !(self.threshold >= 0.0 && self.threshold.is_finite()) {
            return Err(ConfigurationError::Objective(
                "previous frame penalty threshold must be finite and non-negative",
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn default_scale() -> f64 {
        0.001
    }

    #[inline]
    pub fn default_threshold() -> f64 {
        0.3
    }

    pub fn penalty(
        &self,
        metadata: &CoeffMetadata,
        prev: ArrayView1<f64>,
        coeffs: ArrayView1<f64>,
    ) -> f64 {
        let sum: f64 = metadata
            .dims()
            .iter()
            .zip(prev.iter().zip(coeffs.iter()))
            .filter(|(dim, _)| dim.penalty_scale > 0.0)
            .map(|(dim, (&from, &to))| {
                let err = dim.displacement(from, to).abs() - self.threshold * (dim.max - dim.min);
                if err > 0.0 { err * err } else { 0.0 }
            })
            .sum();
        self.scale * sum
    }
}

impl Default for PrevFramePenalty {
    fn default() -> Self {
        Self {
            scale: Self::default_scale(),
            threshold: Self::default_threshold(),
        }
    }
}

/// Objective function settings
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ObjectiveSettings {
    /// Weight of the rendered depth residual
    pub data_term_lambda: f64,
    /// Weight `k` of the interpenetration penalty `1 + k * penetration`
    pub interpenetration_constant: f64,
    pub penetration_measure: PenetrationMeasure,
    pub broad_phase: BroadPhaseKind,
    /// Only sphere groups `< max_groups` of every model are penalized, `None` for all
    pub max_groups: Option<usize>,
    pub combination: TermCombination,
    /// Disabled when `None`
    pub prev_frame: Option<PrevFramePenalty>,
    pub bounds_penalty: BoundsPenaltyForm,
}

impl ObjectiveSettings {
    /// Create new [ObjectiveSettings] with default penalty forms and no previous-frame term
    ///
    /// # Arguments
    /// - `data_term_lambda`: weight of the data term, positive
    /// - `interpenetration_constant`: weight of the accumulated penetration, non-negative
    pub fn new(
        data_term_lambda: f64,
        interpenetration_constant: f64,
    ) -> Result<Self, ConfigurationError> {
        let settings = Self {
            data_term_lambda,
            interpenetration_constant,
            ..Self::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.data_term_lambda > 0.0 && self.data_term_lambda.is_finite()) {
            return Err(ConfigurationError::Objective(
                "data term lambda must be finite and positive",
            ));
        }
        if !(self.interpenetration_constant >= 0.0 && self.interpenetration_constant.is_finite()) {
            return Err(ConfigurationError::Objective(
                "interpenetration constant must be finite and non-negative",
            ));
        }
        if let Some(prev_frame) = &self.prev_frame {
            prev_frame.validate()?;
        }
        Ok(())
    }

    #[inline]
    pub fn default_data_term_lambda() -> f64 {
        0.2
    }

    #[inline]
    pub fn default_interpenetration_constant() -> f64 {
        0.1
    }
}

impl Default for ObjectiveSettings {
    fn default() -> Self {
        Self {
            data_term_lambda: Self::default_data_term_lambda(),
            interpenetration_constant: Self::default_interpenetration_constant(),
            penetration_measure: PenetrationMeasure::default(),
            broad_phase: BroadPhaseKind::default(),
            max_groups: None,
            combination: TermCombination::default(),
            prev_frame: None,
            bounds_penalty: BoundsPenaltyForm::default(),
        }
    }
}
