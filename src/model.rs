use crate::coeff::{CoeffMetadata, HAND_NUM_COEFF, HandCoeff, HandShape, default_hand_coeffs};
use crate::error::ConfigurationError;
use crate::kinematics::{HandKinematics, PosedModel, RestSkeleton};

use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Chirality of a hand model
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum HandType {
    Left,
    #[default]
    Right,
}

/// One fitted hand: its kinematics, coefficient metadata and current coefficients
///
/// Every model owns its coefficients exclusively. The rest skeleton is immutable and may be
/// shared between models of the same chirality.
#[derive(Clone, Debug)]
pub struct HandModel {
    hand_type: HandType,
    kinematics: HandKinematics,
    metadata: CoeffMetadata,
    coeffs: Array1<f64>,
}

impl HandModel {
    /// Create a new [HandModel] in the default pose with the standard hand metadata
    ///
    /// # Arguments
    /// - `hand_type`: chirality, informational
    /// - `skeleton`: rest skeleton carrying the standard bone names
    pub fn new(
        hand_type: HandType,
        skeleton: Arc<RestSkeleton>,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            hand_type,
            kinematics: HandKinematics::new(skeleton)?,
            metadata: CoeffMetadata::hand(),
            coeffs: default_hand_coeffs(),
        })
    }

    /// Replace the coefficient metadata, e.g. with a frozen or re-scaled copy of the default
    ///
    /// Length and scale coefficients form the per-frame [HandShape] and are not searched, so
    /// their search radius must stay zero.
    pub fn with_metadata(mut self, metadata: CoeffMetadata) -> Result<Self, ConfigurationError> {
        if metadata.len() != HAND_NUM_COEFF {
            return Err(ConfigurationError::TableLength {
                table: "metadata",
                actual: metadata.len(),
                expected: HAND_NUM_COEFF,
            });
        }
        if let Some((index, dim)) = metadata
            .dims()
            .iter()
            .enumerate()
            .skip(HandCoeff::F0Length.index())
            .find(|(_, dim)| !dim.is_frozen())
        {
            return Err(ConfigurationError::ShapeNotFrozen {
                index,
                radius: dim.pso_radius,
            });
        }
        self.metadata = metadata;
        Ok(self)
    }

    #[inline]
    pub fn hand_type(&self) -> HandType {
        self.hand_type
    }

    #[inline]
    pub fn kinematics(&self) -> &HandKinematics {
        &self.kinematics
    }

    #[inline]
    pub fn metadata(&self) -> &CoeffMetadata {
        &self.metadata
    }

    #[inline]
    pub fn coeffs(&self) -> ArrayView1<'_, f64> {
        self.coeffs.view()
    }

    #[inline]
    pub fn coeffs_mut(&mut self) -> ArrayViewMut1<'_, f64> {
        self.coeffs.view_mut()
    }

    pub fn set_coeffs(&mut self, coeffs: ArrayView1<f64>) -> Result<(), ConfigurationError> {
        self.metadata.check_len(coeffs)?;
        self.coeffs.assign(&coeffs);
        Ok(())
    }

    /// Static shape read from the length and scale coefficients
    #[inline]
    pub fn shape(&self) -> HandShape {
        HandShape::from_coeffs(self.coeffs.view())
    }

    /// Pose at the current coefficients
    pub fn pose(&self) -> PosedModel {
        self.kinematics.pose(self.coeffs.view(), &self.shape(), 0)
    }
}
