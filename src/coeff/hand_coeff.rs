use crate::coeff::{CoeffDim, CoeffMetadata};
use crate::error::ConfigurationError;

use lazy_static::lazy_static;
use ndarray::{Array1, ArrayView1};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Number of coefficients of a single hand model
pub const HAND_NUM_COEFF: usize = 48;
/// Number of non-thumb fingers
pub const NUM_FINGERS: usize = 4;
/// Number of per-finger pose coefficients, see [FingerCoeff]
pub const FINGER_NUM_COEFF: usize = 6;

/// Index of a coefficient in the hand layout
///
/// Fingers `F0..F3` are stored as consecutive blocks of [FINGER_NUM_COEFF] coefficients starting
/// at [HandCoeff::F0RootTheta], use [HandCoeff::finger] to address them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandCoeff {
    HandPosX = 0,
    HandPosY,
    HandPosZ,
    HandOrientX,
    HandOrientY,
    HandOrientZ,
    WristTheta,
    WristPhi,
    ThumbTheta,
    ThumbPhi,
    ThumbK1Theta,
    ThumbK1Phi,
    ThumbK2Phi,
    F0RootTheta,
    F0Twist = 37,
    ThumbTwist = 41,
    F0Length = 42,
    ThumbLength = 46,
    Scale = 47,
}

/// Per-finger pose coefficient, relative to the start of the finger's block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum FingerCoeff {
    RootTheta = 0,
    RootPhi,
    Theta,
    Phi,
    KnuckleMid,
    KnuckleEnd,
}

impl HandCoeff {
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Index of a pose coefficient of finger `finger` (`0..4`)
    #[inline]
    pub const fn finger(finger: usize, coeff: FingerCoeff) -> usize {
        Self::F0RootTheta.index() + finger * FINGER_NUM_COEFF + coeff as usize
    }

    /// Index of the twist coefficient of finger `finger` (`0..4`)
    #[inline]
    pub const fn finger_twist(finger: usize) -> usize {
        Self::F0Twist.index() + finger
    }

    /// Index of the length coefficient of finger `finger` (`0..4`)
    #[inline]
    pub const fn finger_length(finger: usize) -> usize {
        Self::F0Length.index() + finger
    }
}

const POSE_NUM_COEFF: usize = HandCoeff::F0Length as usize;

/// Search radius of the position coefficients, in model units (mm)
const PSO_RAD_POSITION: f64 = 25.0;
/// Search radius of the global orientation coefficients, radians
const PSO_RAD_EULER: f64 = 0.4;
/// Search radius of articulation coefficients as a fraction of `max - min`
const PSO_RAD_ARTICULATION: f64 = 0.4;

const FINGER_MIN: [[f64; FINGER_NUM_COEFF]; NUM_FINGERS] = [
    [-0.7, -0.7, -0.8, -1.443, -1.4, -1.5],
    [-0.7, -0.7, -0.8, -1.443, -1.4, -1.5],
    [-0.5, -0.5, -0.8, -1.443, -1.4, -1.5],
    [-0.4, -0.4, -0.8, -1.443, -1.4, -1.5],
];

const FINGER_MAX: [[f64; FINGER_NUM_COEFF]; NUM_FINGERS] = [
    [0.7, 0.7, 0.6, 0.67, 0.56, 0.56],
    [0.7, 0.7, 0.6, 0.67, 0.56, 0.56],
    [0.5, 0.5, 0.6, 0.67, 0.56, 0.56],
    [0.4, 0.4, 0.6, 0.67, 0.56, 0.56],
];

/// `(min, max)` of wrist and thumb coefficients, `WristTheta..=ThumbK2Phi`
const WRIST_THUMB_LIMITS: [(f64, f64); 7] = [
    (-0.903, 0.905),
    (-1.58, 1.58),
    (-0.523, 0.55),
    (-0.523, 0.58),
    (-0.633, 0.7),
    (-1.253, 0.75),
    (-1.733, 0.5),
];

/// `(min, max)` of `F0Twist..=ThumbTwist`
const TWIST_LIMITS: [(f64, f64); 5] = [
    (-0.3, 0.3),
    (-0.4, 0.3),
    (-0.3, 0.3),
    (-0.3, 0.3),
    (-0.3, 0.3),
];

const ARTICULATION_PENALTY_SCALE: f64 = 100.0;

fn hand_dims() -> Vec<CoeffDim> {
    let articulation = |(min, max): (f64, f64)| {
        CoeffDim::new(
            min,
            max,
            ARTICULATION_PENALTY_SCALE,
            true,
            (max - min) * PSO_RAD_ARTICULATION,
        )
    };

    let mut dims = Vec::with_capacity(HAND_NUM_COEFF);
    dims.extend(
        (0..3).map(|_| {
            CoeffDim::new(f64::NEG_INFINITY, f64::INFINITY, 0.0, false, PSO_RAD_POSITION)
        }),
    );
    dims.extend((0..3).map(|_| CoeffDim::new(-PI, PI, 0.0, true, PSO_RAD_EULER)));
    dims.extend(WRIST_THUMB_LIMITS.into_iter().map(articulation));
    for (min, max) in FINGER_MIN.iter().zip(FINGER_MAX.iter()) {
        dims.extend(min.iter().copied().zip(max.iter().copied()).map(articulation));
    }
    dims.extend(TWIST_LIMITS.into_iter().map(articulation));
    debug_assert_eq!(dims.len(), POSE_NUM_COEFF);
    // Lengths and scale are per-user shape, fixed once per frame
    dims.extend(
        (POSE_NUM_COEFF..HAND_NUM_COEFF)
            .map(|_| CoeffDim::new(f64::NEG_INFINITY, f64::INFINITY, 0.0, false, 0.0)),
    );
    dims
}

lazy_static! {
    pub(super) static ref HAND_METADATA: CoeffMetadata = CoeffMetadata { dims: hand_dims() };
}

/// Coefficients of the rest pose: everything zero but a unit scale
pub fn default_hand_coeffs() -> Array1<f64> {
    let mut coeffs = Array1::zeros(HAND_NUM_COEFF);
    coeffs[HandCoeff::Scale.index()] = 1.0;
    coeffs
}

/// Static per-user hand shape, read from the coefficient vector once per frame
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct HandShape {
    /// Uniform scale of the whole hand
    pub scale: f64,
    /// Relative length change of each finger's three phalanges
    pub finger_lengths: [f64; NUM_FINGERS],
    /// Relative length change of the thumb's phalanges
    pub thumb_length: f64,
}

impl HandShape {
    /// Read the shape from a hand coefficient vector
    ///
    /// `coeffs` must hold at least [HAND_NUM_COEFF] values.
    pub fn from_coeffs(coeffs: ArrayView1<f64>) -> Self {
        Self {
            scale: coeffs[HandCoeff::Scale.index()],
            finger_lengths: std::array::from_fn(|i| coeffs[HandCoeff::finger_length(i)]),
            thumb_length: coeffs[HandCoeff::ThumbLength.index()],
        }
    }

    #[inline]
    pub fn default_scale() -> f64 {
        1.0
    }
}

impl Default for HandShape {
    fn default() -> Self {
        Self {
            scale: Self::default_scale(),
            finger_lengths: [0.0; NUM_FINGERS],
            thumb_length: 0.0,
        }
    }
}

/// Hand coefficient vector loaded from a stored record
///
/// Older records stop before the twist, length and scale coefficients. Missing values are
/// zero-filled, except the scale which defaults to one.
#[derive(Clone, Debug, PartialEq)]
pub struct CoeffRecord(Array1<f64>);

impl CoeffRecord {
    pub fn from_slice(values: &[f64]) -> Result<Self, ConfigurationError> {
        if values.len() > HAND_NUM_COEFF {
            return Err(ConfigurationError::RecordTooLong {
                actual: values.len(),
                capacity: HAND_NUM_COEFF,
            });
        }
        let mut coeffs = Array1::zeros(HAND_NUM_COEFF);
        coeffs
            .iter_mut()
            .zip(values)
            .for_each(|(c, &v)| *c = v);
        if values.len() <= HandCoeff::Scale.index() {
            coeffs[HandCoeff::Scale.index()] = HandShape::default_scale();
        }
        Ok(Self(coeffs))
    }

    pub fn coeffs(&self) -> ArrayView1<'_, f64> {
        self.0.view()
    }

    pub fn into_coeffs(self) -> Array1<f64> {
        self.0
    }
}
