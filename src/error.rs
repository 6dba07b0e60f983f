/// Error returned when a model, metadata table, or optimizer setting is invalid
#[derive(Debug, thiserror::Error, PartialEq, Clone)]
pub enum ConfigurationError {
    #[error("metadata table `{table}` has length {actual}, expected {expected}")]
    TableLength {
        table: &'static str,
        actual: usize,
        expected: usize,
    },

    #[error("coefficient {index}: lower limit {min} exceeds upper limit {max}")]
    InvertedLimits { index: usize, min: f64, max: f64 },

    #[error("coefficient {index}: {what} must not be NaN")]
    NanValue { index: usize, what: &'static str },

    #[error("coefficient {index}: {what} must be non-negative, got {value}")]
    NegativeValue {
        index: usize,
        what: &'static str,
        value: f64,
    },

    #[error("coefficient index {index} is out of range for {len} coefficients")]
    CoeffIndex { index: usize, len: usize },

    #[error("shape coefficient {index} must be frozen, its search radius is {radius}")]
    ShapeNotFrozen { index: usize, radius: f64 },

    #[error("coefficient vector has length {actual}, expected {expected}")]
    CoeffLength { actual: usize, expected: usize },

    #[error("record has {actual} values, the hand layout holds at most {capacity}")]
    RecordTooLong { actual: usize, capacity: usize },

    #[error("bone `{0}` is not found in the rest skeleton")]
    MissingBone(String),

    #[error("skeleton must have exactly one root bone, found {0}")]
    RootCount(usize),

    #[error("bone {bone} refers to missing parent {parent}")]
    ParentIndex { bone: usize, parent: usize },

    #[error("bones {0:?} are not reachable from the root bone")]
    Unreachable(Vec<usize>),

    #[error("sphere {sphere} is attached to missing bone {bone}")]
    SphereBone { sphere: usize, bone: usize },

    #[error("sphere {sphere} must have a finite offset and a positive finite radius")]
    SphereGeometry { sphere: usize },

    #[error("ModelFit requires at least one model")]
    NoModels,

    #[error("ModelFit was configured for {expected} models, got {actual}")]
    ModelCount { expected: usize, actual: usize },

    #[error("invalid optimizer setting: {0}")]
    Optimizer(&'static str),

    #[error("invalid objective setting: {0}")]
    Objective(&'static str),
}

/// Error reported by a [ResidualRenderer](crate::ResidualRenderer)
#[derive(Debug, thiserror::Error, PartialEq, Clone)]
pub enum RenderError {
    #[error("depth frame has shape {actual:?}, renderer expects {expected:?}")]
    FrameShape {
        actual: (usize, usize),
        expected: (usize, usize),
    },

    #[error("renderer returned {actual} residuals for {expected} candidates")]
    BatchLength { actual: usize, expected: usize },

    #[error("renderer failure: {0}")]
    Backend(String),
}

/// Error returned from [ObjectiveEvaluator](crate::ObjectiveEvaluator)
#[derive(Debug, thiserror::Error, PartialEq, Clone)]
pub enum EvaluationError {
    #[error("batch of {requested} candidates exceeds the renderer capacity of {capacity}")]
    TooManyCandidates { requested: usize, capacity: usize },

    #[error("candidate has {actual} coefficients, expected {expected}")]
    CandidateLength { actual: usize, expected: usize },

    #[error("fitness buffer holds {actual} values for {expected} candidates")]
    FitnessLength { actual: usize, expected: usize },

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Error returned from [ModelFit](crate::ModelFit)
#[derive(Debug, thiserror::Error, PartialEq, Clone)]
pub enum FitError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("fit was cancelled")]
    Cancelled,
}
