//! Fitness of candidate coefficient vectors against one depth frame.
//!
//! A candidate is the concatenation of every fitted model's coefficients. Its fitness combines
//! the renderer's depth residual, the interpenetration penalty of the posed spheres, the soft
//! bounds penalty and an optional previous-frame distance penalty, see [ObjectiveTerms].

mod settings;
pub use settings::{ObjectiveSettings, PrevFramePenalty, TermCombination};

use crate::coeff::{BoundsPenaltyForm, CoeffMetadata, HandShape};
use crate::error::{ConfigurationError, EvaluationError, RenderError};
use crate::kinematics::{PlacedSphere, PosedGeometry};
use crate::model::HandModel;
use crate::penalty::{BroadPhase, BroadPhaseKind, InterpenetrationPenalty};
use crate::pso::BatchObjective;
use crate::render::{DepthFrame, ResidualRenderer};

use ndarray::{Array1, ArrayView1, ArrayView2, s};
use rayon::prelude::*;
use std::cell::RefCell;
use thread_local::ThreadLocal;

/// Separate terms of the objective for one candidate
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectiveTerms {
    /// Weighted depth residual `lambda * residual`
    pub data: f64,
    /// Interpenetration factor `1 + k * penetration`
    pub interpenetration: f64,
    pub bounds: f64,
    pub prev_frame: f64,
}

impl ObjectiveTerms {
    pub fn combine(&self, combination: TermCombination) -> f64 {
        match combination {
            TermCombination::Sum => {
                self.data + self.interpenetration + self.bounds + self.prev_frame
            }
            TermCombination::Product => {
                self.data * self.interpenetration * (1.0 + self.bounds + self.prev_frame)
            }
        }
    }
}

/// Terms which do not need the renderer
#[derive(Clone, Copy, Debug)]
struct GeometryTerms {
    interpenetration: f64,
    bounds: f64,
    prev_frame: f64,
}

/// Per-thread buffers of the interpenetration test
#[derive(Debug)]
struct Scratch {
    broad_phase: BroadPhase,
    pairs: Vec<(usize, usize)>,
    spheres: Vec<PlacedSphere>,
}

/// Poses candidates and computes their geometric terms, shareable between worker threads
struct CandidatePoser<'a> {
    models: &'a [HandModel],
    shapes: Vec<HandShape>,
    metadata: CoeffMetadata,
    penalty: InterpenetrationPenalty,
    broad_phase: BroadPhaseKind,
    bounds_form: BoundsPenaltyForm,
    prev_frame: Option<(PrevFramePenalty, Array1<f64>)>,
    scratch: ThreadLocal<RefCell<Scratch>>,
}

impl CandidatePoser<'_> {
    fn pose(&self, candidate: ArrayView1<f64>) -> (PosedGeometry, GeometryTerms) {
        let mut offset = 0;
        let models = self
            .models
            .iter()
            .zip(&self.shapes)
            .enumerate()
            .map(|(index, (model, shape))| {
                let len = model.metadata().len();
                let coeffs = candidate.slice(s![offset..offset + len]);
                offset += len;
                model.kinematics().pose(coeffs, shape, index)
            })
            .collect();
        let geometry = PosedGeometry { models };

        let scratch = self.scratch.get_or(|| {
            RefCell::new(Scratch {
                broad_phase: self.broad_phase.build(),
                pairs: vec![],
                spheres: vec![],
            })
        });
        let mut scratch = scratch.borrow_mut();
        let Scratch {
            broad_phase,
            pairs,
            spheres,
        } = &mut *scratch;
        geometry.collect_spheres(spheres);
        let penetration = self.penalty.total_penetration(spheres, broad_phase, pairs);

        let terms = GeometryTerms {
            interpenetration: self.penalty.penalty(penetration),
            bounds: self.metadata.bounds_penalty(candidate, self.bounds_form),
            prev_frame: self.prev_frame.as_ref().map_or(0.0, |(penalty, prev)| {
                penalty.penalty(&self.metadata, prev.view(), candidate)
            }),
        };
        (geometry, terms)
    }
}

/// Objective function over the concatenated coefficients of one or more hand models
///
/// The per-frame [HandShape] of every model is read from its stored coefficients when the
/// evaluator is created, the length and scale entries of candidates are not used for posing.
pub struct ObjectiveEvaluator<'a, R> {
    poser: CandidatePoser<'a>,
    renderer: &'a mut R,
    frame: &'a DepthFrame,
    lambda: f64,
    combination: TermCombination,
    evaluations: u64,
}

impl<'a, R: ResidualRenderer> ObjectiveEvaluator<'a, R> {
    /// Create a new [ObjectiveEvaluator]
    ///
    /// # Arguments
    /// - `settings`: objective settings
    /// - `models`: fitted models, in the order of their coefficients in a candidate
    /// - `frame`: observed depth frame
    /// - `renderer`: data term collaborator
    /// - `prev_coeffs`: concatenated coefficients of the previous frame, used only when
    ///   [ObjectiveSettings::prev_frame] is set. `None` takes the models' current coefficients.
    pub fn new(
        settings: &ObjectiveSettings,
        models: &'a [HandModel],
        frame: &'a DepthFrame,
        renderer: &'a mut R,
        prev_coeffs: Option<Array1<f64>>,
    ) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        if models.is_empty() {
            return Err(ConfigurationError::NoModels);
        }
        let metadata = CoeffMetadata::concat(models.iter().map(HandModel::metadata));
        let prev_frame = match settings.prev_frame {
            Some(penalty) => {
                let prev = match prev_coeffs {
                    Some(prev) => {
                        metadata.check_len(prev.view())?;
                        prev
                    }
                    None => concat_coeffs(models),
                };
                Some((penalty, prev))
            }
            None => None,
        };
        let poser = CandidatePoser {
            models,
            shapes: models.iter().map(HandModel::shape).collect(),
            metadata,
            penalty: InterpenetrationPenalty::new(
                settings.interpenetration_constant,
                settings.penetration_measure,
                settings.max_groups,
            ),
            broad_phase: settings.broad_phase,
            bounds_form: settings.bounds_penalty,
            prev_frame,
            scratch: ThreadLocal::new(),
        };
        Ok(Self {
            poser,
            renderer,
            frame,
            lambda: settings.data_term_lambda,
            combination: settings.combination,
            evaluations: 0,
        })
    }

    /// Metadata of the concatenated coefficient layout
    #[inline]
    pub fn metadata(&self) -> &CoeffMetadata {
        &self.poser.metadata
    }

    /// Number of candidates evaluated so far
    #[inline]
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    fn check_len(&self, len: usize) -> Result<(), EvaluationError> {
        let expected = self.poser.metadata.len();
        if len != expected {
            return Err(EvaluationError::CandidateLength {
                actual: len,
                expected,
            });
        }
        Ok(())
    }

    /// Pose a candidate without evaluating it
    pub fn pose_candidate(
        &self,
        candidate: ArrayView1<f64>,
    ) -> Result<PosedGeometry, EvaluationError> {
        self.check_len(candidate.len())?;
        Ok(self.poser.pose(candidate).0)
    }

    /// Separate objective terms of a single candidate
    pub fn evaluate_terms(
        &mut self,
        candidate: ArrayView1<f64>,
    ) -> Result<ObjectiveTerms, EvaluationError> {
        self.check_len(candidate.len())?;
        let (geometry, terms) = self.poser.pose(candidate);
        self.evaluations += 1;
        let residual = self.renderer.render_residual(&geometry, self.frame)?;
        Ok(self.terms(residual, terms))
    }

    /// Fitness of a single candidate
    pub fn evaluate(&mut self, candidate: ArrayView1<f64>) -> Result<f64, EvaluationError> {
        let terms = self.evaluate_terms(candidate)?;
        Ok(terms.combine(self.combination))
    }

    /// Fitness of every row of `candidates`, written to `fitness`
    ///
    /// Candidates are posed in parallel and rendered in one renderer call. The result of a
    /// candidate equals [evaluate](Self::evaluate) on it.
    ///
    /// Returns [EvaluationError::TooManyCandidates] if the batch exceeds the renderer's
    /// capacity and [EvaluationError::FitnessLength] if `fitness` does not have one slot per
    /// candidate, nothing is evaluated in these cases.
    pub fn evaluate_batch(
        &mut self,
        candidates: ArrayView2<f64>,
        fitness: &mut [f64],
    ) -> Result<(), EvaluationError> {
        let requested = candidates.nrows();
        let capacity = self.renderer.max_batch_size();
        if requested > capacity {
            return Err(EvaluationError::TooManyCandidates {
                requested,
                capacity,
            });
        }
        self.check_len(candidates.ncols())?;
        if fitness.len() != requested {
            return Err(EvaluationError::FitnessLength {
                actual: fitness.len(),
                expected: requested,
            });
        }

        let rows: Vec<_> = candidates.outer_iter().collect();
        let poser = &self.poser;
        let (geometries, terms): (Vec<_>, Vec<_>) =
            rows.par_iter().map(|row| poser.pose(row.view())).unzip();
        self.evaluations += requested as u64;

        let residuals = self.renderer.render_residual_batch(&geometries, self.frame)?;
        if residuals.len() != requested {
            return Err(RenderError::BatchLength {
                actual: residuals.len(),
                expected: requested,
            }
            .into());
        }
        for ((f, residual), terms) in fitness.iter_mut().zip(residuals).zip(terms) {
            *f = self.terms(residual, terms).combine(self.combination);
        }
        Ok(())
    }

    fn terms(&self, residual: f64, terms: GeometryTerms) -> ObjectiveTerms {
        ObjectiveTerms {
            data: self.lambda * residual,
            interpenetration: terms.interpenetration,
            bounds: terms.bounds,
            prev_frame: terms.prev_frame,
        }
    }
}

impl<R: ResidualRenderer> BatchObjective for ObjectiveEvaluator<'_, R> {
    type Error = EvaluationError;

    fn max_batch_size(&self) -> usize {
        self.renderer.max_batch_size()
    }

    fn evaluate_batch(
        &mut self,
        candidates: ArrayView2<f64>,
        fitness: &mut [f64],
    ) -> Result<(), Self::Error> {
        ObjectiveEvaluator::evaluate_batch(self, candidates, fitness)
    }
}

/// Coefficients of every model, concatenated
pub(crate) fn concat_coeffs(models: &[HandModel]) -> Array1<f64> {
    models
        .iter()
        .flat_map(|model| model.coeffs().into_iter().copied())
        .collect()
}
