use crate::error::{ConfigurationError, EvaluationError, FitError};
use crate::model::HandModel;
use crate::objective::{ObjectiveEvaluator, ObjectiveSettings, ObjectiveTerms, concat_coeffs};
use crate::pso::{CancelToken, ParticleSwarm, PsoSettings, RestartSummary, SwarmError};
use crate::render::{DepthFrame, ResidualRenderer};

use ndarray::{Array1, s};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings of a [ModelFit]
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FitSettings {
    pub pso: PsoSettings,
    pub objective: ObjectiveSettings,
}

impl FitSettings {
    pub fn new(pso: PsoSettings, objective: ObjectiveSettings) -> Result<Self, ConfigurationError> {
        let settings = Self { pso, objective };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.pso.validate()?;
        self.objective.validate()
    }
}

/// Outcome of [ModelFit::fit]
#[derive(Clone, Debug, PartialEq)]
pub struct FitReport {
    /// Objective at the seed coefficients
    pub initial_fitness: f64,
    /// Objective at the written-back coefficients
    pub fitness: f64,
    pub restarts: Vec<RestartSummary>,
    /// Objective evaluations made by this fit, the initial one included
    pub evaluations: u64,
}

impl From<SwarmError<EvaluationError>> for FitError {
    fn from(err: SwarmError<EvaluationError>) -> Self {
        match err {
            SwarmError::Objective(err) => Self::Evaluation(err),
            SwarmError::Cancelled => Self::Cancelled,
        }
    }
}

/// Fits one or more hand models sharing a depth frame
///
/// The coefficients of all models are concatenated into one vector and optimized together, so
/// the interpenetration penalty sees the spheres of every model.
#[derive(Debug)]
pub struct ModelFit<R> {
    renderer: R,
    num_models: usize,
    settings: FitSettings,
    func_eval_count: u64,
}

impl<R: ResidualRenderer> ModelFit<R> {
    /// Create a new [ModelFit]
    ///
    /// # Arguments
    /// - `renderer`: data term collaborator
    /// - `num_models`: number of models every fit call receives, positive
    /// - `settings`: optimizer and objective settings
    pub fn new(
        renderer: R,
        num_models: usize,
        settings: FitSettings,
    ) -> Result<Self, ConfigurationError> {
        if num_models == 0 {
            return Err(ConfigurationError::NoModels);
        }
        settings.validate()?;
        Ok(Self {
            renderer,
            num_models,
            settings,
            func_eval_count: 0,
        })
    }

    #[inline]
    pub fn settings(&self) -> &FitSettings {
        &self.settings
    }

    #[inline]
    pub fn num_models(&self) -> usize {
        self.num_models
    }

    #[inline]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Total objective evaluations since creation or the last reset
    #[inline]
    pub fn func_eval_count(&self) -> u64 {
        self.func_eval_count
    }

    pub fn reset_func_eval_count(&mut self) {
        self.func_eval_count = 0;
    }

    fn check_models(&self, models: &[HandModel]) -> Result<(), ConfigurationError> {
        if models.len() != self.num_models {
            return Err(ConfigurationError::ModelCount {
                expected: self.num_models,
                actual: models.len(),
            });
        }
        Ok(())
    }

    fn concat_prev(
        &self,
        models: &[HandModel],
        prev_coeffs: Option<&[Array1<f64>]>,
    ) -> Result<Option<Array1<f64>>, ConfigurationError> {
        let Some(prev_coeffs) = prev_coeffs else {
            return Ok(None);
        };
        if prev_coeffs.len() != models.len() {
            return Err(ConfigurationError::ModelCount {
                expected: models.len(),
                actual: prev_coeffs.len(),
            });
        }
        for (model, prev) in models.iter().zip(prev_coeffs) {
            model.metadata().check_len(prev.view())?;
        }
        Ok(Some(prev_coeffs.iter().flatten().copied().collect()))
    }

    /// Fit the models to `frame`, writing the optimized coefficients back into them
    ///
    /// The current coefficients of the models seed the search. On error the models are left
    /// untouched, evaluations made before the error still count.
    ///
    /// # Arguments
    /// - `frame`: observed depth frame
    /// - `models`: exactly [num_models](Self::num_models) models
    /// - `prev_coeffs`: per-model coefficients of the previous frame for the previous-frame
    ///   penalty, `None` uses the seed
    pub fn fit(
        &mut self,
        frame: &DepthFrame,
        models: &mut [HandModel],
        prev_coeffs: Option<&[Array1<f64>]>,
    ) -> Result<FitReport, FitError> {
        self.fit_with_cancel(frame, models, prev_coeffs, None)
    }

    /// [fit](Self::fit) which stops with [FitError::Cancelled] once `cancel` is set
    pub fn fit_with_cancel(
        &mut self,
        frame: &DepthFrame,
        models: &mut [HandModel],
        prev_coeffs: Option<&[Array1<f64>]>,
        cancel: Option<&CancelToken>,
    ) -> Result<FitReport, FitError> {
        self.check_models(models)?;
        let prev = self.concat_prev(models, prev_coeffs)?;
        let pso = ParticleSwarm::new(self.settings.pso.clone())?;
        let seed = concat_coeffs(models);

        let num_models = self.num_models;
        let (result, evaluations) = {
            let mut evaluator = ObjectiveEvaluator::new(
                &self.settings.objective,
                models,
                frame,
                &mut self.renderer,
                prev,
            )?;
            let metadata = evaluator.metadata().clone();
            let result = evaluator
                .evaluate(seed.view())
                .map_err(FitError::from)
                .and_then(|initial| {
                    debug!(fitness = initial, models = num_models, "fit started");
                    let result = pso.minimize(&mut evaluator, seed.view(), &metadata, cancel)?;
                    Ok((initial, result))
                });
            (result, evaluator.evaluations())
        };
        self.func_eval_count += evaluations;
        let (initial_fitness, result) = result?;

        let mut offset = 0;
        for model in models.iter_mut() {
            let len = model.metadata().len();
            model
                .coeffs_mut()
                .assign(&result.coeffs.slice(s![offset..offset + len]));
            offset += len;
        }
        debug!(
            initial = initial_fitness,
            fitness = result.fitness,
            evaluations,
            "fit finished"
        );
        Ok(FitReport {
            initial_fitness,
            fitness: result.fitness,
            restarts: result.restarts,
            evaluations,
        })
    }

    /// Objective at the models' current coefficients, the models are not changed
    pub fn query_objective(
        &mut self,
        frame: &DepthFrame,
        models: &[HandModel],
    ) -> Result<f64, FitError> {
        let combination = self.settings.objective.combination;
        Ok(self.query_objective_terms(frame, models)?.combine(combination))
    }

    /// Separate objective terms at the models' current coefficients
    pub fn query_objective_terms(
        &mut self,
        frame: &DepthFrame,
        models: &[HandModel],
    ) -> Result<ObjectiveTerms, FitError> {
        self.check_models(models)?;
        let coeffs = concat_coeffs(models);
        let mut evaluator = ObjectiveEvaluator::new(
            &self.settings.objective,
            models,
            frame,
            &mut self.renderer,
            None,
        )?;
        let terms = evaluator.evaluate_terms(coeffs.view());
        self.func_eval_count += evaluator.evaluations();
        terms.map_err(FitError::from)
    }
}
