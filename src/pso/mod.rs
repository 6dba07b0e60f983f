//! Particle-swarm optimization over coefficient vectors.
//!
//! The optimizer is generic over a [BatchObjective]: a fitness function which scores a batch
//! of candidate vectors at once. Each restart samples a fresh swarm around a centre, steps it
//! until one of the termination criteria fires, and the best personal best over all restarts
//! wins. Runs are reproducible for a fixed [PsoSettings::seed].

mod settings;
pub use settings::{PsoSettings, RestartCentre, Topology, UpdateRule};

mod swarm;
use swarm::Swarm;

use crate::coeff::CoeffMetadata;
use crate::error::ConfigurationError;

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace, warn};

/// Fitness function evaluated on batches of candidates, lower is better
pub trait BatchObjective {
    type Error;

    /// Largest batch accepted by [evaluate_batch](Self::evaluate_batch)
    fn max_batch_size(&self) -> usize;

    /// Write the fitness of every row of `candidates` into `fitness`
    fn evaluate_batch(
        &mut self,
        candidates: ArrayView2<f64>,
        fitness: &mut [f64],
    ) -> Result<(), Self::Error>;
}

/// [BatchObjective] evaluating an infallible function one candidate at a time
#[derive(Clone, Debug)]
pub struct PerCandidate<F>(pub F);

impl<F> BatchObjective for PerCandidate<F>
where
    F: FnMut(ArrayView1<f64>) -> f64,
{
    type Error = Infallible;

    fn max_batch_size(&self) -> usize {
        usize::MAX
    }

    fn evaluate_batch(
        &mut self,
        candidates: ArrayView2<f64>,
        fitness: &mut [f64],
    ) -> Result<(), Self::Error> {
        for (row, f) in candidates.outer_iter().zip(fitness.iter_mut()) {
            *f = (self.0)(row);
        }
        Ok(())
    }
}

/// Shared flag to stop a running optimization at the next generation boundary
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Error returned from [ParticleSwarm::minimize]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SwarmError<E> {
    #[error("objective evaluation failed: {0}")]
    Objective(#[source] E),

    #[error("optimization was cancelled")]
    Cancelled,
}

/// Why a restart stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StopReason {
    MaxIterations,
    /// Swarm spread fell below [PsoSettings::delta_coeff_termination]
    Converged,
    /// No improvement above [PsoSettings::fitness_tolerance] for
    /// [PsoSettings::stall_generations] generations
    Stalled,
}

/// Outcome of a single restart
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestartSummary {
    pub fitness: f64,
    pub iterations: usize,
    pub stop_reason: StopReason,
}

/// Outcome of [ParticleSwarm::minimize]
#[derive(Clone, Debug, PartialEq)]
pub struct PsoResult {
    pub coeffs: Array1<f64>,
    pub fitness: f64,
    pub restarts: Vec<RestartSummary>,
    /// Number of candidates evaluated
    pub evaluations: u64,
}

/// Particle-swarm minimizer
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleSwarm {
    settings: PsoSettings,
}

impl ParticleSwarm {
    pub fn new(settings: PsoSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    #[inline]
    pub fn settings(&self) -> &PsoSettings {
        &self.settings
    }

    /// Minimize `objective` starting around `seed`
    ///
    /// # Arguments
    /// - `objective`: batch fitness function
    /// - `seed`: starting coefficients, particle 0 of every seed-centred restart sits here
    /// - `metadata`: per-coefficient search radius and angle flags, length of `seed`
    /// - `cancel`: optional flag polled once per generation
    pub fn minimize<O: BatchObjective>(
        &self,
        objective: &mut O,
        seed: ArrayView1<f64>,
        metadata: &CoeffMetadata,
        cancel: Option<&CancelToken>,
    ) -> Result<PsoResult, SwarmError<O::Error>> {
        let settings = &self.settings;
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let mut evaluations = 0;
        let mut best: Option<(Array1<f64>, f64)> = None;
        let mut restarts = Vec::with_capacity(settings.restarts);

        for restart in 0..settings.restarts {
            let centre = match (settings.restart_centre, &best) {
                (RestartCentre::RunningBest, Some((coeffs, _))) => coeffs.view(),
                _ => seed.view(),
            };
            let mut swarm = Swarm::sample(centre, metadata, settings.swarm_size, &mut rng);
            evaluate(objective, &mut swarm, &mut evaluations)?;
            swarm.update_bests();
            debug!(
                restart,
                fitness = swarm.best_fitness(),
                "PSO restart initialized"
            );

            let mut stalled = 0;
            let mut iterations = 0;
            let stop_reason = loop {
                if iterations == settings.max_iterations {
                    break StopReason::MaxIterations;
                }
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    debug!(restart, iterations, "PSO cancelled");
                    return Err(SwarmError::Cancelled);
                }
                let previous = swarm.best_fitness();
                swarm.step(metadata, settings.update_rule, settings.topology, &mut rng);
                evaluate(objective, &mut swarm, &mut evaluations)?;
                swarm.update_bests();
                iterations += 1;

                let spread = swarm.spread(metadata);
                trace!(restart, iterations, fitness = swarm.best_fitness(), spread);
                if spread < settings.delta_coeff_termination {
                    break StopReason::Converged;
                }
                // inf - inf is NaN, which must count as a stall too
                if !(previous - swarm.best_fitness() >= settings.fitness_tolerance) {
                    stalled += 1;
                    if stalled >= settings.stall_generations {
                        break StopReason::Stalled;
                    }
                } else {
                    stalled = 0;
                }
            };

            let fitness = swarm.best_fitness();
            debug!(restart, fitness, iterations, ?stop_reason, "PSO restart finished");
            restarts.push(RestartSummary {
                fitness,
                iterations,
                stop_reason,
            });
            if best.as_ref().is_none_or(|(_, f)| fitness < *f) {
                best = Some((swarm.best_position().to_owned(), fitness));
            }
        }

        let (coeffs, fitness) = match best {
            Some(best) => best,
            // restarts >= 1 is validated, this is the empty-loop fallback
            None => (seed.to_owned(), f64::INFINITY),
        };
        Ok(PsoResult {
            coeffs,
            fitness,
            restarts,
            evaluations,
        })
    }
}

/// Evaluate every particle in batches no larger than the objective accepts
fn evaluate<O: BatchObjective>(
    objective: &mut O,
    swarm: &mut Swarm,
    evaluations: &mut u64,
) -> Result<(), SwarmError<O::Error>> {
    let batch = objective.max_batch_size().max(1);
    for (rows, fitness) in swarm
        .position
        .axis_chunks_iter(Axis(0), batch)
        .zip(swarm.fitness.chunks_mut(batch))
    {
        objective
            .evaluate_batch(rows, fitness)
            .map_err(SwarmError::Objective)?;
        *evaluations += rows.nrows() as u64;
    }
    for f in swarm.fitness.iter_mut().filter(|f| f.is_nan()) {
        warn!("candidate fitness is NaN, treating it as +inf");
        *f = f64::INFINITY;
    }
    Ok(())
}
