use crate::coeff::CoeffMetadata;
use crate::pso::settings::{Topology, UpdateRule};

use ndarray::{Array2, ArrayView1, Axis};
use rand::Rng;
use std::f64::consts::TAU;

/// Uniform sample from `[-radius, radius)`, exactly zero for a zero radius
#[inline]
fn symmetric_sample<R: Rng>(rng: &mut R, radius: f64) -> f64 {
    radius * (2.0 * rng.random::<f64>() - 1.0)
}

/// State of one swarm, particles are rows
#[derive(Clone, Debug)]
pub(super) struct Swarm {
    pub position: Array2<f64>,
    pub velocity: Array2<f64>,
    pub fitness: Vec<f64>,
    pub best_position: Array2<f64>,
    pub best_fitness: Vec<f64>,
    /// Particle holding the best personal best
    pub global_best: usize,
}

impl Swarm {
    /// Sample particles uniformly within `centre ± pso_radius`, particle 0 sits exactly on the
    /// centre. Fitness is unknown until the first evaluation.
    pub fn sample<R: Rng>(
        centre: ArrayView1<f64>,
        metadata: &CoeffMetadata,
        swarm_size: usize,
        rng: &mut R,
    ) -> Self {
        let dim = centre.len();
        let bounds = metadata.seed_bounds(centre);
        let mut position = Array2::zeros((swarm_size, dim));
        let mut velocity = Array2::zeros((swarm_size, dim));
        for (i, (mut x, mut v)) in position
            .outer_iter_mut()
            .zip(velocity.outer_iter_mut())
            .enumerate()
        {
            for (d, (&(lower, upper), info)) in bounds.iter().zip(metadata.dims()).enumerate() {
                x[d] = if i == 0 {
                    centre[d]
                } else {
                    lower + (upper - lower) * rng.random::<f64>()
                };
                v[d] = symmetric_sample(rng, info.pso_radius);
            }
            metadata.wrap(x.view_mut());
        }
        Self {
            best_position: position.clone(),
            position,
            velocity,
            fitness: vec![f64::INFINITY; swarm_size],
            best_fitness: vec![f64::INFINITY; swarm_size],
            global_best: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fitness.len()
    }

    #[inline]
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness[self.global_best]
    }

    #[inline]
    pub fn best_position(&self) -> ArrayView1<'_, f64> {
        self.best_position.row(self.global_best)
    }

    /// Fold the latest fitness into personal and global bests
    ///
    /// Only strict improvements replace a best, scanning particles in index order, so exact
    /// ties keep the earlier best.
    pub fn update_bests(&mut self) {
        for i in 0..self.len() {
            if self.fitness[i] < self.best_fitness[i] {
                self.best_fitness[i] = self.fitness[i];
                self.best_position.row_mut(i).assign(&self.position.row(i));
            }
        }
        for i in 0..self.len() {
            if self.best_fitness[i] < self.best_fitness[self.global_best] {
                self.global_best = i;
            }
        }
    }

    /// Particle whose personal best attracts particle `i`
    fn neighbourhood_best(&self, i: usize, topology: Topology) -> usize {
        match topology {
            Topology::GlobalBest => self.global_best,
            Topology::Ring { neighbours } => {
                let n = self.len();
                let k = neighbours.min(n / 2);
                (0..=2 * k)
                    .map(|offset| (i + n + offset - k) % n)
                    .min_by(|&a, &b| {
                        self.best_fitness[a]
                            .total_cmp(&self.best_fitness[b])
                            .then(a.cmp(&b))
                    })
                    .unwrap_or(i)
            }
        }
    }

    /// Advance every particle by one velocity step
    ///
    /// Velocities are clamped to `±pso_radius` per coefficient, angle coefficients move along
    /// the shortest arc and are wrapped back into `[-π, π)`.
    pub fn step<R: Rng>(
        &mut self,
        metadata: &CoeffMetadata,
        rule: UpdateRule,
        topology: Topology,
        rng: &mut R,
    ) {
        let (omega, c_p, c_g) = rule.coefficients();
        for i in 0..self.len() {
            let attractor = self.neighbourhood_best(i, topology);
            let personal = self.best_position.row(i);
            let social = self.best_position.row(attractor);
            let mut x = self.position.row_mut(i);
            let mut v = self.velocity.row_mut(i);
            for (d, info) in metadata.dims().iter().enumerate() {
                let r_p = rng.random::<f64>();
                let r_g = rng.random::<f64>();
                let to_personal = info.displacement(x[d], personal[d]);
                let to_social = info.displacement(x[d], social[d]);
                let vel = omega * v[d] + c_p * r_p * to_personal + c_g * r_g * to_social;
                v[d] = vel.clamp(-info.pso_radius, info.pso_radius);
                x[d] = info.wrap(x[d] + v[d]);
            }
        }
    }

    /// Norm of the per-coefficient extent of the current positions
    ///
    /// The extent of an angle coefficient is the shortest arc covering all of its values, so a
    /// swarm gathered around `±π` counts as tight.
    pub fn spread(&self, metadata: &CoeffMetadata) -> f64 {
        self.position
            .axis_iter(Axis(1))
            .zip(metadata.dims())
            .map(|(column, info)| {
                let extent = if info.is_angle {
                    circular_extent(column.to_vec())
                } else {
                    let (lo, hi) = column
                        .iter()
                        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                            (lo.min(x), hi.max(x))
                        });
                    hi - lo
                };
                extent * extent
            })
            .sum::<f64>()
            .sqrt()
    }
}

/// Length of the shortest arc holding every angle, `2π` minus the widest gap between neighbours
fn circular_extent(mut angles: Vec<f64>) -> f64 {
    angles.sort_by(f64::total_cmp);
    let (Some(&first), Some(&last)) = (angles.first(), angles.last()) else {
        return 0.0;
    };
    let widest_gap = angles
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold(first + TAU - last, f64::max);
    (TAU - widest_gap).max(0.0)
}
