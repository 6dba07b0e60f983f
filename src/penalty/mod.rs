//! Interpenetration penalty between bounding spheres of the posed models.

mod broad_phase;
pub use broad_phase::{AllPairs, BroadPhase, BroadPhaseKind, BroadPhaseTrait, SweepAndPrune};

use crate::kinematics::PlacedSphere;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How the overlap of two spheres is measured
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PenetrationMeasure {
    /// `(r_a + r_b - d)^2`
    #[default]
    SquaredDepth,
    /// `(r_a + r_b)^2 - d^2`
    SquaredDistanceGap,
    /// `r_a + r_b - d`
    LinearDepth,
}

impl PenetrationMeasure {
    /// Penetration of two spheres, zero unless their centre distance is below the radii sum
    pub fn penetration(self, a: &PlacedSphere, b: &PlacedSphere) -> f64 {
        let min_dist = a.radius + b.radius;
        let dist_sq = (a.center - b.center).norm_squared();
        if dist_sq >= min_dist * min_dist {
            return 0.0;
        }
        match self {
            Self::SquaredDepth => {
                let depth = min_dist - dist_sq.sqrt();
                depth * depth
            }
            Self::SquaredDistanceGap => min_dist * min_dist - dist_sq,
            Self::LinearDepth => min_dist - dist_sq.sqrt(),
        }
    }
}

/// Soft penalty `1 + k * total_penetration` discouraging self-intersecting poses
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterpenetrationPenalty {
    constant: f64,
    measure: PenetrationMeasure,
    max_groups: Option<usize>,
}

impl InterpenetrationPenalty {
    /// Create a new [InterpenetrationPenalty]
    ///
    /// # Arguments
    /// - `constant`: weight `k` of the accumulated penetration
    /// - `measure`: per-pair penetration measure
    /// - `max_groups`: only groups `< max_groups` of every model take part, `None` for all
    pub fn new(constant: f64, measure: PenetrationMeasure, max_groups: Option<usize>) -> Self {
        Self {
            constant,
            measure,
            max_groups,
        }
    }

    #[inline]
    fn takes_part(&self, sphere: &PlacedSphere) -> bool {
        !sphere.is_degenerate() && self.max_groups.is_none_or(|max| sphere.group < max)
    }

    /// Penetration of a candidate pair, zero for pairs which are excluded from the penalty
    #[inline]
    pub fn pair_penetration(&self, a: &PlacedSphere, b: &PlacedSphere) -> f64 {
        if a.same_group(b) || !self.takes_part(a) || !self.takes_part(b) {
            return 0.0;
        }
        self.measure.penetration(a, b)
    }

    /// Accumulated penetration over the pairs proposed by `broad_phase`
    ///
    /// `pairs` is scratch space reused between calls. Pairs are summed in ascending order, so
    /// the result does not depend on the broad phase used.
    pub fn total_penetration(
        &self,
        spheres: &[PlacedSphere],
        broad_phase: &mut BroadPhase,
        pairs: &mut Vec<(usize, usize)>,
    ) -> f64 {
        broad_phase.candidate_pairs(spheres, pairs);
        pairs
            .iter()
            .map(|&(i, j)| self.pair_penetration(&spheres[i], &spheres[j]))
            .sum()
    }

    /// Accumulated penetration testing every pair
    pub fn total_penetration_all_pairs(&self, spheres: &[PlacedSphere]) -> f64 {
        self.total_penetration(spheres, &mut AllPairs.into(), &mut vec![])
    }

    /// Penalty factor for the accumulated penetration
    #[inline]
    pub fn penalty(&self, total_penetration: f64) -> f64 {
        1.0 + self.constant * total_penetration
    }
}
