use crate::kinematics::PlacedSphere;

use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[enum_dispatch]
pub trait BroadPhaseTrait {
    /// Write candidate pairs `(i, j)` with `i < j` into `pairs`, in ascending order
    ///
    /// Every pair whose spheres overlap must be reported. Pairs which merely touch may be
    /// dropped.
    fn candidate_pairs(&mut self, spheres: &[PlacedSphere], pairs: &mut Vec<(usize, usize)>);
}

/// Broad-phase collision culling
#[enum_dispatch(BroadPhaseTrait)]
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum BroadPhase {
    AllPairs(AllPairs),
    SweepAndPrune(SweepAndPrune),
}

/// Serializable choice of the [BroadPhase] implementation
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BroadPhaseKind {
    #[default]
    AllPairs,
    SweepAndPrune,
}

impl BroadPhaseKind {
    pub fn build(self) -> BroadPhase {
        match self {
            Self::AllPairs => AllPairs.into(),
            Self::SweepAndPrune => SweepAndPrune::default().into(),
        }
    }
}

/// Every pair is a candidate
#[derive(Clone, Copy, Debug, Default)]
pub struct AllPairs;

impl BroadPhaseTrait for AllPairs {
    fn candidate_pairs(&mut self, spheres: &[PlacedSphere], pairs: &mut Vec<(usize, usize)>) {
        pairs.clear();
        pairs.extend((0..spheres.len()).tuple_combinations::<(usize, usize)>());
    }
}

#[derive(Clone, Debug, Default)]
struct AxisOrder {
    /// Sphere indices sorted by the lower end of their extent
    starts: Vec<usize>,
    /// Sphere indices sorted by the upper end of their extent
    ends: Vec<usize>,
}

/// Three-axis sweep-and-prune over sphere bounding boxes
///
/// The sorted endpoint lists persist between calls. Successive candidates of an optimizer
/// are close to each other, so the insertion sort restoring the order is nearly linear.
/// Instances are not shareable: keep one per thread.
#[derive(Clone, Debug, Default)]
pub struct SweepAndPrune {
    axes: [AxisOrder; 3],
    /// Number of axes on which each pair overlaps, row-major `n x n`, upper triangle only
    overlaps: Vec<u8>,
    active: Vec<usize>,
}

fn insertion_sort_by(indices: &mut [usize], key: impl Fn(usize) -> f64) {
    for i in 1..indices.len() {
        let mut j = i;
        while j > 0 && key(indices[j - 1]) > key(indices[j]) {
            indices.swap(j - 1, j);
            j -= 1;
        }
    }
}

impl SweepAndPrune {
    fn reset(&mut self, n: usize) {
        for axis in self.axes.iter_mut() {
            axis.starts = (0..n).collect();
            axis.ends = (0..n).collect();
        }
    }

    fn sweep_axis(&mut self, spheres: &[PlacedSphere], axis: usize) {
        let n = spheres.len();
        let order = &mut self.axes[axis];
        // Degenerate spheres sort last on every axis and never enter the active list
        let key = |i: usize, extent: fn(&PlacedSphere, usize) -> f64| {
            let sphere = &spheres[i];
            if sphere.is_degenerate() {
                f64::INFINITY
            } else {
                extent(sphere, axis)
            }
        };
        insertion_sort_by(&mut order.starts, |i| key(i, PlacedSphere::extent_min));
        insertion_sort_by(&mut order.ends, |i| key(i, PlacedSphere::extent_max));

        self.active.clear();
        let (mut s, mut e) = (0, 0);
        while s < n {
            let next_start = order.starts[s];
            if spheres[next_start].is_degenerate() {
                s += 1;
                continue;
            }
            let starts_first = e >= n
                || spheres[next_start].extent_min(axis)
                    < key(order.ends[e], PlacedSphere::extent_max);
            if starts_first {
                for &other in &self.active {
                    let (i, j) = if other < next_start {
                        (other, next_start)
                    } else {
                        (next_start, other)
                    };
                    self.overlaps[i * n + j] += 1;
                }
                self.active.push(next_start);
                s += 1;
            } else {
                let next_end = order.ends[e];
                if let Some(pos) = self.active.iter().position(|&i| i == next_end) {
                    self.active.swap_remove(pos);
                }
                e += 1;
            }
        }
    }
}

impl BroadPhaseTrait for SweepAndPrune {
    fn candidate_pairs(&mut self, spheres: &[PlacedSphere], pairs: &mut Vec<(usize, usize)>) {
        let n = spheres.len();
        if self.axes[0].starts.len() != n {
            self.reset(n);
        }
        self.overlaps.clear();
        self.overlaps.resize(n * n, 0);
        for axis in 0..3 {
            self.sweep_axis(spheres, axis);
        }
        pairs.clear();
        let overlaps = &self.overlaps;
        pairs.extend(
            (0..n)
                .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
                .filter(|&(i, j)| overlaps[i * n + j] == 3),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tests::*;

    use nalgebra::Point3;

    fn boxes_overlap(a: &PlacedSphere, b: &PlacedSphere) -> bool {
        (0..3).all(|axis| {
            a.extent_min(axis) < b.extent_max(axis) && b.extent_min(axis) < a.extent_max(axis)
        })
    }

    #[test]
    fn all_pairs_enumerates_upper_triangle() {
        let spheres = random_spheres(&mut StdRng::seed_from_u64(0), 4, 10.0);
        let mut pairs = vec![];
        AllPairs.candidate_pairs(&spheres, &mut pairs);
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn sweep_and_prune_reports_exactly_overlapping_boxes() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut sap = SweepAndPrune::default();
        let mut pairs = vec![];
        // Repeated calls exercise the persistent ordering, including a size change
        for &n in &[36, 36, 36, 72, 10] {
            let spheres = random_spheres(&mut rng, n, 60.0);
            sap.candidate_pairs(&spheres, &mut pairs);
            let expected: Vec<_> = (0..n)
                .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
                .filter(|&(i, j)| boxes_overlap(&spheres[i], &spheres[j]))
                .collect();
            assert_eq!(pairs, expected);
        }
    }

    #[test]
    fn sweep_and_prune_tracks_moving_spheres() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut spheres = random_spheres(&mut rng, 40, 50.0);
        let mut sap = SweepAndPrune::default();
        let mut pairs = vec![];
        for _ in 0..20 {
            for s in spheres.iter_mut() {
                s.center += nalgebra::Vector3::new(
                    rng.random_range(-3.0..3.0),
                    rng.random_range(-3.0..3.0),
                    rng.random_range(-3.0..3.0),
                );
            }
            sap.candidate_pairs(&spheres, &mut pairs);
            let mut all = vec![];
            AllPairs.candidate_pairs(&spheres, &mut all);
            all.retain(|&(i, j)| boxes_overlap(&spheres[i], &spheres[j]));
            assert_eq!(pairs, all);
        }
    }

    #[test]
    fn touching_boxes_are_not_candidates() {
        let sphere = |x: f64| PlacedSphere {
            center: Point3::new(x, 0.0, 0.0),
            radius: 1.0,
            group: 0,
            model: 0,
        };
        let mut pairs = vec![];
        SweepAndPrune::default().candidate_pairs(&[sphere(0.0), sphere(2.0)], &mut pairs);
        assert!(pairs.is_empty());
        SweepAndPrune::default().candidate_pairs(&[sphere(0.0), sphere(1.9)], &mut pairs);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn degenerate_spheres_do_not_hide_overlaps() {
        let sphere = |x: f64, group: usize| PlacedSphere {
            center: Point3::new(x, 0.0, 0.0),
            radius: 1.0,
            group,
            model: 0,
        };
        let mut zero_radius = sphere(0.2, 3);
        zero_radius.radius = 0.0;
        let spheres = [sphere(0.0, 0), sphere(f64::NAN, 1), sphere(0.5, 2), zero_radius];
        let mut sap = SweepAndPrune::default();
        let mut pairs = vec![];
        // the second call starts from the ordering left by the first
        for _ in 0..2 {
            sap.candidate_pairs(&spheres, &mut pairs);
            assert_eq!(pairs, vec![(0, 2)]);
        }
    }

    #[test]
    fn kind_builds_matching_variant() {
        assert!(matches!(BroadPhaseKind::AllPairs.build(), BroadPhase::AllPairs(_)));
        assert!(matches!(
            BroadPhaseKind::SweepAndPrune.build(),
            BroadPhase::SweepAndPrune(_)
        ));
    }
}
