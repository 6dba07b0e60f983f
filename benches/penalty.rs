use criterion::Criterion;
use hand_model_fit::penalty::{BroadPhaseKind, PenetrationMeasure};
use hand_model_fit::{HandType, InterpenetrationPenalty, PlacedSphere};
use hand_model_fit_test_util::{posed_geometry, reference_hand};
use std::hint::black_box;

pub fn bench_broad_phase(c: &mut Criterion) {
    // Two hands close enough for their spheres to overlap
    let models = [
        reference_hand(HandType::Left, -15.0, 0.0),
        reference_hand(HandType::Right, 15.0, 0.0),
    ];
    let spheres: Vec<PlacedSphere> = posed_geometry(&models).spheres().copied().collect();
    let penalty = InterpenetrationPenalty::new(0.1, PenetrationMeasure::default(), None);

    for (name, kind) in [
        ("Interpenetration: all pairs", BroadPhaseKind::AllPairs),
        ("Interpenetration: sweep and prune", BroadPhaseKind::SweepAndPrune),
    ] {
        let mut broad_phase = kind.build();
        let mut pairs = vec![];
        c.bench_function(name, |b| {
            b.iter(|| penalty.total_penetration(black_box(&spheres), &mut broad_phase, &mut pairs));
        });
    }
}
