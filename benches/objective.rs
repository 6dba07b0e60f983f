use criterion::Criterion;
use hand_model_fit::{HandType, ObjectiveEvaluator, ObjectiveSettings, ResidualRenderer};
use hand_model_fit_test_util::{reference_hand, single_hand_renderer, synthetic_frame};
use ndarray::Array2;
use rand::prelude::*;
use std::hint::black_box;

pub fn bench_evaluate_batch(c: &mut Criterion) {
    let mut renderer = single_hand_renderer();
    let models = [reference_hand(HandType::Right, 0.0, 0.0)];
    let frame = synthetic_frame(&renderer, &models);
    let n = renderer.max_batch_size();

    let mut rng = StdRng::seed_from_u64(0);
    let seed = models[0].coeffs().to_owned();
    let candidates = Array2::from_shape_fn((n, seed.len()), |(_, j)| {
        if j < 3 {
            seed[j] + rng.random_range(-5.0..5.0)
        } else {
            seed[j]
        }
    });
    let mut fitness = vec![0.0; n];

    let settings = ObjectiveSettings::default();
    let mut evaluator =
        ObjectiveEvaluator::new(&settings, &models, &frame, &mut renderer, None).unwrap();
    c.bench_function("Objective: full batch of one hand", |b| {
        b.iter(|| {
            evaluator
                .evaluate_batch(black_box(candidates.view()), &mut fitness)
                .unwrap()
        });
    });
}
