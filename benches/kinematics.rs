use criterion::Criterion;
use hand_model_fit::HandType;
use hand_model_fit::coeff::HandCoeff;
use hand_model_fit_test_util::reference_hand;
use std::hint::black_box;

pub fn bench_pose(c: &mut Criterion) {
    let mut model = reference_hand(HandType::Right, 0.0, 0.0);
    model.coeffs_mut()[HandCoeff::WristTheta.index()] = 0.3;
    let shape = model.shape();

    c.bench_function("Forward kinematics: one hand", |b| {
        b.iter(|| {
            model
                .kinematics()
                .pose(black_box(model.coeffs()), &shape, 0)
        });
    });
}
