use criterion::{criterion_group, criterion_main};

mod kinematics;
mod objective;
mod penalty;

criterion_group!(benches_kinematics, kinematics::bench_pose);
criterion_group!(benches_penalty, penalty::bench_broad_phase);
criterion_group!(benches_objective, objective::bench_evaluate_batch);
criterion_group!(benches_pso, pso::bench_rosenbrock);
criterion_main!(
    benches_kinematics,
    benches_penalty,
    benches_objective,
    benches_pso
);
