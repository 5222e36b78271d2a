use RustedODE::numerical::DormandPrince::DP_main::DPsolver;
use criterion::{Criterion, criterion_group, criterion_main};
use std::collections::HashMap;
use std::hint::black_box;

fn oscillator_solver() -> DPsolver {
    let solver = DPsolver::new();
    solver.set_equations(&["y'' = -0.1*y_1 - y"]).unwrap();
    solver
        .set_initial_conditions(HashMap::from([
            ("y".to_string(), 1.0),
            ("y_1".to_string(), 0.0),
        ]))
        .unwrap();
    solver.set_range("t", 0.0, 20.0, 0.01).unwrap();
    solver
}

fn bench_adaptive(c: &mut Criterion) {
    let solver = oscillator_solver();
    solver.set_tolerance(1e-8, 1e-8).unwrap();
    c.bench_function("damped oscillator, adaptive", |b| {
        b.iter(|| black_box(solver.run(true).unwrap()))
    });
}

fn bench_fixed(c: &mut Criterion) {
    let solver = oscillator_solver();
    c.bench_function("damped oscillator, fixed step", |b| {
        b.iter(|| black_box(solver.run(false).unwrap()))
    });
}

fn bench_reduction(c: &mut Criterion) {
    let solver = DPsolver::new();
    c.bench_function("reduce third order system", |b| {
        b.iter(|| {
            solver
                .set_equations(black_box(&["y''' = -y_2 - sin(y_1) + exp(-t)*z", "z' = y - z"]))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_adaptive, bench_fixed, bench_reduction);
criterion_main!(benches);
