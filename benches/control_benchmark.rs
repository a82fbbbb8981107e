use criterion::{black_box, criterion_group, criterion_main, Criterion};
use smoker_controller::{derive_gains, ControlLoop, ProcessSimulator};
use std::time::{Duration, Instant};

fn benchmark_gain_derivation(c: &mut Criterion) {
    c.bench_function("derive_gains", |b| {
        b.iter(|| derive_gains(black_box(100.0), black_box(180.0), black_box(45.0)))
    });
}

fn benchmark_evaluate_once(c: &mut Criterion) {
    let gains = derive_gains(100.0, 180.0, 45.0).unwrap();
    let mut control = ControlLoop::new(|| 218.0_f64, |_: f64, _: f64| {}, gains, 225.0);
    let mut now = Instant::now();
    c.bench_function("evaluate_once", |b| {
        b.iter(|| {
            now += Duration::from_secs(5);
            control.evaluate_once(now)
        })
    });
}

fn benchmark_process_advance(c: &mut Criterion) {
    let mut simulator = ProcessSimulator::new(42);
    c.bench_function("process_advance", |b| {
        b.iter(|| simulator.advance(black_box(200.0), black_box(0.5)))
    });
}

criterion_group!(
    benches,
    benchmark_gain_derivation,
    benchmark_evaluate_once,
    benchmark_process_advance
);
criterion_main!(benches);
