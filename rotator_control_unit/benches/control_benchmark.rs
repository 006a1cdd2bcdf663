//! Control benchmark: angle averaging, error computation and one full
//! control tick against the simulated dish.
//!
//! The control period is 100 ms; a tick including ten sensor exchanges per
//! axis should stay far below 1 ms.

use std::sync::Arc;
use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use rotator_common::store::MemoryStore;
use rotator_common::wind::NoWindSafety;
use rotator_control_unit::angle::error::shortest_error_az;
use rotator_control_unit::config::RotatorConfig;
use rotator_control_unit::controller::{Hardware, Rotator};
use rotator_control_unit::sensor::averaging::average_angles;
use rotator_control_unit::sim::SimDish;
use rotator_control_unit::store::shared;

/// Samples straddling the seam with one outlier.
fn seam_samples(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| match i % 5 {
            0 => 359.5,
            1 => 0.3,
            2 => 359.9,
            3 => 0.1,
            _ => 30.0,
        })
        .collect()
}

fn bench_averaging(c: &mut Criterion) {
    let mut group = c.benchmark_group("average_angles");
    for &n in &[5usize, 10, 20, 32] {
        let samples = seam_samples(n);
        group.bench_with_input(BenchmarkId::new("samples", n), &samples, |b, s| {
            b.iter(|| average_angles(std::hint::black_box(s)));
        });
    }
    group.finish();
}

fn bench_error(c: &mut Criterion) {
    c.bench_function("shortest_error_az_sweep", |b| {
        b.iter(|| {
            let mut acc = 0.0f32;
            for target in (0..360).step_by(15) {
                for count in -1..=1 {
                    acc += shortest_error_az(target as f32, 271.0, count);
                }
            }
            std::hint::black_box(acc)
        });
    });
}

fn bench_control_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_tick");
    group.sample_size(200);

    let dish = SimDish::default();
    let t0 = Instant::now();
    let mut rotator = Rotator::initialize(
        &RotatorConfig::default(),
        Hardware::simulated(&dish),
        shared(MemoryStore::new()),
        Arc::new(NoWindSafety),
        t0,
    );

    let mut now = t0;
    let mut ticks = 0u64;
    group.bench_function("moving", |b| {
        b.iter(|| {
            // Alternate targets so the dish keeps moving.
            if ticks % 100 == 0 {
                let target = if (ticks / 100) % 2 == 0 { 90.0 } else { 250.0 };
                let _ = rotator.handle.set_setpoint_az(target);
            }
            ticks += 1;
            now += Duration::from_millis(100);
            let readings = rotator.control.tick(now);
            dish.advance(Duration::from_millis(100));
            std::hint::black_box(readings)
        });
    });

    group.bench_function("safety", |b| {
        b.iter(|| {
            now += Duration::from_millis(500);
            rotator.safety.tick(now);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_averaging, bench_error, bench_control_tick);
criterion_main!(benches);
