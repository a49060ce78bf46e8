//! Benchmarks for name-aware broadcasting.
//!
//! Casting is metadata work; the cost that grows with size is the permute and
//! the element-wise kernel that follow it.
//!
//! Run with:
//! ```bash
//! cargo bench --bench broadcast
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use tenrso_named::dimcast::cast_dim;
use tenrso_named::types::dims;
use tenrso_named::{BroadcastPolicy, Broadcaster, DenseND, NamedTensor};

fn tensor(shape: &[usize], names: &[Option<&str>]) -> NamedTensor<f64> {
    NamedTensor::with_dims(DenseND::ones(shape), names.iter().copied()).unwrap()
}

/// Benchmark the caster alone for growing ranks
fn bench_cast_dim(c: &mut Criterion) {
    let mut group = c.benchmark_group("cast_dim");
    let names = ["A", "B", "C", "D", "E", "F", "G", "H"];

    for rank in [2usize, 4, 6, 8] {
        let target = dims(names[..rank].iter().map(|n| Some(*n)));
        let subject = dims(names[..rank].iter().rev().step_by(2).map(|n| Some(*n)));
        group.bench_with_input(BenchmarkId::from_parameter(rank), &(target, subject), |b, (t, s)| {
            b.iter(|| black_box(cast_dim(black_box(t), black_box(s), false).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark full broadcasting, vanilla against unilateral
fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");

    let test_cases = vec![
        ("image_label", vec![8, 3, 128, 128], vec![8, 128, 128]),
        ("channel_bias", vec![16, 64, 32, 32], vec![64, 1, 1]),
        ("small", vec![4, 8, 16], vec![8, 16]),
    ];

    for (name, x_shape, y_shape) in test_cases {
        let x = tensor(&x_shape, &[None, Some("C"), Some("H"), Some("W")][4 - x_shape.len()..]);
        let y_names: Vec<Option<&str>> = match y_shape.len() {
            3 if y_shape[1] == 1 => vec![Some("C"), Some("H"), Some("W")],
            3 => vec![None, Some("H"), Some("W")],
            _ => vec![Some("H"), Some("W")],
        };
        let y = tensor(&y_shape, &y_names);
        let total: usize = x_shape.iter().product();
        group.throughput(Throughput::Elements(total as u64));

        group.bench_with_input(BenchmarkId::new("unilateral", name), &(&x, &y), |b, (x, y)| {
            let broadcaster = Broadcaster::unilateral();
            b.iter(|| black_box(broadcaster.broadcast(black_box(*x), black_box(*y)).unwrap()));
        });

        // trailing alignment cannot line up image and label
        if Broadcaster::vanilla().broadcast(&x, &y).is_ok() {
            group.bench_with_input(BenchmarkId::new("vanilla", name), &(&x, &y), |b, (x, y)| {
                let broadcaster = Broadcaster::vanilla();
                b.iter(|| black_box(broadcaster.broadcast(black_box(*x), black_box(*y)).unwrap()));
            });
        }
    }

    group.finish();
}

/// Benchmark a promoted element-wise addition end to end
fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("named_add");

    for size in [64usize, 256, 1024] {
        let x = tensor(&[size, size], &[Some("N"), Some("T")]);
        let y = tensor(&[size], &[Some("T")]);
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &(&x, &y), |b, (x, y)| {
            b.iter(|| black_box((*x + *y).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cast_dim, bench_broadcast, bench_add);
criterion_main!(benches);
