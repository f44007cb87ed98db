use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::DVec3;
use morph_geom::{describe, describe_axes, DescriptorOptions, HullMeasure};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Jittered lattice filling a lath-shaped crystal.
fn crystal(nx: usize, ny: usize, nz: usize, seed: u64) -> Vec<DVec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(nx * ny * nz);
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                let jitter = DVec3::new(rng.gen(), rng.gen(), rng.gen()) * 0.05;
                points.push(DVec3::new(i as f64, j as f64, k as f64) + jitter);
            }
        }
    }
    points
}

fn bench_describe_small(c: &mut Criterion) {
    let points = crystal(20, 10, 4, 1);
    let options = DescriptorOptions::default();

    c.bench_function("describe_800_points", |b| {
        b.iter(|| describe(black_box(&points), &options))
    });
}

fn bench_axes_only(c: &mut Criterion) {
    let points = crystal(60, 30, 10, 2);
    let options = DescriptorOptions::default();

    c.bench_function("describe_axes_18000_points", |b| {
        b.iter(|| describe_axes(black_box(&points), &options))
    });
}

fn bench_hull_larger(c: &mut Criterion) {
    // Hull dominates descriptor time on realistic crystal sizes
    let points = crystal(60, 30, 10, 3);

    c.bench_function("hull_18000_points", |b| {
        b.iter(|| HullMeasure::compute(black_box(&points)))
    });
}

criterion_group!(benches, bench_describe_small, bench_axes_only, bench_hull_larger);
criterion_main!(benches);
