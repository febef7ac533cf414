//! CPU classification throughput on synthetic clusters.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use surfdyn::options::SelfTestOptions;
use surfdyn::surface::cpu::CpuClassifier;
use surfdyn::surface::reference::BruteForceClassifier;
use surfdyn::surface::{AtomSet, SurfaceClassifier, SurfaceParams};
use surfdyn::validation::synthetic_trajectory;

fn cluster(atom_count: usize) -> surfdyn::molecule::Trajectory {
    // Keep the density constant as the cluster grows.
    let cluster_radius = 10.0 * (atom_count as f32 / 500.0).cbrt();
    synthetic_trajectory(&SelfTestOptions {
        atom_count,
        cluster_radius,
        ..SelfTestOptions::default()
    })
    .unwrap()
}

fn cpu_threads_benchmark(c: &mut Criterion) {
    let trajectory = cluster(4000);
    let all: Vec<u32> = (0..trajectory.atom_count() as u32).collect();
    let atoms = AtomSet::new(&trajectory, 0, &all).unwrap();
    let params = SurfaceParams::new(1.2, 100).unwrap();

    let mut group = c.benchmark_group("cpu_classify_4000");
    for threads in [1, 2, 4, 8] {
        let mut classifier = CpuClassifier::new(threads).unwrap();
        group.bench_function(format!("{threads}_threads"), |b| {
            b.iter(|| black_box(classifier.classify(&atoms, &params).unwrap()))
        });
    }
    group.finish();
}

fn grid_vs_brute_force_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_vs_brute_force");
    group.sample_size(10);

    for count in [250, 1000] {
        let trajectory = cluster(count);
        let all: Vec<u32> = (0..trajectory.atom_count() as u32).collect();
        let atoms = AtomSet::new(&trajectory, 0, &all).unwrap();
        let params = SurfaceParams::new(1.2, 100).unwrap();

        let mut grid = CpuClassifier::new(1).unwrap();
        group.bench_function(format!("grid_{count}"), |b| {
            b.iter(|| black_box(grid.classify(&atoms, &params).unwrap()))
        });
        group.bench_function(format!("brute_force_{count}"), |b| {
            b.iter(|| {
                black_box(BruteForceClassifier.classify(&atoms, &params).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, cpu_threads_benchmark, grid_vs_brute_force_benchmark);
criterion_main!(benches);
