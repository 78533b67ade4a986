use cascade_core::{CycleStats, Edit, EditKind};
use cascade_graph::{erdos_renyi, random_batch, BatchSpec, CascadeEngine, Graph, SsspState, WeightRange};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;
use std::time::Duration;

/// Sparse random graph with an average degree of about eight.
fn create_test_graph(vertices: u32, seed: u64) -> Graph<u32> {
    let p = (8.0 / f64::from(vertices)).min(1.0);
    erdos_renyi(vertices, p, WeightRange::default(), &mut StdRng::seed_from_u64(seed))
}

fn create_batch(graph: &Graph<u32>, count: usize, seed: u64) -> Vec<Edit<u32>> {
    let spec = BatchSpec {
        count,
        kinds: EditKind::EDGE_KINDS.to_vec(),
        ..Default::default()
    };
    random_batch(graph, &spec, &mut StdRng::seed_from_u64(seed))
}

fn bench_full_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_solve");
    group.measurement_time(Duration::from_secs(5));

    for size in [100u32, 1_000, 10_000].iter() {
        let graph = create_test_graph(*size, 1);
        group.bench_with_input(BenchmarkId::new("dijkstra", size), &graph, |b, graph| {
            b.iter(|| {
                let mut state = SsspState::new();
                state.solve(graph, 0, &mut CycleStats::new()).unwrap();
                black_box(state.distance(&(size - 1)))
            })
        });
    }

    group.finish();
}

fn bench_cascade_vs_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("cascade_vs_solve");
    group.measurement_time(Duration::from_secs(8));

    let graph = create_test_graph(5_000, 2);
    let mut solved = CascadeEngine::new(graph.clone());
    solved.solve(0).unwrap();

    for edits in [1usize, 10, 100].iter() {
        let batch = create_batch(&graph, *edits, 3);

        group.bench_with_input(BenchmarkId::new("cascade", edits), &batch, |b, batch| {
            b.iter_batched(
                || solved.clone(),
                |mut engine| {
                    engine.apply_batch(batch).unwrap();
                    black_box(engine.cascade())
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("resolve", edits), &batch, |b, batch| {
            b.iter_batched(
                || solved.clone(),
                |mut engine| {
                    engine.apply_batch(batch).unwrap();
                    engine.solve(0).unwrap();
                    black_box(engine.distance(&1))
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_performance_targets(c: &mut Criterion) {
    let mut group = c.benchmark_group("performance_targets");
    group.significance_level(0.1).sample_size(20);

    let graph = create_test_graph(1_000, 4);
    let mut solved = CascadeEngine::new(graph.clone());
    solved.solve(0).unwrap();
    let batch = create_batch(&graph, 1, 5);

    group.bench_function("single_edit_1000_vertices", |b| {
        b.iter_batched(
            || solved.clone(),
            |mut engine| {
                engine.apply_batch(&batch).unwrap();
                black_box(engine.cascade())
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_full_solve,
    bench_cascade_vs_solve,
    bench_performance_targets
);
criterion_main!(benches);
