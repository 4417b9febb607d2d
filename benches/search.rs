//! Search benchmarks.
//!
//! Run with: `cargo bench`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mcts_2048::board::{Board, Move};
use mcts_2048::config::{MctsConfig, RolloutKind};
use mcts_2048::mcts::MonteCarloTreeSearch;
use mcts_2048::random::SeededRandomGenerator;

fn midgame() -> Board {
    Board::from_rows([[2, 4, 8, 16], [0, 2, 32, 64], [0, 0, 4, 128], [0, 0, 2, 256]]).unwrap()
}

fn bench_apply_move(c: &mut Criterion) {
    let board = midgame();
    c.bench_function("apply_move_all_directions", |b| {
        b.iter(|| {
            for mv in Move::ALL {
                black_box(black_box(&board).apply_move(mv));
            }
        })
    });
}

fn bench_select_move(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_move");
    group.sample_size(10);

    for iterations in [100u32, 400, 1600] {
        group.throughput(Throughput::Elements(u64::from(iterations)));
        for kind in [RolloutKind::Random, RolloutKind::Greedy] {
            let id = BenchmarkId::new(format!("{kind:?}").to_lowercase(), iterations);
            group.bench_with_input(id, &iterations, |b, &iterations| {
                let config = MctsConfig::default()
                    .with_iterations(iterations)
                    .with_rollout(kind)
                    .with_seed(1);
                let mut engine = MonteCarloTreeSearch::new(config).unwrap();
                let board = midgame();
                b.iter(|| black_box(engine.select_move(&board)));
            });
        }
    }
    group.finish();
}

fn bench_parallel_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_move_parallel");
    group.sample_size(10);

    for workers in [1usize, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            let config = MctsConfig::default()
                .with_iterations(1600)
                .with_workers(workers)
                .with_seed(1);
            let mut engine = MonteCarloTreeSearch::new(config).unwrap();
            let mut rng = SeededRandomGenerator::new(9);
            let board = Board::new_game(&mut rng);
            b.iter(|| black_box(engine.select_move(&board)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_apply_move, bench_select_move, bench_parallel_search);
criterion_main!(benches);
