//! Benchmarks for recording and replaying command groups.
//!
//! Run with: cargo bench -p rewind-core --bench history_bench
//!
//! | Scenario                 | Work per iteration                    |
//! |--------------------------|---------------------------------------|
//! | record                   | one command, one action               |
//! | record (merged)          | one command appended to the top group |
//! | undo/redo round trip     | full unwind and replay of N groups    |
//! | record at limit          | push plus eviction of the oldest      |

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use rewind_core::{CommandSpec, FnAction, ResourceRef, Target, UndoConfig, UndoManager};

// ============================================================================
// Setup helpers
// ============================================================================

fn noop(resources: &[ResourceRef]) -> Box<FnAction> {
    Box::new(FnAction::new(resources.to_vec(), || Ok(()), || Ok(())))
}

fn record(undo: &mut UndoManager, spec: &CommandSpec, resources: &[ResourceRef]) {
    undo.begin_command(spec.clone());
    undo.record(noop(resources));
    undo.end_command();
}

/// A manager holding `n` unmerged groups spread over `docs` resources.
fn setup_history(n: usize, docs: &[ResourceRef]) -> UndoManager {
    let limit = n.max(1);
    let mut undo = UndoManager::new(UndoConfig::new(limit, limit));
    let spec = CommandSpec::new("Edit");
    for i in 0..n {
        record(&mut undo, &spec, std::slice::from_ref(&docs[i % docs.len()]));
    }
    undo
}

fn resources(count: usize) -> Vec<ResourceRef> {
    (0..count).map(|i| ResourceRef::new(format!("doc{i}"))).collect()
}

// ============================================================================
// Recording
// ============================================================================

fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");
    let docs = resources(1);

    group.bench_function("new_group", |b| {
        let mut undo = UndoManager::new(UndoConfig::new(1_000, 1_000));
        let spec = CommandSpec::new("Edit");
        b.iter(|| {
            undo.break_merge();
            record(&mut undo, black_box(&spec), &docs);
        });
    });

    group.bench_function("merged", |b| {
        let mut undo = UndoManager::default();
        let spec = CommandSpec::new("Typing").with_merge_id("typing");
        record(&mut undo, &spec, &docs);
        b.iter(|| record(&mut undo, black_box(&spec), &docs));
    });

    for &spread in &[1usize, 4, 16] {
        let docs = resources(spread);
        group.bench_with_input(BenchmarkId::new("at_limit", spread), &spread, |b, _| {
            let mut undo = setup_history(100, &docs);
            let spec = CommandSpec::new("Edit");
            b.iter(|| record(&mut undo, black_box(&spec), &docs));
        });
    }
    group.finish();
}

// ============================================================================
// Replay
// ============================================================================

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("undo_redo_round_trip");

    for &n in &[10usize, 100, 1_000] {
        let docs = resources(4);
        group.bench_with_input(BenchmarkId::new("global", n), &n, |b, &n| {
            let mut undo = setup_history(n, &docs);
            b.iter(|| {
                for _ in 0..n {
                    black_box(undo.undo(Target::Global).ok());
                }
                for _ in 0..n {
                    black_box(undo.redo(Target::Global).ok());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("local", n), &n, |b, &n| {
            let mut undo = setup_history(n, &docs);
            let target = Target::Resource(docs[0].clone());
            let depth = undo.undo_depth(target.clone());
            b.iter(|| {
                for _ in 0..depth {
                    black_box(undo.undo(target.clone()).ok());
                }
                for _ in 0..depth {
                    black_box(undo.redo(target.clone()).ok());
                }
            });
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let docs = resources(4);
    let undo = setup_history(1_000, &docs);
    c.bench_function("is_undo_available", |b| {
        b.iter(|| black_box(undo.is_undo_available(black_box(&docs[1]))));
    });
}

criterion_group!(benches, bench_record, bench_round_trip, bench_queries);
criterion_main!(benches);
