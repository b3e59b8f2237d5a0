//! Benchmarks for pool fan-out over one stage.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stationqc::dataset::DatasetDir;
use stationqc::pool::{Concurrency, SequentialPool, StageBatch, TokioWorkerPool, WorkerPool};
use stationqc::testing::{ScriptedCheck, StationFixture};
use std::sync::Arc;

const STATIONS: usize = 200;

fn pool_benchmark(c: &mut Criterion) {
    let tmp = tempfile::tempdir().expect("scratch dir");
    let input = DatasetDir::csv(tmp.path().join("in"));
    let output = DatasetDir::csv(tmp.path().join("out"));
    let ids = StationFixture::new(&input)
        .numbered("S", STATIONS)
        .write()
        .expect("fixture");
    output.ensure_exists().expect("output dir");

    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let check = Arc::new(ScriptedCheck::passing("bench"));
    let batch = StageBatch::new("bench", ids, input, output);

    let mut group = c.benchmark_group("pool_fan_out");
    group.sample_size(20);

    group.bench_function("sequential", |b| {
        let pool = SequentialPool::new();
        b.iter(|| {
            let outcomes = runtime
                .block_on(pool.run(check.clone(), batch.clone()))
                .expect("run");
            black_box(outcomes)
        });
    });

    for workers in [1, 4, 16] {
        group.bench_with_input(BenchmarkId::new("tokio", workers), &workers, |b, &workers| {
            let pool = TokioWorkerPool::new();
            b.iter(|| {
                let batch = batch.clone().with_concurrency(Concurrency::fixed(workers));
                let outcomes = runtime.block_on(pool.run(check.clone(), batch)).expect("run");
                black_box(outcomes)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, pool_benchmark);
criterion_main!(benches);
