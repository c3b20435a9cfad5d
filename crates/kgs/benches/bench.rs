use core::hint::black_box;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kgs::{FillConfig, KeyGenerator, MemoryRepository, PoolFiller, Repository, ThreadRandom};
use std::sync::Arc;
use tokio::runtime::Builder;

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for length in [4, 8, 16] {
        let generator = KeyGenerator::new(length, ThreadRandom).unwrap();
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, _| {
            b.iter(|| black_box(generator.generate()));
        });
    }
    group.finish();
}

fn bench_fill(c: &mut Criterion) {
    let rt = Builder::new_multi_thread().enable_all().build().unwrap();
    let mut group = c.benchmark_group("fill");
    group.sample_size(20);

    for (pool_size, max_concurrency) in [(1_000, 16), (10_000, 100), (10_000, 1_000)] {
        group.throughput(Throughput::Elements(pool_size as u64));
        group.bench_function(
            BenchmarkId::new(format!("ceiling_{max_concurrency}"), pool_size),
            |b| {
                b.to_async(&rt).iter(|| async move {
                    let repo = Arc::new(MemoryRepository::new());
                    let config = FillConfig::new(pool_size, 6).with_max_concurrency(max_concurrency);
                    let filler = PoolFiller::new(Arc::clone(&repo), config).unwrap();
                    black_box(filler.fill().await.unwrap());
                });
            },
        );
    }
    group.finish();
}

fn bench_allocate(c: &mut Criterion) {
    let rt = Builder::new_multi_thread().enable_all().build().unwrap();
    let mut group = c.benchmark_group("allocate");

    for batch in [1_i64, 64, 1_024] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_function(BenchmarkId::from_parameter(batch), |b| {
            b.to_async(&rt).iter_custom(|iters| async move {
                let repo = Arc::new(MemoryRepository::new());
                let total = iters as usize * batch as usize;
                let filler =
                    PoolFiller::new(Arc::clone(&repo), FillConfig::new(total, 8)).unwrap();
                filler.fill().await.unwrap();

                let start = std::time::Instant::now();
                for _ in 0..iters {
                    black_box(repo.get_keys(batch).await.unwrap());
                }
                start.elapsed()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generate, bench_fill, bench_allocate);
criterion_main!(benches);
