//! Benchmark full and chunked reads of a 200K-row users file.
//!
//! Compares single-reader decoding against per-column parallel decoding, and
//! measures how much an early `Stop` saves over streaming the whole file.

use std::convert::Infallible;
use std::hint::black_box;
use std::path::Path;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pqfeed_parquet::{ChunkControl, ParquetRegistry, ReadOptions, ReaderConfig};
use pqfeed_test_utils::{users_batch, write_batches, writer_props};
use tempfile::TempDir;

const TOTAL_ROWS: usize = 200_000;
const ROW_GROUP_SIZE: usize = 20_000;

fn write_fixture(dir: &Path) -> std::path::PathBuf {
    let batch = users_batch(1, TOTAL_ROWS).unwrap();
    write_batches(
        &dir.join("bench_users.parquet"),
        &[batch],
        writer_props(ROW_GROUP_SIZE),
    )
    .unwrap()
}

fn full_read_benchmark(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(dir.path());

    let mut group = c.benchmark_group("full_read");
    group.throughput(Throughput::Elements(TOTAL_ROWS as u64));
    group.sample_size(10);

    for (name, parallel) in [("sequential", false), ("parallel_columns", true)] {
        let registry = ParquetRegistry::new(ReaderConfig::default().with_parallel_columns(parallel));
        group.bench_with_input(BenchmarkId::from_parameter(name), &path, |b, path| {
            b.iter(|| {
                let records = registry.read(path, &ReadOptions::default()).unwrap();
                black_box(records.len())
            });
        });
    }

    let registry = ParquetRegistry::default();
    let projected = ReadOptions::new().with_columns(["id", "score"]);
    group.bench_with_input(BenchmarkId::from_parameter("projected_2_of_6"), &path, |b, path| {
        b.iter(|| black_box(registry.read(path, &projected).unwrap().len()));
    });

    group.finish();
}

fn chunked_read_benchmark(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(dir.path());
    let registry = ParquetRegistry::default();

    let mut group = c.benchmark_group("chunked_read");
    group.sample_size(10);

    for chunk_size in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("all_rows", chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let summary = registry
                        .read_chunked(&path, chunk_size, |chunk| {
                            black_box(chunk.len());
                            Ok::<_, Infallible>(ChunkControl::Continue)
                        })
                        .unwrap();
                    black_box(summary.rows)
                });
            },
        );
    }

    group.bench_function("stop_after_first_chunk", |b| {
        b.iter(|| {
            let summary = registry
                .read_chunked(&path, 1_000, |_| Ok::<_, Infallible>(ChunkControl::Stop))
                .unwrap();
            black_box(summary.row_groups_decoded)
        });
    });

    group.finish();
}

criterion_group!(benches, full_read_benchmark, chunked_read_benchmark);
criterion_main!(benches);
