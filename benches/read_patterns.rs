//! Read pattern benchmarks
//!
//! Runs against the in-memory mock store, so the numbers measure buffering
//! overhead and round-trip counts, not network latency.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gcsvfs::{OpenFlags, ReadOptions, RemoteObjectHandle};
use gcsvfs_testing::fixtures::{random_content, shuffled_read_plan, KIB, MIB};
use gcsvfs_testing::MockStore;

const URL: &str = "gs://bench/object.bin";
const OBJECT_SIZE: usize = 16 * MIB;

fn setup_store() -> MockStore {
    let store = MockStore::new();
    store.insert(URL, random_content(OBJECT_SIZE, 42));
    store
}

fn open(store: &MockStore, flags: OpenFlags, buffer_size: usize) -> RemoteObjectHandle {
    let options = ReadOptions {
        buffer_size,
        ..Default::default()
    };
    RemoteObjectHandle::open_with_client(URL, flags, options, store.client(URL)).unwrap()
}

/// Benchmark small sequential reads with different buffer sizes
fn bench_sequential_reads(c: &mut Criterion) {
    let store = setup_store();
    let mut group = c.benchmark_group("sequential_reads");
    group.throughput(Throughput::Bytes(OBJECT_SIZE as u64));
    group.sample_size(10);

    for buffer_size in [64 * KIB, 256 * KIB, MIB, 4 * MIB] {
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size / KIB),
            &buffer_size,
            |b, &buffer_size| {
                b.iter(|| {
                    let mut handle = open(&store, OpenFlags::READ, buffer_size);
                    let mut buf = vec![0u8; 8 * KIB];
                    while handle.read_sequential(&mut buf).unwrap() > 0 {
                        black_box(&buf);
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark reads issued in random order
fn bench_random_reads(c: &mut Criterion) {
    let store = setup_store();
    let plan = shuffled_read_plan(OBJECT_SIZE as u64, 32 * KIB as u64, 7);
    let mut group = c.benchmark_group("random_reads");
    group.throughput(Throughput::Bytes(OBJECT_SIZE as u64));
    group.sample_size(10);

    for (name, flags) in [
        ("buffered", OpenFlags::READ),
        ("direct_io", OpenFlags::READ | OpenFlags::DIRECT_IO),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut handle = open(&store, flags, MIB);
                let mut buf = vec![0u8; 32 * KIB];
                for &(offset, len) in &plan {
                    handle.read_at(&mut buf[..len as usize], offset).unwrap();
                }
                black_box(&buf);
            });
        });
    }

    group.finish();
}

/// Benchmark reads larger than the buffer, which bypass it
fn bench_large_reads(c: &mut Criterion) {
    let store = setup_store();
    let mut group = c.benchmark_group("large_reads");
    group.throughput(Throughput::Bytes(OBJECT_SIZE as u64));
    group.sample_size(10);

    for read_size in [2 * MIB, 8 * MIB] {
        group.bench_with_input(
            BenchmarkId::from_parameter(read_size / MIB),
            &read_size,
            |b, &read_size| {
                b.iter(|| {
                    let mut handle = open(&store, OpenFlags::READ, MIB);
                    let mut buf = vec![0u8; read_size];
                    while handle.read_sequential(&mut buf).unwrap() > 0 {
                        black_box(&buf);
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_sequential_reads,
    bench_random_reads,
    bench_large_reads
);
criterion_main!(benches);
