use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use expiring_cuckoo_rs::{
    CuckooFilter, CuckooFilterConfigBuilder, ExpiringCuckooFilter,
    ExpiringFilterConfigBuilder, hash_fnv64,
};
use rand::{Rng, distr::Alphanumeric};
use std::hint::black_box;

const MINUTE_NS: u64 = 60_000_000_000;

// Helper function to generate random string data
fn generate_random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn generate_test_data(count: usize) -> Vec<String> {
    (0..count).map(|_| generate_random_string(32)).collect()
}

fn create_expiring(capacity: usize) -> ExpiringCuckooFilter {
    let config = ExpiringFilterConfigBuilder::default()
        .capacity(capacity)
        .interval_minutes(1)
        .seed(Some(42))
        .build()
        .expect("Failed to build config");
    ExpiringCuckooFilter::with_config(config).expect("Failed to create filter")
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_operations");

    for capacity in [1_000, 10_000, 100_000] {
        // Stay below the capacity sweep threshold
        let test_data = generate_test_data(capacity * 3 / 4);

        group.bench_with_input(
            BenchmarkId::new("plain", capacity),
            &test_data,
            |b, data| {
                b.iter_batched(
                    || CuckooFilter::new(capacity).expect("Failed to create filter"),
                    |mut filter| {
                        for item in data {
                            let _ = black_box(filter.add(item.as_str()));
                        }
                    },
                    BatchSize::LargeInput,
                );
            },
        );

        group.bench_with_input(
            BenchmarkId::new("plain_fnv", capacity),
            &test_data,
            |b, data| {
                b.iter_batched(
                    || {
                        let config = CuckooFilterConfigBuilder::default()
                            .capacity(capacity)
                            .hash_function(hash_fnv64)
                            .build()
                            .expect("Failed to build config");
                        CuckooFilter::with_config(config)
                            .expect("Failed to create filter")
                    },
                    |mut filter| {
                        for item in data {
                            let _ = black_box(filter.add(item.as_str()));
                        }
                    },
                    BatchSize::LargeInput,
                );
            },
        );

        group.bench_with_input(
            BenchmarkId::new("expiring", capacity),
            &test_data,
            |b, data| {
                b.iter_batched(
                    || create_expiring(capacity),
                    |mut filter| {
                        for (i, item) in data.iter().enumerate() {
                            let ts = (i as u64 % 600) * MINUTE_NS / 10;
                            let _ = black_box(filter.add(item.as_str(), ts));
                        }
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_operations");

    for capacity in [1_000, 10_000, 100_000] {
        let test_data = generate_test_data(capacity / 2);
        let mut plain = CuckooFilter::new(capacity).expect("Failed to create filter");
        let mut expiring = create_expiring(capacity);
        for item in &test_data {
            let _ = plain.add(item.as_str());
            let _ = expiring.add(item.as_str(), 0);
        }
        let missing = generate_test_data(100);

        group.bench_with_input(
            BenchmarkId::new("plain_hit", capacity),
            &test_data,
            |b, data| {
                b.iter(|| {
                    for item in data.iter().take(100) {
                        black_box(plain.query(item.as_str()));
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("plain_miss", capacity),
            &missing,
            |b, data| {
                b.iter(|| {
                    for item in data {
                        black_box(plain.query(item.as_str()));
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("expiring_hit", capacity),
            &test_data,
            |b, data| {
                b.iter(|| {
                    for item in data.iter().take(100) {
                        black_box(expiring.query(item.as_str()));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_interval_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("interval_advance");

    for capacity in [10_000, 100_000] {
        let test_data = generate_test_data(capacity / 2);
        group.bench_with_input(
            BenchmarkId::new("prune_one_interval", capacity),
            &test_data,
            |b, data| {
                b.iter_batched(
                    || {
                        let mut filter = create_expiring(capacity);
                        for (i, item) in data.iter().enumerate() {
                            let ts = (i as u64 % 256) * MINUTE_NS;
                            let _ = filter.add(item.as_str(), ts);
                        }
                        filter
                    },
                    |mut filter| {
                        let _ = black_box(filter.add("tick", 256 * MINUTE_NS));
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_operations");

    let mut filter = create_expiring(100_000);
    for item in generate_test_data(50_000) {
        let _ = filter.add(item.as_str(), 0);
    }
    let encoded = filter.snapshot().encode().expect("Failed to encode");

    group.bench_function("encode", |b| {
        b.iter(|| black_box(filter.snapshot().encode()));
    });

    group.bench_function("restore", |b| {
        b.iter_batched(
            || create_expiring(100_000),
            |mut target| {
                let snapshot = expiring_cuckoo_rs::FilterSnapshot::decode(&encoded)
                    .expect("Failed to decode");
                black_box(target.restore_snapshot(&snapshot))
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_query,
    bench_interval_advance,
    bench_snapshot
);
criterion_main!(benches);
