//! Performance benchmarks for credential derivation.
//!
//! Card markers sit on the reader's hot path, so they must stay cheap even
//! when the directory is scanned end to end. Password hashing is slow on
//! purpose; these numbers are for choosing `HashConfig` costs, not for
//! making them smaller.
//!
//! # Run Benchmarks
//!
//! ```sh
//! # Run all credential benchmarks
//! cargo bench --bench credential_bench
//!
//! # Run specific benchmark group
//! cargo bench --bench credential_bench -- card_marker
//!
//! # Compare against a saved baseline
//! cargo bench --bench credential_bench -- --save-baseline main
//! cargo bench --bench credential_bench -- --baseline main
//! ```
//!
//! # Expected Results
//!
//! - `card_marker`: well under a microsecond per UID
//! - `marker_scan/10000`: linear in directory size, dominated by comparisons
//! - `password_hash/default`: tens of milliseconds, depending on the host

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gatehouse_core::CardUid;
use gatehouse_storage::crypto::{card_marker, markers_match};
use gatehouse_storage::{CredentialHasher, HashConfig};
use std::hint::black_box;

/// Benchmark marker derivation for typical reader UID lengths.
fn bench_card_marker(c: &mut Criterion) {
    let mut group = c.benchmark_group("card_marker");
    group.throughput(Throughput::Elements(1));

    let test_cases = vec![
        ("mifare_4b", "04A1B2C3"),
        ("mifare_7b", "04A1B2C3D4E5F6"),
        ("decimal", "1234567890"),
        ("padded", "  04A1B2C3  "),
    ];

    for (name, raw) in test_cases {
        let uid = CardUid::new(raw).unwrap();
        group.bench_with_input(BenchmarkId::new("sha256", name), &uid, |b, uid| {
            b.iter(|| black_box(card_marker(black_box(uid))));
        });
    }

    group.finish();
}

/// Benchmark a full constant-time scan, as the verifier does per request.
fn bench_marker_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("marker_scan");

    for size in [100usize, 1_000, 10_000] {
        let markers: Vec<String> = (0..size)
            .map(|i| card_marker(&CardUid::new(&format!("{i:08X}")).unwrap()))
            .collect();
        let candidate = card_marker(&CardUid::new("FFFFFFFF").unwrap());

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &markers, |b, markers| {
            b.iter(|| {
                let hits = markers
                    .iter()
                    .filter(|m| markers_match(m, black_box(&candidate)))
                    .count();
                black_box(hits)
            });
        });
    }

    group.finish();
}

/// Benchmark Argon2id hashing and verification at two cost levels.
fn bench_password_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("password_hash");
    group.sample_size(10);

    let configs = vec![
        ("fast", HashConfig::default().memory_kib(1024).iterations(1)),
        ("default", HashConfig::default()),
    ];

    for (name, config) in configs {
        let hasher = CredentialHasher::new(config).unwrap();
        let stored = hasher.hash_password("s3cret!!").unwrap();

        group.bench_function(BenchmarkId::new("hash", name), |b| {
            b.iter(|| black_box(hasher.hash_password(black_box("s3cret!!")).unwrap()));
        });

        group.bench_function(BenchmarkId::new("verify", name), |b| {
            b.iter(|| black_box(hasher.verify_password(black_box("s3cret!!"), &stored)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_card_marker,
    bench_marker_scan,
    bench_password_hash
);
criterion_main!(benches);
