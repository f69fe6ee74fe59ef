//! Parsing performance benchmarks
//!
//! Covers PEP 440 version parsing, quarry.toml parsing, and decoding XML-RPC
//! release listings of different sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use quarry_benchmarks::criterion_config;
use quarry_config::toml::parse_quarry_toml;
use quarry_core::types::Version;
use quarry_index::xmlrpc::decode_response;
use std::str::FromStr;

fn create_simple_versions(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("{}.{}.{}", i % 7, i % 13, i % 31))
        .collect()
}

fn create_complex_versions(count: usize) -> Vec<String> {
    let suffixes = ["a1", "b2", "rc1", ".post3", ".dev4", "+local.7", "rc1.post2.dev3"];
    (0..count)
        .map(|i| format!("{}!{}.{}{}", i % 2, i % 11, i % 5, suffixes[i % suffixes.len()]))
        .collect()
}

fn create_listing_response(count: usize) -> String {
    let values: String = (0..count)
        .map(|i| format!("<value><string>{}.{}</string></value>\n", i / 10, i % 10))
        .collect();
    format!(
        "<?xml version='1.0'?>\n<methodResponse>\n<params>\n<param>\n\
         <value><array><data>\n{}</data></array></value>\n\
         </param>\n</params>\n</methodResponse>\n",
        values
    )
}

/// Benchmark PEP 440 version parsing
fn bench_version_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("version_parsing");

    group.bench_function("simple", |b| {
        let versions = create_simple_versions(1000);
        let mut index = 0;

        b.iter(|| {
            let version = &versions[index % versions.len()];
            index += 1;
            black_box(Version::from_str(version))
        });
    });

    group.bench_function("complex", |b| {
        let versions = create_complex_versions(1000);
        let mut index = 0;

        b.iter(|| {
            let version = &versions[index % versions.len()];
            index += 1;
            black_box(Version::from_str(version))
        });
    });

    group.bench_function("sort_1000", |b| {
        let versions: Vec<Version> = create_complex_versions(1000)
            .iter()
            .filter_map(|v| v.parse().ok())
            .collect();

        b.iter(|| {
            let mut sorted = versions.clone();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            black_box(sorted)
        });
    });

    group.finish();
}

/// Benchmark quarry.toml parsing and validation
fn bench_quarry_toml_parsing(c: &mut Criterion) {
    let content = r#"
[index]
url = "https://index.example/pypi"
timeout-secs = 30
retries = 5
user-agent = "bench/1.0"
token = "secret"

[resolver]
upgrade-strategy = "only-if-needed"
"#;

    c.bench_function("quarry_toml_parsing", |b| {
        b.iter(|| black_box(parse_quarry_toml(black_box(content)).unwrap()));
    });
}

/// Benchmark XML-RPC decoding of release listings
fn bench_listing_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("xmlrpc_listing_decode");
    group.measurement_time(std::time::Duration::from_secs(5));

    for count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        let response = create_listing_response(*count);

        group.bench_with_input(BenchmarkId::new("versions", count), &response, |b, response| {
            b.iter(|| black_box(decode_response(response.as_bytes()).unwrap()));
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_version_parsing, bench_quarry_toml_parsing, bench_listing_decode
}
criterion_main!(benches);
