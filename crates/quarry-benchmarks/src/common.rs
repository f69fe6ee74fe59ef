//! Common utilities for benchmarks

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};

use quarry_core::types::{Candidate, Link};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// `count` candidates for `demo`, newest first
pub fn descending_candidates(count: usize) -> Vec<Candidate> {
    (0..count)
        .rev()
        .filter_map(|i| {
            let version = format!("{}.{}.0", i / 10, i % 10);
            let link = Link::parse(&format!("https://files.example/demo-{}.tar.gz", version)).ok()?;
            Candidate::new("demo", &version, link).ok()
        })
        .collect()
}
