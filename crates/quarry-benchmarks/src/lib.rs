//! Quarry benchmarking suite
//!
//! Benchmarks for version and configuration parsing, the XML-RPC codec, and
//! the cost of lazy candidate iteration.

pub mod common;

pub use common::*;
