//! # quarry-core
//!
//! Core types and utilities shared across all Quarry crates.
//!
//! This crate provides:
//! - PEP 440 `Version` parsing, normalization and ordering
//! - `Link` and `Candidate`, the identity model handed to the resolver
//! - `QuarryError` enum for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, Link, Candidate, etc.)
//! - `error`: Error types and result aliases

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{QuarryError, QuarryResult};
pub use types::{canonicalize_name, Candidate, Link, UpgradeStrategy, Version, VersionError};
