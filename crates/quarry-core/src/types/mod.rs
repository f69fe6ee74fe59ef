//! Core data types for Quarry candidate discovery.
//!
//! This module provides the fundamental types used throughout the Quarry crates:
//! - PEP 440 versions
//! - Source links and the candidates built from them
//! - Project name canonicalization and upgrade policy

pub mod candidate;
pub mod link;
pub mod name;
pub mod policy;
pub mod version;

// Re-export all public types
pub use candidate::Candidate;
pub use link::{redact_url, Link};
pub use name::canonicalize_name;
pub use policy::UpgradeStrategy;
pub use version::{LocalSegment, PreKind, PreRelease, Version, VersionError};
