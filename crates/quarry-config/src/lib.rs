//! Configuration parsing for Quarry
//!
//! This crate handles parsing and validation of quarry.toml, layering
//! environment overrides on top of it, and turning the result into the
//! settings the index session and candidate finder are built from.

pub mod merge;
pub mod toml;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource};
pub use crate::toml::{IndexSection, QuarryToml, ResolverSection};

use quarry_core::error::QuarryError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, QuarryError>;
