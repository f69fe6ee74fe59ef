//! Candidate discovery for the Quarry resolver
//!
//! The backtracking resolver asks two questions of every requirement: "is
//! there anything left to try?" and "what is the next thing to try?". This
//! crate answers both lazily. `FoundCandidates` merges the installed
//! candidate into a producer's stream, deduplicates by version and memoizes
//! the emptiness test, while `CandidateFinder` picks the producer and the
//! upgrade policy for each project.

pub mod finder;
pub mod found;
pub mod source;

// Re-export main types
pub use finder::CandidateFinder;
pub use found::{Candidates, FoundCandidates};
pub use source::{source_fn, CandidateIter, CandidateSource, FnSource, IndexSource};

use quarry_core::error::QuarryError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, QuarryError>;
