//! Installation candidates.
//!
//! A candidate is one installable (name, version, link) combination. It is a
//! pure value: equality and ordering derive from that triple, in that order.

use std::fmt;

use super::{canonicalize_name, Link, Version, VersionError};

/// A specific installable version of a project from a specific location
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Candidate {
    name: String,
    version: Version,
    link: Link,
}

impl Candidate {
    /// Build a candidate, parsing `version` with the PEP 440 grammar
    pub fn new(name: &str, version: &str, link: Link) -> Result<Self, VersionError> {
        let version = version.parse()?;
        Ok(Self::with_version(name, version, link))
    }

    /// Build a candidate from an already parsed version
    pub fn with_version(name: &str, version: Version, link: Link) -> Self {
        Self {
            name: canonicalize_name(name),
            version,
            link,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn link(&self) -> &Link {
        &self.link
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' candidate (version {} at {})",
            self.name, self.version, self.link
        )
    }
}
