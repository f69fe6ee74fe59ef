//! Lazy, deduplicated candidate sequences
//!
//! `FoundCandidates` is what the resolver receives for a requirement. It
//! never materializes the producer's output: iteration pulls one candidate at
//! a time, and the emptiness test stops at the first one.
//!
//! Merge order for one pass:
//!
//! - no installed candidate: the producer's stream as is
//! - installed and preferred: installed first, then the producer's stream
//! - installed, not preferred: installed is slotted in front of the first
//!   other candidate whose version is not newer, or emitted last
//!
//! In every case a version is emitted at most once; the first occurrence
//! wins, so an installed candidate shadows an index candidate of the same
//! version.

use std::collections::HashSet;
use std::fmt;

use once_cell::unsync::OnceCell;
use tracing::{trace, warn};

use crate::source::{CandidateIter, CandidateSource};
use crate::ResolverResult;
use quarry_core::error::QuarryError;
use quarry_core::types::{Candidate, Version};

/// Lazy view over the candidates for one requirement
///
/// Immutable after construction. The emptiness result is memoized, which is
/// only sound while the producer keeps answering the same way; the sequence
/// cannot detect a producer that changes its mind.
pub struct FoundCandidates<S> {
    source: S,
    installed: Option<Candidate>,
    prefers_installed: bool,
    nonempty: OnceCell<bool>,
}

impl<S: CandidateSource> FoundCandidates<S> {
    pub fn new(source: S, installed: Option<Candidate>, prefers_installed: bool) -> Self {
        Self {
            source,
            installed,
            prefers_installed,
            nonempty: OnceCell::new(),
        }
    }

    pub fn installed(&self) -> Option<&Candidate> {
        self.installed.as_ref()
    }

    pub fn prefers_installed(&self) -> bool {
        self.prefers_installed
    }

    /// Start a new pass; the producer is invoked on the first pull that needs it
    pub fn iter(&self) -> Candidates<'_> {
        let phase = match (&self.installed, self.prefers_installed) {
            (None, _) => Phase::Remainder,
            (Some(_), true) => Phase::Leading,
            (Some(_), false) => Phase::Scanning,
        };

        Candidates {
            source: &self.source,
            others: None,
            installed: self.installed.as_ref(),
            pending: None,
            phase,
            seen: HashSet::new(),
            last_other: None,
        }
    }

    /// Whether a full pass would yield at least one candidate
    ///
    /// Costs at most one candidate's worth of producer work, and nothing at
    /// all when the installed candidate is preferred. A successful answer is
    /// remembered; an error is returned without being remembered.
    pub fn is_nonempty(&self) -> ResolverResult<bool> {
        if self.prefers_installed && self.installed.is_some() {
            return Ok(true);
        }

        self.nonempty
            .get_or_try_init(|| match self.iter().next() {
                Some(Ok(_)) => Ok(true),
                Some(Err(e)) => Err(e),
                None => Ok(false),
            })
            .copied()
    }

    /// Indexed access is not supported
    pub fn get(&self, _index: usize) -> ResolverResult<Candidate> {
        Err(QuarryError::UnsupportedOperation {
            operation: "indexed access",
        })
    }

    /// Length queries are not supported
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> ResolverResult<usize> {
        Err(QuarryError::UnsupportedOperation { operation: "len" })
    }
}

impl<S> fmt::Debug for FoundCandidates<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FoundCandidates")
            .field("installed", &self.installed)
            .field("prefers_installed", &self.prefers_installed)
            .field("nonempty", &self.nonempty.get())
            .finish_non_exhaustive()
    }
}

impl<'a, S: CandidateSource> IntoIterator for &'a FoundCandidates<S> {
    type Item = ResolverResult<Candidate>;
    type IntoIter = Candidates<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Installed candidate goes out before anything else
    Leading,
    /// Walking the others, looking for the installed candidate's slot
    Scanning,
    /// Installed candidate placed (or absent); pass the rest through
    Remainder,
    Done,
}

/// One pass over a `FoundCandidates`
///
/// Producer errors are yielded in place and do not end the pass.
pub struct Candidates<'a> {
    source: &'a dyn CandidateSource,
    others: Option<CandidateIter<'a>>,
    /// Installed candidate not yet emitted
    installed: Option<&'a Candidate>,
    /// Other candidate held back while the installed one went out
    pending: Option<Candidate>,
    phase: Phase,
    seen: HashSet<Version>,
    last_other: Option<Version>,
}

impl<'a> Candidates<'a> {
    fn pull_other(&mut self) -> Option<ResolverResult<Candidate>> {
        let source = self.source;
        let others = self.others.get_or_insert_with(|| source.produce());
        let item = others.next();

        if cfg!(debug_assertions) {
            if let Some(Ok(ref candidate)) = item {
                if let Some(ref last) = self.last_other {
                    if candidate.version() > last {
                        warn!(
                            "producer yielded {} after {}; candidates are not in descending order",
                            candidate.version(),
                            last
                        );
                    }
                }
                self.last_other = Some(candidate.version().clone());
            }
        }
        item
    }

    /// Next candidate in merge order, before deduplication
    fn next_merged(&mut self) -> Option<ResolverResult<Candidate>> {
        match self.phase {
            Phase::Done => None,
            Phase::Leading => {
                self.phase = Phase::Remainder;
                match self.installed.take() {
                    Some(installed) => Some(Ok(installed.clone())),
                    None => self.next_merged(),
                }
            },
            Phase::Scanning => match self.pull_other() {
                Some(Ok(other)) => match self.installed {
                    Some(installed) if installed.version() >= other.version() => {
                        self.installed = None;
                        self.pending = Some(other);
                        self.phase = Phase::Remainder;
                        Some(Ok(installed.clone()))
                    },
                    _ => Some(Ok(other)),
                },
                Some(Err(e)) => Some(Err(e)),
                None => {
                    self.phase = Phase::Done;
                    self.installed.take().map(|installed| Ok(installed.clone()))
                },
            },
            Phase::Remainder => {
                if let Some(pending) = self.pending.take() {
                    return Some(Ok(pending));
                }
                let item = self.pull_other();
                if item.is_none() {
                    self.phase = Phase::Done;
                }
                item
            },
        }
    }
}

impl<'a> Iterator for Candidates<'a> {
    type Item = ResolverResult<Candidate>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.next_merged()? {
                Ok(candidate) => {
                    if self.seen.insert(candidate.version().clone()) {
                        return Some(Ok(candidate));
                    }
                    trace!("dropping duplicate {}", candidate);
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl fmt::Debug for Candidates<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidates")
            .field("phase", &self.phase)
            .field("installed", &self.installed)
            .field("pending", &self.pending)
            .field("seen", &self.seen.len())
            .finish_non_exhaustive()
    }
}
