//! Candidate producers
//!
//! A `CandidateSource` hands out a fresh iteration of the candidates it knows
//! about every time it is asked. Implementations must yield candidates in
//! descending version order: `FoundCandidates` merges the installed candidate
//! into the stream assuming that order and does not check it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::ResolverResult;
use quarry_core::types::{canonicalize_name, Candidate, Version};
use quarry_index::{IndexProxy, ReleaseCache, ReleaseFile};

/// Boxed, lazily evaluated stream of candidates
pub type CandidateIter<'a> = Box<dyn Iterator<Item = ResolverResult<Candidate>> + 'a>;

/// Producer of "other" (not installed) candidates for one project
pub trait CandidateSource {
    /// Start a fresh iteration, newest version first
    ///
    /// Expensive work should happen as the returned iterator is pulled, not
    /// when it is created.
    fn produce(&self) -> CandidateIter<'_>;
}

impl<S: CandidateSource + ?Sized> CandidateSource for &S {
    fn produce(&self) -> CandidateIter<'_> {
        (**self).produce()
    }
}

impl<S: CandidateSource + ?Sized> CandidateSource for Box<S> {
    fn produce(&self) -> CandidateIter<'_> {
        (**self).produce()
    }
}

impl<S: CandidateSource + ?Sized> CandidateSource for Arc<S> {
    fn produce(&self) -> CandidateIter<'_> {
        (**self).produce()
    }
}

/// Source backed by a closure returning a new iterable on each call
#[derive(Clone)]
pub struct FnSource<F> {
    produce: F,
}

/// Wrap a closure as a `CandidateSource`
pub fn source_fn<F, I>(produce: F) -> FnSource<F>
where
    F: Fn() -> I,
    I: IntoIterator<Item = ResolverResult<Candidate>>,
{
    FnSource { produce }
}

impl<F, I> CandidateSource for FnSource<F>
where
    F: Fn() -> I,
    I: IntoIterator<Item = ResolverResult<Candidate>>,
    I::IntoIter: 'static,
{
    fn produce(&self) -> CandidateIter<'_> {
        Box::new((self.produce)().into_iter())
    }
}

/// Candidates for one project, discovered through the XML-RPC index
///
/// The release listing goes through the shared `ReleaseCache`, so repeated
/// passes only pay for `release_urls` lookups, and only for the versions the
/// consumer actually pulls.
#[derive(Debug, Clone)]
pub struct IndexSource {
    proxy: Arc<IndexProxy>,
    cache: Arc<ReleaseCache>,
    project: String,
}

impl IndexSource {
    pub fn new(proxy: Arc<IndexProxy>, cache: Arc<ReleaseCache>, project: &str) -> Self {
        Self {
            proxy,
            cache,
            project: canonicalize_name(project),
        }
    }

    /// Factory suitable for `CandidateFinder::new`
    pub fn factory(
        proxy: Arc<IndexProxy>,
        cache: Arc<ReleaseCache>,
    ) -> impl Fn(&str) -> IndexSource {
        move |project| IndexSource::new(Arc::clone(&proxy), Arc::clone(&cache), project)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Parsed releases, newest first, paired with the string the index used
    fn releases(&self) -> ResolverResult<Vec<(Version, String)>> {
        let listing = self.cache.get_or_try_insert_with(&self.project, || {
            debug!("fetching release listing for {}", self.project);
            self.proxy.package_releases(&self.project, true)
        })?;

        let mut releases: Vec<(Version, String)> = listing
            .into_iter()
            .filter_map(|raw| match raw.parse::<Version>() {
                Ok(version) => Some((version, raw)),
                Err(e) => {
                    warn!("skipping {} {}: {}", self.project, raw, e);
                    None
                },
            })
            .collect();
        releases.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(releases)
    }

    fn expand(&self, releases: ResolverResult<Vec<(Version, String)>>) -> CandidateIter<'_> {
        match releases {
            Ok(releases) => Box::new(
                releases
                    .into_iter()
                    .filter_map(move |(version, raw)| self.candidate(version, &raw).transpose()),
            ),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    /// Candidate for one release, or `None` when it has no files
    fn candidate(&self, version: Version, raw: &str) -> ResolverResult<Option<Candidate>> {
        let files = self.proxy.release_urls(&self.project, raw)?;
        let Some(file) = preferred_file(&files) else {
            debug!("skipping {} {}: no files", self.project, raw);
            return Ok(None);
        };

        let link = file.to_link(self.proxy.index_url())?;
        Ok(Some(Candidate::with_version(&self.project, version, link)))
    }
}

/// Non-yanked before yanked, wheels before anything else
fn preferred_file(files: &[ReleaseFile]) -> Option<&ReleaseFile> {
    files.iter().min_by_key(|file| (file.yanked, !file.is_wheel()))
}

impl CandidateSource for IndexSource {
    fn produce(&self) -> CandidateIter<'_> {
        Box::new(std::iter::once_with(move || self.releases()).flat_map(move |r| self.expand(r)))
    }
}
