//! Per-project candidate lookup
//!
//! `CandidateFinder` ties a source factory to what is already installed and
//! to the upgrade strategy, and hands the resolver one `FoundCandidates` per
//! project it asks about.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::found::FoundCandidates;
use crate::source::CandidateSource;
use quarry_core::types::{canonicalize_name, Candidate, UpgradeStrategy};

/// Builds lazy candidate sequences for the resolver
pub struct CandidateFinder<F> {
    make_source: F,
    /// Installed candidates by canonical name
    installed: HashMap<String, Candidate>,
    /// Canonical names the user asked for explicitly
    user_requested: HashSet<String>,
    upgrade_strategy: UpgradeStrategy,
}

impl<F, S> CandidateFinder<F>
where
    F: Fn(&str) -> S,
    S: CandidateSource,
{
    pub fn new(make_source: F, upgrade_strategy: UpgradeStrategy) -> Self {
        Self {
            make_source,
            installed: HashMap::new(),
            user_requested: HashSet::new(),
            upgrade_strategy,
        }
    }

    /// Record installed candidates; a later entry for a project replaces an earlier one
    pub fn with_installed(mut self, installed: impl IntoIterator<Item = Candidate>) -> Self {
        for candidate in installed {
            self.installed.insert(candidate.name().to_string(), candidate);
        }
        self
    }

    pub fn with_user_requested<N: AsRef<str>>(mut self, names: impl IntoIterator<Item = N>) -> Self {
        self.user_requested
            .extend(names.into_iter().map(|name| canonicalize_name(name.as_ref())));
        self
    }

    pub fn upgrade_strategy(&self) -> UpgradeStrategy {
        self.upgrade_strategy
    }

    pub fn installed(&self, project: &str) -> Option<&Candidate> {
        self.installed.get(&canonicalize_name(project))
    }

    /// Lazy candidate sequence for `project`
    ///
    /// Nothing is fetched here; the source only runs when the sequence is
    /// iterated or tested for emptiness.
    pub fn find_matches(&self, project: &str) -> FoundCandidates<S> {
        let project = canonicalize_name(project);
        let installed = self.installed.get(&project).cloned();
        let user_requested = self.user_requested.contains(&project);
        let prefers_installed = self.upgrade_strategy.prefers_installed(user_requested);

        debug!(
            "finding candidates for {} (installed: {}, prefers installed: {})",
            project,
            installed
                .as_ref()
                .map_or_else(|| "none".to_string(), |c| c.version().to_string()),
            prefers_installed
        );

        FoundCandidates::new((self.make_source)(&project), installed, prefers_installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::Arc;

    use crate::source::{source_fn, CandidateIter, IndexSource};
    use quarry_core::types::Link;
    use quarry_index::{IndexProxy, IndexSession, ReleaseCache};
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn candidate(name: &str, version: &str, origin: &str) -> Candidate {
        let link = Link::parse(&format!("{}/{}-{}", origin, name, version)).unwrap();
        Candidate::new(name, version, link).unwrap()
    }

    fn static_source(name: &str) -> impl CandidateSource {
        let name = name.to_string();
        source_fn(move || {
            vec![
                Ok(candidate(&name, "2.0", "https://files.example")),
                Ok(candidate(&name, "1.0", "https://files.example")),
            ]
        })
    }

    fn finder(strategy: UpgradeStrategy) -> CandidateFinder<impl Fn(&str) -> Box<dyn CandidateSource>> {
        CandidateFinder::new(
            |name: &str| -> Box<dyn CandidateSource> { Box::new(static_source(name)) },
            strategy,
        )
        .with_installed([candidate("Demo_Pkg", "1.0", "file:///site-packages")])
        .with_user_requested(["demo.pkg"])
    }

    fn first_version<S: CandidateSource>(found: &FoundCandidates<S>) -> String {
        found.iter().next().unwrap().unwrap().version().to_string()
    }

    #[test]
    fn test_strategy_decides_preference() {
        let eager = finder(UpgradeStrategy::Eager).find_matches("demo-pkg");
        assert!(!eager.prefers_installed());
        assert_eq!(first_version(&eager), "2.0");

        // The project was requested by the user, so it may be upgraded.
        let only_if_needed = finder(UpgradeStrategy::OnlyIfNeeded).find_matches("demo-pkg");
        assert!(!only_if_needed.prefers_installed());

        let to_satisfy_only = finder(UpgradeStrategy::ToSatisfyOnly).find_matches("demo-pkg");
        assert!(to_satisfy_only.prefers_installed());
        assert_eq!(first_version(&to_satisfy_only), "1.0");
    }

    #[test]
    fn test_dependencies_keep_installed_when_only_if_needed() {
        let finder = CandidateFinder::new(static_source, UpgradeStrategy::OnlyIfNeeded)
            .with_installed([candidate("dep", "1.0", "file:///site-packages")]);

        let found = finder.find_matches("DEP");
        assert!(found.prefers_installed());
        assert_eq!(found.installed().map(|c| c.name()), Some("dep"));
        assert_eq!(first_version(&found), "1.0");
    }

    #[test]
    fn test_unknown_project_has_no_installed_candidate() {
        let found = finder(UpgradeStrategy::ToSatisfyOnly).find_matches("other");
        assert!(found.installed().is_none());
        assert_eq!(found.iter().count(), 2);
    }

    #[test]
    fn test_find_matches_does_not_run_the_source() {
        struct Recording<'a>(&'a RefCell<Vec<String>>, String);

        impl CandidateSource for Recording<'_> {
            fn produce(&self) -> CandidateIter<'_> {
                self.0.borrow_mut().push(self.1.clone());
                Box::new(std::iter::empty())
            }
        }

        let calls = RefCell::new(Vec::new());
        let finder = CandidateFinder::new(
            |name: &str| Recording(&calls, name.to_string()),
            UpgradeStrategy::Eager,
        );

        let found = finder.find_matches("Some_Project");
        assert!(calls.borrow().is_empty());

        assert!(!found.is_nonempty().unwrap());
        assert_eq!(*calls.borrow(), vec!["some-project".to_string()]);
    }

    #[tokio::test]
    async fn test_finder_over_index_source() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("<methodName>package_releases</methodName>"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<methodResponse><params><param><value><array><data>\
                 <value><string>2.0</string></value>\
                 </data></array></value></param></params></methodResponse>",
            ))
            .expect(0)
            .mount(&mock_server)
            .await;

        let index_url = mock_server.uri();
        tokio::task::spawn_blocking(move || {
            let session = Arc::new(IndexSession::new().unwrap());
            let proxy = Arc::new(IndexProxy::new(&index_url, session).unwrap());
            let finder = CandidateFinder::new(
                IndexSource::factory(proxy, Arc::new(ReleaseCache::new())),
                UpgradeStrategy::ToSatisfyOnly,
            )
            .with_installed([candidate("demo", "1.0", "file:///site-packages")]);

            let found = finder.find_matches("demo");
            assert!(found.is_nonempty().unwrap());
            assert_eq!(first_version(&found), "1.0");
        })
        .await
        .unwrap();
    }
}
