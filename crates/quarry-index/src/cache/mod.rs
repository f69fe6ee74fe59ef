//! Release listing cache with TTL support
//!
//! Keys are canonical project names, so `Foo_Bar` and `foo-bar` share an
//! entry.

use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use quarry_core::types::canonicalize_name;

/// Default lifetime of a cached listing
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cached release listing for one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Version strings as the index returned them
    pub versions: Vec<String>,
    /// When the entry was stored
    pub stored_at: SystemTime,
    /// Time-to-live duration
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(versions: Vec<String>) -> Self {
        Self::with_ttl(versions, DEFAULT_TTL)
    }

    pub fn with_ttl(versions: Vec<String>, ttl: Duration) -> Self {
        Self {
            versions,
            stored_at: SystemTime::now(),
            ttl,
        }
    }

    /// Check if cache entry is still fresh
    pub fn is_fresh(&self) -> bool {
        match self.stored_at.elapsed() {
            Ok(elapsed) => elapsed < self.ttl,
            Err(_) => false, // Clock went backwards, consider stale
        }
    }

    pub fn age(&self) -> Option<Duration> {
        self.stored_at.elapsed().ok()
    }
}

/// In-memory release listing cache
#[derive(Debug)]
pub struct ReleaseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ReleaseCache {
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }

    /// Cache whose plain `insert` uses `ttl`
    pub fn with_default_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Cached listing for `project` if fresh; stale entries are evicted
    pub fn get(&self, project: &str) -> Option<Vec<String>> {
        let key = canonicalize_name(project);
        let fresh = {
            let entry = self.entries.get(&key)?;
            entry.is_fresh().then(|| entry.versions.clone())
        };
        if fresh.is_none() {
            trace!("evicting stale release listing for {}", key);
            self.entries.remove(&key);
        }
        fresh
    }

    pub fn insert(&self, project: &str, versions: Vec<String>) {
        self.insert_with_ttl(project, versions, self.ttl);
    }

    pub fn insert_with_ttl(&self, project: &str, versions: Vec<String>, ttl: Duration) {
        self.entries
            .insert(canonicalize_name(project), CacheEntry::with_ttl(versions, ttl));
    }

    /// Cached listing, or the result of `fetch` stored for next time
    ///
    /// Failed fetches are not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        project: &str,
        fetch: impl FnOnce() -> Result<Vec<String>, E>,
    ) -> Result<Vec<String>, E> {
        if let Some(versions) = self.get(project) {
            return Ok(versions);
        }
        let versions = fetch()?;
        self.insert(project, versions.clone());
        Ok(versions)
    }

    pub fn contains_fresh(&self, project: &str) -> bool {
        self.entries
            .get(&canonicalize_name(project))
            .map(|entry| entry.is_fresh())
            .unwrap_or(false)
    }

    pub fn stats(&self) -> CacheStats {
        let mut fresh_entries = 0;
        let mut stale_entries = 0;

        for entry in self.entries.iter() {
            if entry.is_fresh() {
                fresh_entries += 1;
            } else {
                stale_entries += 1;
            }
        }

        CacheStats {
            total_entries: self.entries.len(),
            fresh_entries,
            stale_entries,
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove stale entries, returning how many were dropped
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_fresh() {
                true
            } else {
                removed += 1;
                false
            }
        });
        removed
    }
}

impl Default for ReleaseCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
}
