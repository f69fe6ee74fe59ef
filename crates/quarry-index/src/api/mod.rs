//! Typed queries against the legacy XML-RPC index API

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::transport::IndexProxy;
use crate::xmlrpc::Value;
use crate::IndexResult;
use quarry_core::error::QuarryError;
use quarry_core::types::Link;

/// One row of a `search` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Project name as published
    pub name: String,
    /// One-line summary, empty when the project has none
    pub summary: String,
    /// Version the hit refers to
    pub version: String,
}

/// A distribution file published for a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFile {
    /// Download URL
    pub url: String,
    /// File name
    pub filename: String,
    /// `sdist`, `bdist_wheel`, ...
    pub packagetype: String,
    /// `Requires-Python` metadata
    pub requires_python: Option<String>,
    /// SHA-256 digest of the file
    pub sha256: Option<String>,
    /// Whether the file was yanked
    pub yanked: bool,
    /// Reason given for the yank
    pub yanked_reason: Option<String>,
}

impl ReleaseFile {
    pub fn is_wheel(&self) -> bool {
        self.packagetype == "bdist_wheel"
    }

    /// Link for this file, carrying its digest as a `#sha256=` fragment
    pub fn to_link(&self, comes_from: &str) -> IndexResult<Link> {
        let url = match (&self.sha256, self.url.contains('#')) {
            (Some(digest), false) => format!("{}#sha256={}", self.url, digest),
            _ => self.url.clone(),
        };

        let mut link = Link::parse(&url)?.with_comes_from(comes_from);
        if let Some(ref requires_python) = self.requires_python {
            link = link.with_requires_python(requires_python.clone());
        }
        if self.yanked {
            link = link.with_yanked_reason(self.yanked_reason.clone().unwrap_or_default());
        }
        Ok(link)
    }
}

fn expect_array<'v>(value: &'v Value, method: &str) -> IndexResult<&'v [Value]> {
    value.as_array().ok_or_else(|| {
        QuarryError::decode(format!(
            "{} returned {} instead of array",
            method,
            value.type_name()
        ))
    })
}

/// String member of a struct; nil and missing members both read as `None`
fn member_str(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn require_str(value: &Value, key: &str, method: &str) -> IndexResult<String> {
    member_str(value, key).ok_or_else(|| {
        QuarryError::decode(format!("{} result is missing '{}'", method, key))
    })
}

impl IndexProxy {
    /// Search projects whose name or summary matches any of `terms`
    pub fn search(&self, terms: &[&str]) -> IndexResult<Vec<SearchHit>> {
        let query: Vec<Value> = terms.iter().map(|term| Value::from(*term)).collect();
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::from(query.clone()));
        fields.insert("summary".to_string(), Value::from(query));

        let result = self.call("search", &[Value::from(fields), Value::from("or")])?;
        expect_array(&result, "search")?
            .iter()
            .map(|hit| {
                Ok(SearchHit {
                    name: require_str(hit, "name", "search")?,
                    summary: member_str(hit, "summary").unwrap_or_default(),
                    version: require_str(hit, "version", "search")?,
                })
            })
            .collect()
    }

    /// Version strings released for `project`
    ///
    /// The index returns them newest first; callers must not rely on that.
    pub fn package_releases(&self, project: &str, show_hidden: bool) -> IndexResult<Vec<String>> {
        let result = self.call(
            "package_releases",
            &[Value::from(project), Value::from(show_hidden)],
        )?;
        let versions: Vec<String> = expect_array(&result, "package_releases")?
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();

        debug!("{} has {} releases", project, versions.len());
        Ok(versions)
    }

    /// Files published for one release of `project`
    pub fn release_urls(&self, project: &str, version: &str) -> IndexResult<Vec<ReleaseFile>> {
        let result = self.call("release_urls", &[Value::from(project), Value::from(version)])?;
        expect_array(&result, "release_urls")?
            .iter()
            .map(|file| {
                let sha256 = file
                    .get("digests")
                    .and_then(|digests| member_str(digests, "sha256"))
                    .or_else(|| member_str(file, "sha256_digest"));
                Ok(ReleaseFile {
                    url: require_str(file, "url", "release_urls")?,
                    filename: member_str(file, "filename").unwrap_or_default(),
                    packagetype: member_str(file, "packagetype").unwrap_or_default(),
                    requires_python: member_str(file, "requires_python")
                        .filter(|rp| !rp.is_empty()),
                    sha256,
                    yanked: file.get("yanked").and_then(Value::as_bool).unwrap_or(false),
                    yanked_reason: member_str(file, "yanked_reason"),
                })
            })
            .collect()
    }
}
