//! PEP 440 version type.
//!
//! Parses the full public + local version grammar used by Python package
//! indexes, normalizes the spelling variants it allows, and orders versions
//! the way installers do (dev < pre < final < post, local after public).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?xi)
        ^\s*v?
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?P<pre>
            [-_.]?
            (?P<pre_l>alpha|beta|preview|pre|rc|a|b|c)
            [-_.]?
            (?P<pre_n>[0-9]+)?
        )?
        (?P<post>
            (?:-(?P<post_n1>[0-9]+))
            |
            (?:[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>[0-9]+)?)
        )?
        (?P<dev>
            [-_.]?
            (?P<dev_l>dev)
            [-_.]?
            (?P<dev_n>[0-9]+)?
        )?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        \s*$",
    )
    .expect("PEP 440 pattern is valid")
});

/// PEP 440 version (`[N!]N(.N)*[{a|b|rc}N][.postN][.devN][+local]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub pre: Option<PreRelease>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub local: Vec<LocalSegment>,
}

/// Pre-release phase, in ascending precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreKind {
    Alpha,
    Beta,
    ReleaseCandidate,
}

/// Pre-release marker (`a1`, `b0`, `rc2`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    pub kind: PreKind,
    pub number: u64,
}

/// One dot-separated piece of a local version label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocalSegment {
    Number(u64),
    Text(String),
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version: '{input}'")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },
}

/// Sort sentinel used to place absent segments above or below present ones
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Bound<T> {
    Below,
    At(T),
    Above,
}

type CmpKey<'a> = (
    u64,
    &'a [u64],
    Bound<PreRelease>,
    Bound<u64>,
    Bound<u64>,
    Bound<&'a [LocalSegment]>,
);

impl Version {
    /// Create a final release from its numeric components
    pub fn new(release: impl Into<Vec<u64>>) -> Self {
        Self {
            epoch: 0,
            release: release.into(),
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    /// Pre-releases and development releases
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    pub fn is_devrelease(&self) -> bool {
        self.dev.is_some()
    }

    pub fn is_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// The version with its local label removed
    pub fn public(&self) -> Version {
        Version {
            local: Vec::new(),
            ..self.clone()
        }
    }

    /// Epoch and release segment only (`1!2.0rc1.post3` -> `1!2.0`)
    pub fn base_version(&self) -> Version {
        Version {
            epoch: self.epoch,
            ..Version::new(self.release.clone())
        }
    }

    /// Release with insignificant trailing zeros stripped
    fn significant_release(&self) -> &[u64] {
        let end = self
            .release
            .iter()
            .rposition(|&part| part != 0)
            .map_or(0, |idx| idx + 1);
        &self.release[..end]
    }

    fn cmp_key(&self) -> CmpKey<'_> {
        // A bare dev release sorts before every pre-release of the same base.
        let pre = match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => Bound::Below,
            (None, _, _) => Bound::Above,
            (Some(pre), _, _) => Bound::At(pre),
        };
        let post = self.post.map_or(Bound::Below, Bound::At);
        let dev = self.dev.map_or(Bound::Above, Bound::At);
        let local = if self.local.is_empty() {
            Bound::Below
        } else {
            Bound::At(self.local.as_slice())
        };

        (self.epoch, self.significant_release(), pre, post, dev, local)
    }
}

fn parse_number(component: &str) -> Result<u64, VersionError> {
    component.parse().map_err(|_| VersionError::InvalidNumber {
        component: component.to_string(),
    })
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = VERSION_PATTERN
            .captures(s)
            .ok_or_else(|| VersionError::InvalidFormat {
                input: s.to_string(),
            })?;

        let epoch = caps
            .name("epoch")
            .map(|m| parse_number(m.as_str()))
            .transpose()?
            .unwrap_or(0);

        let release = caps
            .name("release")
            .map(|m| {
                m.as_str()
                    .split('.')
                    .map(parse_number)
                    .collect::<Result<Vec<u64>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let pre = match caps.name("pre_l") {
            Some(label) => {
                let kind = match label.as_str().to_ascii_lowercase().as_str() {
                    "a" | "alpha" => PreKind::Alpha,
                    "b" | "beta" => PreKind::Beta,
                    _ => PreKind::ReleaseCandidate,
                };
                let number = caps
                    .name("pre_n")
                    .map(|m| parse_number(m.as_str()))
                    .transpose()?
                    .unwrap_or(0);
                Some(PreRelease { kind, number })
            },
            None => None,
        };

        // `1.0-1` is the implicit post release spelling.
        let post = if caps.name("post").is_some() {
            let number = caps.name("post_n1").or_else(|| caps.name("post_n2"));
            Some(number.map(|m| parse_number(m.as_str())).transpose()?.unwrap_or(0))
        } else {
            None
        };

        let dev = if caps.name("dev").is_some() {
            Some(
                caps.name("dev_n")
                    .map(|m| parse_number(m.as_str()))
                    .transpose()?
                    .unwrap_or(0),
            )
        } else {
            None
        };

        let local = caps
            .name("local")
            .map(|m| {
                m.as_str()
                    .split(['-', '_', '.'])
                    .map(|part| match part.parse::<u64>() {
                        Ok(n) if part.bytes().all(|b| b.is_ascii_digit()) => {
                            LocalSegment::Number(n)
                        },
                        _ => LocalSegment::Text(part.to_ascii_lowercase()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Version {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            PreKind::Alpha => "a",
            PreKind::Beta => "b",
            PreKind::ReleaseCandidate => "rc",
        };
        write!(f, "{}{}", label, self.number)
    }
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalSegment::Number(n) => write!(f, "{}", n),
            LocalSegment::Text(text) => f.write_str(text),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }

        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        f.write_str(&release.join("."))?;

        if let Some(pre) = self.pre {
            write!(f, "{}", pre)?;
        }
        if let Some(post) = self.post {
            write!(f, ".post{}", post)?;
        }
        if let Some(dev) = self.dev {
            write!(f, ".dev{}", dev)?;
        }

        if !self.local.is_empty() {
            let local: Vec<String> = self.local.iter().map(LocalSegment::to_string).collect();
            write!(f, "+{}", local.join("."))?;
        }

        Ok(())
    }
}

impl PartialOrd for LocalSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LocalSegment {
    // Alphanumeric segments sort below numeric ones.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (LocalSegment::Number(a), LocalSegment::Number(b)) => a.cmp(b),
            (LocalSegment::Text(a), LocalSegment::Text(b)) => a.cmp(b),
            (LocalSegment::Text(_), LocalSegment::Number(_)) => Ordering::Less,
            (LocalSegment::Number(_), LocalSegment::Text(_)) => Ordering::Greater,
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cmp_key().hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_key().cmp(&other.cmp_key())
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}
