//! Upgrade policy deciding whether an installed version is preferred.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QuarryError;

/// How eagerly already-installed projects are upgraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpgradeStrategy {
    /// Always look for the newest candidate, installed or not
    Eager,
    /// Upgrade only projects the user asked for by name
    #[default]
    OnlyIfNeeded,
    /// Keep whatever is installed if it satisfies the requirement
    ToSatisfyOnly,
}

impl UpgradeStrategy {
    /// Whether the installed candidate should be tried before any other
    pub fn prefers_installed(self, user_requested: bool) -> bool {
        match self {
            UpgradeStrategy::Eager => false,
            UpgradeStrategy::OnlyIfNeeded => !user_requested,
            UpgradeStrategy::ToSatisfyOnly => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UpgradeStrategy::Eager => "eager",
            UpgradeStrategy::OnlyIfNeeded => "only-if-needed",
            UpgradeStrategy::ToSatisfyOnly => "to-satisfy-only",
        }
    }
}

impl fmt::Display for UpgradeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpgradeStrategy {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "eager" => Ok(UpgradeStrategy::Eager),
            "only-if-needed" => Ok(UpgradeStrategy::OnlyIfNeeded),
            "to-satisfy-only" => Ok(UpgradeStrategy::ToSatisfyOnly),
            other => Err(QuarryError::ConfigValidation {
                field: "upgrade-strategy".to_string(),
                reason: format!(
                    "'{}' is not one of eager, only-if-needed, to-satisfy-only",
                    other
                ),
            }),
        }
    }
}
