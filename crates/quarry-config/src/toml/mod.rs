//! quarry.toml configuration parsing and serialization

use std::time::Duration;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigResult;
use quarry_core::error::QuarryError;
use quarry_core::types::UpgradeStrategy;
use quarry_index::{AuthConfig, RetryConfig, SessionConfig};

/// Index queried when quarry.toml names none
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi";

/// Upper bound accepted for `index.retries`
pub const MAX_RETRIES: u32 = 10;

/// Complete quarry.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuarryToml {
    /// Package index settings
    #[serde(default)]
    pub index: IndexSection,

    /// Candidate selection settings
    #[serde(default)]
    pub resolver: ResolverSection,
}

/// `[index]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IndexSection {
    /// XML-RPC endpoint of the index
    #[serde(default = "default_index_url")]
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for connection failures and retryable statuses
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Bearer token; mutually exclusive with username/password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// `[resolver]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverSection {
    #[serde(default)]
    pub upgrade_strategy: UpgradeStrategy,
}

fn default_index_url() -> String {
    DEFAULT_INDEX_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_retries() -> u32 {
    RetryConfig::default().max_retries
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            user_agent: None,
            token: None,
            username: None,
            password: None,
        }
    }
}

impl IndexSection {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retries,
            ..RetryConfig::default()
        }
    }

    /// Credentials, if any are configured
    pub fn auth_config(&self) -> Option<AuthConfig> {
        if self.token.is_none() && self.username.is_none() {
            return None;
        }
        Some(AuthConfig {
            token: self.token.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }

    /// Settings for building the shared `IndexSession`
    pub fn session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            auth: self.auth_config(),
            retry: self.retry_config(),
            ..defaults
        }
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
    (line, column)
}

fn parse_error(content: &str, message: &str, span: Option<std::ops::Range<usize>>) -> QuarryError {
    let (line, column) = span.map_or((0, 0), |span| line_column(content, span.start));
    QuarryError::TomlParse {
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// Parse TOML string to QuarryToml configuration
pub fn parse_quarry_toml(content: &str) -> ConfigResult<QuarryToml> {
    // toml_edit first: its syntax errors carry precise spans
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| parse_error(content, e.message(), e.span()))?;

    let config: QuarryToml =
        toml::from_str(content).map_err(|e| parse_error(content, e.message(), e.span()))?;

    validate_config(&config)?;
    Ok(config)
}

/// Serialize QuarryToml to TOML string
pub fn serialize_quarry_toml(config: &QuarryToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| QuarryError::ConfigValidation {
        field: "quarry.toml".to_string(),
        reason: format!("TOML serialization error: {}", e),
    })
}

fn invalid(field: &str, reason: impl Into<String>) -> QuarryError {
    QuarryError::ConfigValidation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Validate configuration completeness
pub fn validate_config(config: &QuarryToml) -> ConfigResult<()> {
    let index = &config.index;

    let url = Url::parse(&index.url)
        .map_err(|e| invalid("index.url", format!("'{}' is not a URL: {}", index.url, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid(
            "index.url",
            format!("'{}' must be an http or https URL with a host", index.url),
        ));
    }

    if index.timeout_secs == 0 {
        return Err(invalid("index.timeout-secs", "must be at least 1"));
    }

    if index.retries > MAX_RETRIES {
        return Err(invalid(
            "index.retries",
            format!("{} exceeds the maximum of {}", index.retries, MAX_RETRIES),
        ));
    }

    if index.token.is_some() && (index.username.is_some() || index.password.is_some()) {
        return Err(invalid(
            "index.token",
            "cannot be combined with username/password",
        ));
    }
    match (&index.username, &index.password) {
        (Some(_), None) => return Err(invalid("index.password", "required when username is set")),
        (None, Some(_)) => return Err(invalid("index.username", "required when password is set")),
        _ => {},
    }

    Ok(())
}

/// Load and parse quarry.toml from file path
pub fn load_from_file(path: &Utf8Path) -> ConfigResult<QuarryToml> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| QuarryError::io(format!("Failed to read {}", path), e))?;

    parse_quarry_toml(&content).map_err(|e| match e {
        QuarryError::TomlParse {
            message,
            line,
            column,
        } => QuarryError::TomlParse {
            message: format!("in file {}: {}", path, message),
            line,
            column,
        },
        QuarryError::ConfigValidation { field, reason } => QuarryError::ConfigValidation {
            field,
            reason: format!("{} (in file {})", reason, path),
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_quarry_toml("").unwrap();
        assert_eq!(config, QuarryToml::default());
        assert_eq!(config.index.url, DEFAULT_INDEX_URL);
        assert_eq!(config.index.retries, 3);
        assert_eq!(config.resolver.upgrade_strategy, UpgradeStrategy::OnlyIfNeeded);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[index]
url = "https://index.example/pypi"
timeout-secs = 30
retries = 5
user-agent = "ci-bot/1.0"
username = "deploy"
password = "hunter2"

[resolver]
upgrade-strategy = "to-satisfy-only"
"#;

        let config = parse_quarry_toml(toml).unwrap();
        assert_eq!(config.index.url, "https://index.example/pypi");
        assert_eq!(config.index.timeout_secs, 30);
        assert_eq!(config.resolver.upgrade_strategy, UpgradeStrategy::ToSatisfyOnly);

        let session = config.index.session_config();
        assert_eq!(session.timeout, Duration::from_secs(30));
        assert_eq!(session.user_agent, "ci-bot/1.0");
        assert_eq!(session.retry.max_retries, 5);
        assert_eq!(session.retry.retry_statuses, vec![500, 503, 520, 527]);
        let auth = session.auth.unwrap();
        assert_eq!(auth.username.as_deref(), Some("deploy"));
        assert_eq!(auth.token, None);
    }

    #[test]
    fn test_session_config_without_auth() {
        let session = IndexSection::default().session_config();
        assert!(session.auth.is_none());
        assert_eq!(session.user_agent, SessionConfig::default().user_agent);
    }

    #[test]
    fn test_syntax_error_reports_location() {
        let toml = "[index]\nurl = \"https://index.example/pypi\"\nretries = = 3\n";

        match parse_quarry_toml(toml).unwrap_err() {
            QuarryError::TomlParse { line, column, .. } => {
                assert_eq!(line, 3);
                assert!(column > 1);
            },
            other => panic!("Expected TomlParse, got {:?}", other),
        }
    }

    #[test]
    fn test_type_error_reports_location() {
        let toml = "[index]\nretries = \"many\"\n";

        match parse_quarry_toml(toml).unwrap_err() {
            QuarryError::TomlParse { line, .. } => assert_eq!(line, 2),
            other => panic!("Expected TomlParse, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let toml = "[resolver]\nupgrade-strategy = \"sometimes\"\n";
        assert!(matches!(
            parse_quarry_toml(toml),
            Err(QuarryError::TomlParse { .. })
        ));
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            ("[index]\nurl = \"not a url\"\n", "index.url"),
            ("[index]\nurl = \"file:///srv/index\"\n", "index.url"),
            ("[index]\ntimeout-secs = 0\n", "index.timeout-secs"),
            ("[index]\nretries = 11\n", "index.retries"),
            ("[index]\ntoken = \"t\"\nusername = \"u\"\npassword = \"p\"\n", "index.token"),
            ("[index]\nusername = \"u\"\n", "index.password"),
            ("[index]\npassword = \"p\"\n", "index.username"),
        ];

        for (toml, expected_field) in cases {
            match parse_quarry_toml(toml).unwrap_err() {
                QuarryError::ConfigValidation { field, .. } => assert_eq!(field, expected_field),
                other => panic!("Expected ConfigValidation for {:?}, got {:?}", toml, other),
            }
        }
    }

    #[test]
    fn test_round_trip_serialization() {
        let toml = r#"
[index]
url = "https://index.example/pypi"
token = "secret"

[resolver]
upgrade-strategy = "eager"
"#;

        let config = parse_quarry_toml(toml).unwrap();
        let serialized = serialize_quarry_toml(&config).unwrap();
        assert!(!serialized.contains("username"));
        assert_eq!(parse_quarry_toml(&serialized).unwrap(), config);
    }

    #[test]
    fn test_line_column() {
        assert_eq!(line_column("abc", 0), (1, 1));
        assert_eq!(line_column("abc\ndef", 5), (2, 2));
        assert_eq!(line_column("abc", 99), (1, 4));
    }
}
