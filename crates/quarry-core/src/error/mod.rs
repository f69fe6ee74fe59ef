//! Error types and result aliases for Quarry operations.
//!
//! Provides a unified error type that covers every failure the candidate
//! finder can surface to the resolver, with actionable error messages.

use thiserror::Error;

use crate::types::VersionError;

/// Unified error type for all Quarry operations
#[derive(Error, Debug)]
pub enum QuarryError {
    // Config errors
    #[error("Failed to parse quarry.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Index errors
    #[error("Package '{name}' not found in index")]
    PackageNotFound { name: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{message}")]
    NetworkConnection {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("XML-RPC fault {code}: {message}")]
    XmlRpcFault { code: i64, message: String },

    #[error("Malformed XML-RPC response: {message}")]
    XmlRpcDecode { message: String },

    // Candidate errors
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("Unsupported operation on lazy candidate sequence: {operation}")]
    UnsupportedOperation { operation: &'static str },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Quarry operations
pub type QuarryResult<T> = Result<T, QuarryError>;

impl QuarryError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create an XML-RPC decoding error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::XmlRpcDecode {
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            QuarryError::NetworkConnection { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            QuarryError::Network { .. } | QuarryError::Io { .. } => true,
            QuarryError::NetworkConnection { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            QuarryError::PackageNotFound { .. } => {
                Some("Check the package name spelling or try searching the index")
            },
            QuarryError::Network { .. } => Some("Check your internet connection and try again"),
            QuarryError::NetworkConnection { status: 401 | 403, .. } => {
                Some("Check the credentials configured for this index")
            },
            QuarryError::NetworkConnection { .. } => {
                Some("The index rejected the request; check the index URL")
            },
            QuarryError::XmlRpcFault { .. } => {
                Some("The index no longer supports this XML-RPC call; use the simple API instead")
            },
            QuarryError::UnsupportedOperation { .. } => {
                Some("Iterate the candidates or test them for emptiness instead")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_connection_display_is_message() {
        let err = QuarryError::NetworkConnection {
            status: 404,
            url: "https://pypi.org/pypi".to_string(),
            message: "404 Client Error: Not Found for url: https://pypi.org/pypi".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "404 Client Error: Not Found for url: https://pypi.org/pypi"
        );
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_server_errors_are_recoverable() {
        let err = QuarryError::NetworkConnection {
            status: 503,
            url: "https://pypi.org/pypi".to_string(),
            message: "503 Server Error".to_string(),
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_version_error_converts() {
        let err: QuarryError = "not a version".parse::<crate::Version>().unwrap_err().into();
        assert!(matches!(err, QuarryError::Version(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_suggestions() {
        let err = QuarryError::UnsupportedOperation { operation: "len" };
        assert!(err.suggestion().is_some());

        let err = QuarryError::NetworkConnection {
            status: 401,
            url: String::new(),
            message: String::new(),
        };
        assert_eq!(
            err.suggestion(),
            Some("Check the credentials configured for this index")
        );

        let err = QuarryError::decode("missing <params>");
        assert_eq!(err.suggestion(), None);
    }
}
