//! Blocking HTTP session with connection pooling and retry logic

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, warn};

use crate::IndexResult;
use quarry_core::error::QuarryError;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Response statuses that trigger a retry of idempotent requests
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            retry_statuses: vec![500, 503, 520, 527],
        }
    }
}

/// Authentication configuration for index access
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for authentication
    pub token: Option<String>,
    /// Basic auth username
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
}

/// Everything needed to build an `IndexSession`
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
    /// Optional credentials
    pub auth: Option<AuthConfig>,
    /// Retry policy
    pub retry: RetryConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: concat!("quarry/", env!("CARGO_PKG_VERSION")).to_string(),
            pool_max_idle_per_host: 10,
            auth: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Shared HTTP session for index operations
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct IndexSession {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
}

impl IndexSession {
    /// Create new session with default configuration
    pub fn new() -> IndexResult<Self> {
        Self::with_config(SessionConfig::default())
    }

    /// Create session with authentication
    pub fn with_auth(auth: AuthConfig) -> IndexResult<Self> {
        Self::with_config(SessionConfig {
            auth: Some(auth),
            ..SessionConfig::default()
        })
    }

    /// Create session with custom configuration
    pub fn with_config(config: SessionConfig) -> IndexResult<Self> {
        let mut builder = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout)
            .gzip(true)
            .user_agent(config.user_agent.as_str());

        if let Some(auth) = config.auth {
            if let Some(value) = authorization_header(&auth)? {
                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, value);
                builder = builder.default_headers(headers);
            }
        }

        let client = builder
            .build()
            .map_err(|e| QuarryError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            retry_config: config.retry,
        })
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    /// GET `url`; connection failures and retryable statuses are retried
    pub fn get(&self, url: &str) -> IndexResult<Response> {
        self.send_with_retry(url, true, || self.client.get(url))
    }

    /// POST `body` to `url`
    ///
    /// POST is not idempotent, so only failures to connect are retried: once
    /// the server has answered, the response is handed back as-is.
    pub fn post(&self, url: &str, body: Vec<u8>, headers: HeaderMap) -> IndexResult<Response> {
        self.send_with_retry(url, false, || {
            self.client
                .post(url)
                .headers(headers.clone())
                .body(body.clone())
        })
    }

    /// Execute HTTP request with exponential backoff retry logic
    fn send_with_retry<F>(&self, url: &str, idempotent: bool, build: F) -> IndexResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            let exhausted = attempt >= self.retry_config.max_retries;

            match build().send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retryable =
                        idempotent && self.retry_config.retry_statuses.contains(&status);
                    if !retryable || exhausted {
                        return Ok(response);
                    }
                    warn!(
                        "Retrying (attempt {}/{}) after status {} from {}",
                        attempt + 1,
                        self.retry_config.max_retries,
                        status,
                        url
                    );
                },
                Err(error) => {
                    let retryable = error.is_connect() || (idempotent && error.is_timeout());
                    if !retryable || exhausted {
                        return Err(QuarryError::network(
                            format!("Request to {} failed: {}", url, error),
                            error,
                        ));
                    }
                    warn!(
                        "Retrying (attempt {}/{}) after connection failure to {}: {}",
                        attempt + 1,
                        self.retry_config.max_retries,
                        url,
                        error
                    );
                },
            }

            thread::sleep(delay);
            delay = std::cmp::min(
                Duration::from_millis(
                    (delay.as_millis() as f64 * self.retry_config.multiplier) as u64,
                ),
                self.retry_config.max_delay,
            );
            attempt += 1;
        }
    }
}

/// Build the `Authorization` header value for the configured credentials
fn authorization_header(auth: &AuthConfig) -> IndexResult<Option<HeaderValue>> {
    if let Some(ref token) = auth.token {
        sensitive_header(&format!("Bearer {}", token)).map(Some)
    } else if let (Some(username), Some(password)) = (&auth.username, &auth.password) {
        basic_auth_header(username, password).map(Some)
    } else {
        Ok(None)
    }
}

/// `Authorization: Basic` value for a username and password
pub fn basic_auth_header(username: &str, password: &str) -> IndexResult<HeaderValue> {
    use base64::{engine::general_purpose, Engine as _};
    sensitive_header(&format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", username, password))
    ))
}

fn sensitive_header(raw: &str) -> IndexResult<HeaderValue> {
    let mut value = HeaderValue::from_str(raw)
        .map_err(|e| QuarryError::network(format!("Invalid authorization header: {}", e), e))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Turn a non-success response into `QuarryError::NetworkConnection`
///
/// Anything outside 2xx fails, informational and redirect statuses included;
/// redirects have already been followed by the client, so a 3xx here (a 304,
/// say) is never an answer the XML-RPC decoder could use.
///
/// The message mirrors what installers traditionally print, e.g.
/// `404 Client Error: Not Found for url: https://pypi.org/pypi`.
pub fn raise_for_status(response: Response) -> IndexResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let kind = if status.is_client_error() {
        "Client"
    } else if status.is_server_error() {
        "Server"
    } else {
        "HTTP"
    };
    let url = response.url().to_string();
    let reason = status.canonical_reason().unwrap_or("Unknown");
    debug!("{} response from {}", status, url);

    Err(QuarryError::NetworkConnection {
        status: status.as_u16(),
        message: format!("{} {} Error: {} for url: {}", status.as_u16(), kind, reason, url),
        url,
    })
}
