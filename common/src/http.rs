//! HTTP client settings for provider replay and contract download.
//!
//! Replay is strictly sequential, so the client keeps a single idle
//! connection per host. Headers every replayed request must carry (an
//! `Authorization` token for a secured provider, say) are installed as
//! client default headers rather than written into the contract.

use crate::PlatformError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::debug;

/// User agent sent to providers and contract hosts.
pub const USER_AGENT: &str = concat!("pact-verifier/", env!("CARGO_PKG_VERSION"));

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout (default: 30s)
    pub timeout: Duration,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Headers added to every request unless the request sets them itself
    pub default_headers: Vec<(String, String)>,
    /// Accept self-signed or otherwise invalid provider certificates
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            default_headers: Vec::new(),
            accept_invalid_certs: false,
        }
    }
}

impl HttpConfig {
    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Accept invalid TLS certificates. Only meant for local providers.
    #[must_use]
    pub const fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    fn header_map(&self) -> Result<HeaderMap, PlatformError> {
        let mut headers = HeaderMap::with_capacity(self.default_headers.len());
        for (name, value) in &self.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| PlatformError::invalid_input(format!("header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| PlatformError::invalid_input(format!("value of header '{name}': {e}")))?;
            headers.append(name, value);
        }
        Ok(headers)
    }
}

/// Build a client from the settings.
///
/// # Errors
///
/// Returns [`PlatformError::InvalidInput`] for an unusable default header and
/// [`PlatformError::Http`] if the TLS backend cannot be initialised.
///
/// # Examples
///
/// ```
/// use pact_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default()
///     .with_timeout(Duration::from_secs(5))
///     .with_header("Authorization", "Bearer provider-ci");
/// assert!(build_http_client(&config).is_ok());
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, PlatformError> {
    let headers = config.header_map()?;
    debug!(
        timeout = ?config.timeout,
        default_headers = headers.len(),
        accept_invalid_certs = config.accept_invalid_certs,
        "Building HTTP client"
    );

    ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(1)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .use_rustls_tls()
        .build()
        .map_err(PlatformError::Http)
}
