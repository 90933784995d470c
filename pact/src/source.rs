//! Contract retrieval.

use async_trait::async_trait;
use pact_common::{HttpConfig, PlatformError, build_http_client};
use std::io;
use tracing::debug;

/// Capability to read a contract document by location.
#[async_trait]
pub trait ContractSource: Send + Sync {
    /// Read the whole document as text.
    async fn read_text(&self, location: &str) -> io::Result<String>;
}

/// Reads contracts from the local file system. `file://` prefixes are stripped.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileContractSource;

#[async_trait]
impl ContractSource for FileContractSource {
    async fn read_text(&self, location: &str) -> io::Result<String> {
        let path = location.strip_prefix("file://").unwrap_or(location);
        tokio::fs::read_to_string(path).await
    }
}

/// Fetches `http(s)://` locations over HTTP and everything else from disk.
#[derive(Debug, Clone)]
pub struct UriContractSource {
    http: reqwest::Client,
}

impl UriContractSource {
    /// Create a source using the given HTTP client.
    #[must_use]
    pub const fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Create a source with a freshly built HTTP client.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn from_config(config: &HttpConfig) -> Result<Self, PlatformError> {
        Ok(Self::new(build_http_client(config)?))
    }

    async fn fetch(&self, location: &str) -> io::Result<String> {
        debug!(location, "Fetching contract over HTTP");
        let response = self
            .http
            .get(location)
            .send()
            .await
            .map_err(io::Error::other)?;

        let status = response.status();
        if !status.is_success() {
            let kind = if status == reqwest::StatusCode::NOT_FOUND {
                io::ErrorKind::NotFound
            } else {
                io::ErrorKind::Other
            };
            return Err(io::Error::new(kind, format!("HTTP {status}")));
        }
        response.text().await.map_err(io::Error::other)
    }
}

#[async_trait]
impl ContractSource for UriContractSource {
    async fn read_text(&self, location: &str) -> io::Result<String> {
        if location.starts_with("http://") || location.starts_with("https://") {
            self.fetch(location).await
        } else {
            FileContractSource.read_text(location).await
        }
    }
}
