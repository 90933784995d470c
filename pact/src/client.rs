//! Provider HTTP client seam.
//!
//! The verifier replays recorded requests through a [`ProviderClient`]. The
//! client is owned by the caller; timeouts, pooling and retries are its
//! concern. [`ReqwestProviderClient`] is the production implementation.

use crate::body::charset;
use crate::contract::{Request, header};
use crate::error::InteractionError;
use async_trait::async_trait;
use pact_common::{HttpConfig, PlatformError, build_http_client};
use reqwest::Method;
use std::collections::HashMap;
use tracing::{debug, instrument};
use url::Url;

/// Request replayed against the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    /// HTTP method, upper case
    pub method: String,
    /// Path relative to the provider base URL
    pub path: String,
    /// Encoded query string without `?`
    pub query: Option<String>,
    /// Headers in a stable order
    pub headers: Vec<(String, String)>,
    /// Encoded body
    pub body: Option<Vec<u8>>,
}

impl ProviderRequest {
    /// Derive the actual request from a recorded one.
    ///
    /// A body without a declared `Content-Type` is sent with the content type
    /// it was normalized under.
    ///
    /// # Errors
    ///
    /// Fails if the recorded method is empty.
    pub fn from_contract(request: &Request) -> Result<Self, InteractionError> {
        let method = request.method.trim().to_ascii_uppercase();
        if method.is_empty() {
            return Err(InteractionError::InvalidRequest(format!(
                "request to '{}' has no method",
                request.path
            )));
        }

        let mut headers: Vec<(String, String)> = request
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        headers.sort();

        let body = request.body_content().map(|content| {
            if header(&request.headers, "Content-Type").is_none() {
                headers.push(("Content-Type".to_string(), content.content_type().to_string()));
            }
            content.content_bytes()
        });

        Ok(Self {
            method,
            path: request.path.clone(),
            query: request
                .query
                .as_ref()
                .map(crate::contract::Query::to_query_string)
                .filter(|q| !q.is_empty()),
            headers,
            body,
        })
    }
}

/// Response captured from the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderResponse {
    /// Status code
    pub status: u16,
    /// Headers; repeated headers are joined with `, `
    pub headers: HashMap<String, String>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl ProviderResponse {
    /// Response with a status and nothing else.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and its content type.
    #[must_use]
    pub fn with_json_body(self, body: &serde_json::Value) -> Self {
        self.with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }

    /// Declared content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        header(&self.headers, "Content-Type")
    }

    /// Body decoded with the charset of its content type (UTF-8 otherwise).
    #[must_use]
    pub fn body_text(&self) -> String {
        self.content_type()
            .and_then(charset)
            .unwrap_or_default()
            .decode(&self.body)
    }
}

/// Capability to send one request to the provider.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Send the request and capture the full response.
    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse, PlatformError>;
}

/// [`ProviderClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestProviderClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ReqwestProviderClient {
    /// Create a client for the provider at `base_url`.
    ///
    /// # Errors
    ///
    /// Fails if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, http: reqwest::Client) -> Result<Self, PlatformError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PlatformError::invalid_input(format!("provider base URL '{base_url}': {e}")))?;
        Ok(Self { base_url, http })
    }

    /// Create a client with a freshly built `reqwest` client.
    ///
    /// # Errors
    ///
    /// Fails if the URL is invalid or the HTTP client cannot be built.
    pub fn from_config(base_url: &str, config: &HttpConfig) -> Result<Self, PlatformError> {
        Self::new(base_url, build_http_client(config)?)
    }

    /// Provider base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, request: &ProviderRequest) -> Url {
        let mut url = self.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        let path = request.path.trim_start_matches('/');
        url.set_path(&format!("{base_path}/{path}"));
        url.set_query(request.query.as_deref());
        url
    }
}

#[async_trait]
impl ProviderClient for ReqwestProviderClient {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse, PlatformError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| PlatformError::invalid_input(format!("method '{}': {e}", request.method)))?;
        let url = self.url_for(request);
        debug!(%url, "Replaying request");

        let mut builder = self.http.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        let body = response.bytes().await?.to_vec();

        debug!(status, bytes = body.len(), "Provider responded");
        Ok(ProviderResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorded(value: serde_json::Value) -> Request {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_request_from_contract() {
        let request = recorded(json!({
            "method": "post",
            "path": "/orders",
            "query": "dry_run=true",
            "headers": {"Accept": "application/json"},
            "body": {"sku": "A-1", "qty": 2}
        }));

        let actual = ProviderRequest::from_contract(&request).unwrap();
        assert_eq!(actual.method, "POST");
        assert_eq!(actual.query.as_deref(), Some("dry_run=true"));
        assert_eq!(
            actual.headers,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ]
        );
        assert_eq!(actual.body, Some(br#"{"sku":"A-1","qty":2}"#.to_vec()));
    }

    #[test]
    fn test_request_without_body() {
        let request = recorded(json!({"method": "GET", "path": "/orders/1"}));
        let actual = ProviderRequest::from_contract(&request).unwrap();
        assert!(actual.body.is_none());
        assert!(actual.headers.is_empty());
        assert!(actual.query.is_none());
    }

    #[test]
    fn test_request_without_method_is_invalid() {
        let request = recorded(json!({"method": "", "path": "/orders/1"}));
        assert!(matches!(
            ProviderRequest::from_contract(&request),
            Err(InteractionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_url_joins_base_path() {
        let client =
            ReqwestProviderClient::new("http://localhost:8080/api/", reqwest::Client::new()).unwrap();
        let request = ProviderRequest {
            method: "GET".to_string(),
            path: "/orders/1".to_string(),
            query: Some("expand=lines".to_string()),
            headers: vec![],
            body: None,
        };
        assert_eq!(
            client.url_for(&request).as_str(),
            "http://localhost:8080/api/orders/1?expand=lines"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ReqwestProviderClient::new("not a url", reqwest::Client::new());
        assert!(matches!(result, Err(PlatformError::InvalidInput(_))));
    }

    #[test]
    fn test_response_body_text_uses_charset() {
        let response = ProviderResponse::new(200)
            .with_header("content-type", "text/plain; charset=utf-16le")
            .with_body(vec![b'o', 0, b'k', 0]);
        assert_eq!(response.body_text(), "ok");
    }
}
