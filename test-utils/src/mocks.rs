//! Mock implementations for testing.
//!
//! Doubles for the verifier's collaborator seams: the provider client and
//! the contract source.

use async_trait::async_trait;
use pact_common::PlatformError;
use pact_verifier::{ContractSource, ProviderClient, ProviderRequest, ProviderResponse};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Mock provider answering from a route table.
///
/// Unrouted requests get a 404 with an empty body.
#[derive(Debug, Default, Clone)]
pub struct MockProviderClient {
    routes: Arc<RwLock<HashMap<(String, String), ProviderResponse>>>,
    requests: Arc<RwLock<Vec<ProviderRequest>>>,
    unavailable: Arc<RwLock<bool>>,
}

impl MockProviderClient {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with `response`.
    pub async fn route(&self, method: &str, path: &str, response: ProviderResponse) {
        self.routes
            .write()
            .await
            .insert((method.to_ascii_uppercase(), path.to_string()), response);
    }

    /// Make every following request fail as if the provider were down.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Requests received so far, in order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.read().await.clone()
    }

    /// Number of requests received.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Forget received requests.
    pub async fn clear(&self) {
        self.requests.write().await.clear();
    }
}

#[async_trait]
impl ProviderClient for MockProviderClient {
    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse, PlatformError> {
        self.requests.write().await.push(request.clone());
        if *self.unavailable.read().await {
            return Err(PlatformError::unavailable("mock provider is down"));
        }

        let key = (request.method.clone(), request.path.clone());
        Ok(self
            .routes
            .read()
            .await
            .get(&key)
            .cloned()
            .unwrap_or_else(|| ProviderResponse::new(404)))
    }
}

/// Contract source serving documents from memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryContractSource {
    documents: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryContractSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document under `location`.
    pub async fn insert(&self, location: &str, document: impl Into<String>) {
        self.documents
            .write()
            .await
            .insert(location.to_string(), document.into());
    }
}

#[async_trait]
impl ContractSource for InMemoryContractSource {
    async fn read_text(&self, location: &str) -> io::Result<String> {
        self.documents
            .read()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no document at {location}")))
    }
}
