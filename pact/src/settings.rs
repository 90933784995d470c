//! Verifier settings loaded from the environment.
//!
//! | Variable | Required | Default |
//! |---|---|---|
//! | `PACT_CONSUMER_NAME` | yes | |
//! | `PACT_PROVIDER_NAME` | yes | |
//! | `PACT_PROVIDER_BASE_URL` | no | `http://localhost:8080` |
//! | `PACT_FILE` | yes | |
//! | `PACT_PROVIDER_TIMEOUT_SECS` | no | 30 |
//! | `PACT_PROVIDER_AUTH_TOKEN` | no | sent as `Authorization: Bearer <token>` |
//! | `PACT_PROVIDER_ACCEPT_INVALID_CERTS` | no | `false` |

use crate::error::{PactError, PactResult};
use pact_common::HttpConfig;
use std::env;
use std::time::Duration;

/// Everything needed to run a verification without code.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// Consumer whose contract is verified
    pub consumer_name: String,
    /// Provider under test
    pub provider_name: String,
    /// Base URL requests are replayed against
    pub provider_base_url: String,
    /// Contract file path or URL
    pub contract_location: String,
    /// HTTP client settings
    pub http: HttpConfig,
}

impl VerifierSettings {
    /// Create settings with default HTTP configuration.
    #[must_use]
    pub fn new(
        consumer_name: impl Into<String>,
        provider_name: impl Into<String>,
        provider_base_url: impl Into<String>,
        contract_location: impl Into<String>,
    ) -> Self {
        Self {
            consumer_name: consumer_name.into(),
            provider_name: provider_name.into(),
            provider_base_url: provider_base_url.into(),
            contract_location: contract_location.into(),
            http: HttpConfig::default(),
        }
    }

    /// Set HTTP client settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Load settings from environment variables (and `.env`, if present).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if required variables are missing or
    /// a value does not parse.
    pub fn from_env() -> PactResult<Self> {
        dotenvy::dotenv().ok();

        let consumer_name = required_env("PACT_CONSUMER_NAME")?;
        let provider_name = required_env("PACT_PROVIDER_NAME")?;
        let contract_location = required_env("PACT_FILE")?;
        let provider_base_url =
            env::var("PACT_PROVIDER_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let timeout = Duration::from_secs(parse_env("PACT_PROVIDER_TIMEOUT_SECS", 30)?);
        let accept_invalid_certs = parse_env("PACT_PROVIDER_ACCEPT_INVALID_CERTS", false)?;

        let mut http = HttpConfig::default()
            .with_timeout(timeout)
            .with_accept_invalid_certs(accept_invalid_certs);
        if let Some(token) = env::var("PACT_PROVIDER_AUTH_TOKEN").ok().filter(|t| !t.is_empty()) {
            http = http.with_header("Authorization", format!("Bearer {token}"));
        }

        Ok(Self::new(consumer_name, provider_name, provider_base_url, contract_location).with_http(http))
    }
}

fn required_env(name: &str) -> PactResult<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| PactError::configuration(format!("{name} must be set")))
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> PactResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| PactError::configuration(format!("Invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}
