//! Verifier error types using thiserror 2.0.
//!
//! [`PactError`] is returned synchronously by the configuration calls and by
//! [`crate::PactVerifier::verify`]. [`InteractionError`] is a hard failure of a
//! single interaction; it is recorded in the report and never aborts a run.

use crate::body::BodyError;
use crate::matching::ComparisonError;
use crate::reporter::VerificationReport;
use pact_common::PlatformError;
use thiserror::Error;

/// Errors surfaced to the caller of the verifier.
#[derive(Error, Debug)]
pub enum PactError {
    /// Invalid or missing setup, or configuration calls made out of order
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The contract file could not be read
    #[error("Contract file could not be retrieved from '{location}': {source}")]
    FileAccess {
        /// Location the contract was read from
        location: String,
        /// Underlying read failure
        #[source]
        source: std::io::Error,
    },

    /// The contract file is not a valid contract document
    #[error("Contract file '{location}' is malformed: {source}")]
    ContractFormat {
        /// Location the contract was read from
        location: String,
        /// Decoder failure
        #[source]
        source: serde_json::Error,
    },

    /// A body was constructed from nothing
    #[error(transparent)]
    InvalidBody(#[from] BodyError),

    /// At least one interaction failed; carries the full report
    #[error("Pact verification failed\n{0}")]
    VerificationFailed(Box<VerificationReport>),

    /// Client construction failed
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Result type for verifier operations.
pub type PactResult<T> = Result<T, PactError>;

impl PactError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// The aggregate report, if this is a verification failure.
    #[must_use]
    pub fn report(&self) -> Option<&VerificationReport> {
        match self {
            Self::VerificationFailed(report) => Some(report),
            _ => None,
        }
    }
}

/// Hard failure of a single interaction.
#[derive(Error, Debug)]
pub enum InteractionError {
    /// Provider-state setup callback failed
    #[error("Setup for provider state '{state}' failed: {reason}")]
    StateSetup {
        /// State name, or the consumer name for consumer-level callbacks
        state: String,
        /// Callback error chain
        reason: String,
    },

    /// Provider-state teardown callback failed
    #[error("Teardown for provider state '{state}' failed: {reason}")]
    StateTeardown {
        /// State name, or the consumer name for consumer-level callbacks
        state: String,
        /// Callback error chain
        reason: String,
    },

    /// Recorded request could not be turned into an HTTP request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Provider could not be reached or did not answer
    #[error("Request to provider failed: {0}")]
    Transport(#[from] PlatformError),

    /// A body claims JSON but does not parse
    #[error(transparent)]
    MalformedBody(#[from] ComparisonError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PactError::configuration("Please supply a non empty consumer name");
        assert_eq!(
            err.to_string(),
            "Configuration error: Please supply a non empty consumer name"
        );

        let err = PactError::FileAccess {
            location: "pacts/missing.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("pacts/missing.json"));
    }

    #[test]
    fn test_report_only_on_verification_failure() {
        assert!(PactError::configuration("x").report().is_none());
    }

    #[test]
    fn test_interaction_error_display() {
        let err = InteractionError::StateSetup {
            state: "order 1 exists".to_string(),
            reason: "database down".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Setup for provider state 'order 1 exists' failed: database down"
        );
    }
}
