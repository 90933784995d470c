//! Transport-level error type.
//!
//! Failures raised while talking to a provider or fetching a remote contract
//! are reported through [`PlatformError`], classified as retryable or not so
//! callers can decide whether a rerun is worthwhile.

use thiserror::Error;

/// Error raised by HTTP collaborators.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Provider is not reachable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Request could not be built from the given input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request did not complete in time
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// # Examples
    ///
    /// ```
    /// use pact_common::PlatformError;
    ///
    /// let err = PlatformError::timeout("GET /orders/1");
    /// assert!(err.is_retryable());
    ///
    /// let err = PlatformError::invalid_input("bad header");
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a timeout error with the given message.
    #[must_use]
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PlatformError::unavailable("connection refused").is_retryable());
        assert!(PlatformError::timeout("30s elapsed").is_retryable());
    }

    #[test]
    fn test_non_retryable_errors() {
        assert!(!PlatformError::invalid_input("bad header").is_retryable());
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!PlatformError::from(parse).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = PlatformError::unavailable("localhost:8080");
        assert_eq!(err.to_string(), "Service unavailable: localhost:8080");

        let err = PlatformError::invalid_input("header name");
        assert_eq!(err.to_string(), "Invalid input: header name");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_retryability_follows_kind(msg in "[a-zA-Z0-9 :]{0,40}") {
            prop_assert!(PlatformError::unavailable(msg.clone()).is_retryable());
            prop_assert!(PlatformError::timeout(msg.clone()).is_retryable());
            prop_assert!(!PlatformError::invalid_input(msg).is_retryable());
        }
    }
}
