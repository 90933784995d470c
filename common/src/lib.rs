//! Cross-cutting concerns shared by the pact verification crates.
//!
//! This crate provides:
//! - A transport-level error type with retryability classification
//! - HTTP client configuration and building for provider replay
//! - `tracing` subscriber initialisation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod logging;

pub use error::PlatformError;
pub use http::{HttpConfig, build_http_client};
pub use logging::{LoggingConfig, init_logging};
