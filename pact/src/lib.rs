//! Provider-side verification of consumer-driven Pact contracts.
//!
//! A [`PactVerifier`] loads a contract, places the provider into each
//! interaction's provider state, replays the recorded request, and compares
//! the live response to the recorded expectation with subset semantics.
//! Failures of all interactions are aggregated into one report.
//!
//! ```no_run
//! use pact_verifier::{PactVerifier, ReqwestProviderClient, state_action};
//! use pact_common::HttpConfig;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ReqwestProviderClient::from_config("http://localhost:8080", &HttpConfig::default())?;
//! let mut verifier = PactVerifier::new()?;
//! verifier
//!     .bind_consumer("order-web", None, None)?
//!     .add_state("order 1 exists", Some(state_action(|| Ok(()))), None)?
//!     .set_provider("order-api", Arc::new(client))?
//!     .set_contract_location("pacts/order-web-order-api.json")?;
//! verifier.verify(None, None).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod body;
pub mod client;
pub mod contract;
pub mod error;
pub mod matching;
pub mod reporter;
pub mod rules;
pub mod settings;
pub mod source;
pub mod states;
pub mod verifier;

pub use body::{BodyError, Encoding, HttpBody, HttpBodyContent};
pub use client::{ProviderClient, ProviderRequest, ProviderResponse, ReqwestProviderClient};
pub use contract::{Contract, ContractMetadata, Interaction, PactSpecification, Participant, Query, Request, Response};
pub use error::{InteractionError, PactError, PactResult};
pub use matching::{ComparisonError, ComparisonResult, Mismatch, compare_response};
pub use reporter::{FailedInteraction, Failure, Reporter, VerificationReport};
pub use rules::{BodyPath, MatchingRule, MatchingRules, RulePattern};
pub use settings::VerifierSettings;
pub use source::{ContractSource, FileContractSource, UriContractSource};
pub use states::{ProviderState, ProviderStates, StateAction, state_action};
pub use verifier::{PactVerifier, VerifierState};
