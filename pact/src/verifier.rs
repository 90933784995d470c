//! Provider verification orchestrator.
//!
//! Configuration follows a fixed order, enforced as a state machine:
//! bind the consumer, set the provider, set the contract location, verify.
//! Verification may be repeated. Interactions are replayed one at a time,
//! in file order, and every selected interaction runs before the outcome is
//! decided.

use crate::client::{ProviderClient, ProviderRequest, ReqwestProviderClient};
use crate::contract::{Contract, Interaction};
use crate::error::{InteractionError, PactError, PactResult};
use crate::matching::{Mismatch, compare_response};
use crate::reporter::{Reporter, VerificationReport};
use crate::settings::VerifierSettings;
use crate::source::{ContractSource, UriContractSource};
use crate::states::{ProviderStates, StateAction};
use pact_common::HttpConfig;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Configuration progress of a verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerifierState {
    /// Nothing configured
    Unconfigured,
    /// Consumer bound, provider states may be registered
    ConsumerBound,
    /// Provider name and client set
    ProviderBound,
    /// Contract location set, ready to verify
    UriBound,
    /// At least one verification ran
    Verified,
}

/// Verifies a provider against the contract of one consumer.
pub struct PactVerifier<S = UriContractSource> {
    source: S,
    state: VerifierState,
    provider_states: ProviderStates,
    provider_name: Option<String>,
    client: Option<Arc<dyn ProviderClient>>,
    contract_location: Option<String>,
}

impl PactVerifier {
    /// Create a verifier that reads contracts from files or HTTP URLs.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client for remote contracts cannot be built.
    pub fn new() -> PactResult<Self> {
        Ok(Self::with_source(UriContractSource::from_config(&HttpConfig::default())?))
    }

    /// Create a fully configured verifier from settings.
    ///
    /// # Errors
    ///
    /// Fails on invalid settings or if an HTTP client cannot be built.
    pub fn from_settings(settings: &VerifierSettings) -> PactResult<Self> {
        let client = ReqwestProviderClient::from_config(&settings.provider_base_url, &settings.http)?;
        let mut verifier = Self::with_source(UriContractSource::from_config(&settings.http)?);
        verifier
            .bind_consumer(&settings.consumer_name, None, None)?
            .set_provider(&settings.provider_name, Arc::new(client))?
            .set_contract_location(&settings.contract_location)?;
        Ok(verifier)
    }
}

impl<S: ContractSource> PactVerifier<S> {
    /// Create a verifier reading contracts through `source`.
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            state: VerifierState::Unconfigured,
            provider_states: ProviderStates::new(),
            provider_name: None,
            client: None,
            contract_location: None,
        }
    }

    /// Current configuration state.
    #[must_use]
    pub const fn state(&self) -> VerifierState {
        self.state
    }

    /// Registered provider states.
    #[must_use]
    pub const fn provider_states(&self) -> &ProviderStates {
        &self.provider_states
    }

    /// Provider name, once set.
    #[must_use]
    pub fn provider_name(&self) -> Option<&str> {
        self.provider_name.as_deref()
    }

    /// Contract location, once set.
    #[must_use]
    pub fn contract_location(&self) -> Option<&str> {
        self.contract_location.as_deref()
    }

    /// Bind the consumer whose contract is verified, with optional callbacks
    /// run around every interaction.
    ///
    /// # Errors
    ///
    /// Fails on an empty name or if a different consumer is already bound.
    pub fn bind_consumer(
        &mut self,
        consumer: &str,
        setup: Option<StateAction>,
        teardown: Option<StateAction>,
    ) -> PactResult<&mut Self> {
        self.provider_states.bind_consumer(consumer, setup, teardown)?;
        self.advance(VerifierState::ConsumerBound);
        Ok(self)
    }

    /// Register a provider state.
    ///
    /// # Errors
    ///
    /// Fails on an empty name or if no consumer is bound.
    pub fn add_state(
        &mut self,
        state: &str,
        setup: Option<StateAction>,
        teardown: Option<StateAction>,
    ) -> PactResult<&mut Self> {
        self.provider_states.add_state(state, setup, teardown)?;
        Ok(self)
    }

    /// Set the provider name and the client used to reach it.
    ///
    /// # Errors
    ///
    /// Fails on an empty name or if no consumer is bound.
    pub fn set_provider(
        &mut self,
        provider: &str,
        client: Arc<dyn ProviderClient>,
    ) -> PactResult<&mut Self> {
        self.require(VerifierState::ConsumerBound, "binding a consumer")?;
        if provider.is_empty() {
            return Err(PactError::configuration("Please supply a non empty provider name"));
        }

        self.provider_name = Some(provider.to_string());
        self.client = Some(client);
        self.advance(VerifierState::ProviderBound);
        Ok(self)
    }

    /// Set where the contract file is read from.
    ///
    /// # Errors
    ///
    /// Fails on an empty location or if no provider is set.
    pub fn set_contract_location(&mut self, location: &str) -> PactResult<&mut Self> {
        self.require(VerifierState::ProviderBound, "setting the provider")?;
        if location.is_empty() {
            return Err(PactError::configuration("Please supply a non empty contract location"));
        }

        self.contract_location = Some(location.to_string());
        self.advance(VerifierState::UriBound);
        Ok(self)
    }

    /// Replay the contract against the provider.
    ///
    /// Interactions are optionally narrowed by exact description and
    /// provider state. Returns the report when every interaction passed.
    ///
    /// # Errors
    ///
    /// - [`PactError::Configuration`] if the verifier is not fully configured
    /// - [`PactError::FileAccess`] / [`PactError::ContractFormat`] if the
    ///   contract cannot be loaded; no interaction runs
    /// - [`PactError::VerificationFailed`] once, after all interactions ran,
    ///   if any failed
    #[instrument(skip(self), fields(location = self.contract_location.as_deref().unwrap_or_default()))]
    pub async fn verify(
        &mut self,
        description: Option<&str>,
        provider_state: Option<&str>,
    ) -> PactResult<VerificationReport> {
        self.require(VerifierState::UriBound, "setting the contract location")?;
        let (Some(client), Some(location)) = (self.client.clone(), self.contract_location.clone()) else {
            return Err(PactError::configuration(
                "Provider client and contract location must be set before verifying",
            ));
        };

        let contract = self.load_contract(&location).await?;
        if let Some(bound) = self.provider_states.consumer().filter(|c| *c != contract.consumer.name) {
            warn!(
                bound,
                contract_consumer = %contract.consumer.name,
                "Contract was written by a different consumer than the one bound"
            );
        }

        let interactions = contract.filter_by(description, provider_state);
        info!(selected = interactions.len(), total = contract.interactions.len(), "Selected interactions");

        let mut reporter = Reporter::new(&contract.consumer.name, &contract.provider.name);
        for interaction in interactions {
            reporter.start(interaction);
            match self.replay(client.as_ref(), interaction).await {
                Ok(mismatches) => reporter.record_mismatches(interaction, mismatches),
                Err(err) => reporter.record_error(interaction, err),
            }
        }

        self.state = VerifierState::Verified;
        let report = reporter.finalize();
        if report.is_success() {
            Ok(report)
        } else {
            Err(PactError::VerificationFailed(Box::new(report)))
        }
    }

    async fn load_contract(&self, location: &str) -> PactResult<Contract> {
        let text = self
            .source
            .read_text(location)
            .await
            .map_err(|source| PactError::FileAccess {
                location: location.to_string(),
                source,
            })?;

        Contract::from_json(&text).map_err(|source| PactError::ContractFormat {
            location: location.to_string(),
            source,
        })
    }

    /// Setup, send, compare, teardown. A failed setup skips the rest.
    async fn replay(
        &self,
        client: &dyn ProviderClient,
        interaction: &Interaction,
    ) -> Result<Vec<Mismatch>, InteractionError> {
        let state = interaction.provider_state.as_deref();
        self.provider_states.set_up(state)?;

        let outcome = async {
            let request = ProviderRequest::from_contract(&interaction.request)?;
            let response = client.send(&request).await?;
            Ok::<_, InteractionError>(compare_response(&interaction.response, &response)?)
        }
        .await;

        let teardown = self.provider_states.tear_down(state);
        let comparison = outcome?;
        teardown?;
        Ok(comparison.into_mismatches())
    }

    fn require(&self, at_least: VerifierState, step: &str) -> PactResult<()> {
        if self.state < at_least {
            return Err(PactError::configuration(format!(
                "Please complete configuration by {step} first (current state: {:?})",
                self.state
            )));
        }
        Ok(())
    }

    fn advance(&mut self, to: VerifierState) {
        self.state = self.state.max(to);
    }
}
