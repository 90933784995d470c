//! Provider state registry.
//!
//! Holds the consumer-level and per-state setup/teardown callbacks of one
//! verifier. A registry is locked to a single consumer for its lifetime.
//! Registering a state name twice replaces the earlier entry in place
//! (last write wins).

use crate::error::{InteractionError, PactError, PactResult};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A setup or teardown callback.
pub type StateAction = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Wrap a closure as a [`StateAction`].
///
/// ```
/// use pact_verifier::state_action;
///
/// let setup = state_action(|| Ok(()));
/// assert!(setup().is_ok());
/// ```
pub fn state_action<F>(action: F) -> StateAction
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(action)
}

/// A named precondition with its callbacks.
#[derive(Clone)]
pub struct ProviderState {
    name: String,
    setup: Option<StateAction>,
    teardown: Option<StateAction>,
}

impl ProviderState {
    /// State name as recorded in contracts.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderState")
            .field("name", &self.name)
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}

/// Registry of provider states for one consumer.
#[derive(Clone, Default)]
pub struct ProviderStates {
    consumer: Option<String>,
    setup: Option<StateAction>,
    teardown: Option<StateAction>,
    states: Vec<ProviderState>,
}

impl fmt::Debug for ProviderStates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderStates")
            .field("consumer", &self.consumer)
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .field("states", &self.states)
            .finish()
    }
}

impl ProviderStates {
    /// Create an empty, unbound registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound consumer, if any.
    #[must_use]
    pub fn consumer(&self) -> Option<&str> {
        self.consumer.as_deref()
    }

    /// Bind the registry to a consumer.
    ///
    /// Rebinding the same consumer keeps registered states; supplied
    /// callbacks replace the previous consumer-level ones.
    ///
    /// # Errors
    ///
    /// Fails if the name is empty or a different consumer is already bound.
    pub fn bind_consumer(
        &mut self,
        consumer: &str,
        setup: Option<StateAction>,
        teardown: Option<StateAction>,
    ) -> PactResult<()> {
        if consumer.is_empty() {
            return Err(PactError::configuration("Please supply a non empty consumer name"));
        }
        if let Some(bound) = self.consumer.as_deref().filter(|bound| *bound != consumer) {
            return Err(PactError::configuration(format!(
                "Verifier is already bound to consumer '{bound}', cannot bind '{consumer}'"
            )));
        }

        self.consumer = Some(consumer.to_string());
        if setup.is_some() {
            self.setup = setup;
        }
        if teardown.is_some() {
            self.teardown = teardown;
        }
        Ok(())
    }

    /// Register a named state.
    ///
    /// # Errors
    ///
    /// Fails if no consumer is bound yet or the name is empty.
    pub fn add_state(
        &mut self,
        name: &str,
        setup: Option<StateAction>,
        teardown: Option<StateAction>,
    ) -> PactResult<()> {
        if self.consumer.is_none() {
            return Err(PactError::configuration(
                "Please initialise the provider states by binding a consumer first",
            ));
        }
        if name.is_empty() {
            return Err(PactError::configuration("Please supply a non empty provider state"));
        }

        let state = ProviderState {
            name: name.to_string(),
            setup,
            teardown,
        };
        match self.states.iter_mut().find(|s| s.name == name) {
            Some(existing) => *existing = state,
            None => self.states.push(state),
        }
        Ok(())
    }

    /// Look up a state by exact name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ProviderState> {
        self.states.iter().find(|s| s.name == name)
    }

    /// Registered states, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ProviderState> {
        self.states.iter()
    }

    /// Number of registered states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no state is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Run consumer-level setup, then the setup of the named state.
    ///
    /// An unregistered state is not an error; the interaction simply runs
    /// without a precondition. When the state setup fails after the consumer
    /// setup succeeded, the consumer teardown runs before returning.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::StateSetup`] for the first failing callback.
    pub fn set_up(&self, provider_state: Option<&str>) -> Result<(), InteractionError> {
        if let Some(setup) = &self.setup {
            run(setup).map_err(|reason| InteractionError::StateSetup {
                state: self.consumer_label(),
                reason,
            })?;
        }

        let result = self.set_up_state(provider_state);
        if let (Err(_), Some(teardown)) = (&result, &self.teardown) {
            if let Err(reason) = run(teardown) {
                warn!(consumer = %self.consumer_label(), %reason, "Consumer teardown failed after setup failure");
            }
        }
        result
    }

    fn set_up_state(&self, provider_state: Option<&str>) -> Result<(), InteractionError> {
        let Some(name) = provider_state else {
            return Ok(());
        };
        match self.find(name) {
            Some(ProviderState { setup: Some(setup), .. }) => {
                debug!(state = name, "Setting up provider state");
                run(setup).map_err(|reason| InteractionError::StateSetup {
                    state: name.to_string(),
                    reason,
                })
            }
            Some(_) => Ok(()),
            None => {
                debug!(state = name, "No provider state registered, running without setup");
                Ok(())
            }
        }
    }

    /// Run the teardown of the named state, then consumer-level teardown.
    ///
    /// Both run even if the first fails; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::StateTeardown`] for the first failing callback.
    pub fn tear_down(&self, provider_state: Option<&str>) -> Result<(), InteractionError> {
        let state_result = match provider_state.and_then(|name| self.find(name)) {
            Some(ProviderState {
                name,
                teardown: Some(teardown),
                ..
            }) => {
                debug!(state = %name, "Tearing down provider state");
                run(teardown).map_err(|reason| InteractionError::StateTeardown {
                    state: name.clone(),
                    reason,
                })
            }
            _ => Ok(()),
        };

        let consumer_result = match &self.teardown {
            Some(teardown) => run(teardown).map_err(|reason| InteractionError::StateTeardown {
                state: self.consumer_label(),
                reason,
            }),
            None => Ok(()),
        };

        state_result.and(consumer_result)
    }

    fn consumer_label(&self) -> String {
        format!("consumer {}", self.consumer.as_deref().unwrap_or_default())
    }
}

fn run(action: &StateAction) -> Result<(), String> {
    action().map_err(|e| format!("{e:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> StateAction) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = Arc::clone(&log);
        let make = move |label: &str| {
            let log = Arc::clone(&handle);
            let label = label.to_string();
            state_action(move || {
                log.lock().unwrap().push(label.clone());
                Ok(())
            })
        };
        (log, make)
    }

    #[test]
    fn test_bind_consumer_rejects_empty_name() {
        let mut states = ProviderStates::new();
        assert!(matches!(states.bind_consumer("", None, None), Err(PactError::Configuration(_))));
    }

    #[test]
    fn test_bind_consumer_rejects_different_consumer() {
        let mut states = ProviderStates::new();
        states.bind_consumer("order-web", None, None).unwrap();
        assert!(states.bind_consumer("order-web", None, None).is_ok());
        assert!(matches!(
            states.bind_consumer("billing-web", None, None),
            Err(PactError::Configuration(_))
        ));
        assert_eq!(states.consumer(), Some("order-web"));
    }

    #[test]
    fn test_add_state_requires_consumer() {
        let mut states = ProviderStates::new();
        assert!(matches!(
            states.add_state("order 1 exists", None, None),
            Err(PactError::Configuration(_))
        ));
    }

    #[test]
    fn test_add_state_rejects_empty_name() {
        let mut states = ProviderStates::new();
        states.bind_consumer("order-web", None, None).unwrap();
        assert!(matches!(states.add_state("", None, None), Err(PactError::Configuration(_))));
    }

    #[test]
    fn test_duplicate_state_last_write_wins() {
        let (log, make) = recorder();
        let mut states = ProviderStates::new();
        states.bind_consumer("order-web", None, None).unwrap();
        states.add_state("a", Some(make("a-first")), None).unwrap();
        states.add_state("b", Some(make("b")), None).unwrap();
        states.add_state("a", Some(make("a-second")), None).unwrap();

        assert_eq!(states.len(), 2);
        assert_eq!(states.iter().map(ProviderState::name).collect::<Vec<_>>(), ["a", "b"]);

        states.set_up(Some("a")).unwrap();
        assert_eq!(*log.lock().unwrap(), ["a-second"]);
    }

    #[test]
    fn test_callbacks_run_in_order() {
        let (log, make) = recorder();
        let mut states = ProviderStates::new();
        states
            .bind_consumer("order-web", Some(make("consumer-setup")), Some(make("consumer-teardown")))
            .unwrap();
        states
            .add_state("order 1 exists", Some(make("state-setup")), Some(make("state-teardown")))
            .unwrap();

        states.set_up(Some("order 1 exists")).unwrap();
        states.tear_down(Some("order 1 exists")).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            ["consumer-setup", "state-setup", "state-teardown", "consumer-teardown"]
        );
    }

    #[test]
    fn test_unknown_state_is_not_an_error() {
        let mut states = ProviderStates::new();
        states.bind_consumer("order-web", None, None).unwrap();
        assert!(states.set_up(Some("nobody registered this")).is_ok());
        assert!(states.tear_down(Some("nobody registered this")).is_ok());
    }

    #[test]
    fn test_setup_failure_names_state() {
        let mut states = ProviderStates::new();
        states.bind_consumer("order-web", None, None).unwrap();
        states
            .add_state("order 1 exists", Some(state_action(|| anyhow::bail!("database down"))), None)
            .unwrap();

        let err = states.set_up(Some("order 1 exists")).unwrap_err();
        match err {
            InteractionError::StateSetup { state, reason } => {
                assert_eq!(state, "order 1 exists");
                assert_eq!(reason, "database down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_teardown_runs_consumer_teardown_after_state_failure() {
        let (log, make) = recorder();
        let mut states = ProviderStates::new();
        states.bind_consumer("order-web", None, Some(make("consumer-teardown"))).unwrap();
        states
            .add_state("s", None, Some(state_action(|| anyhow::bail!("cleanup failed"))))
            .unwrap();

        let err = states.tear_down(Some("s")).unwrap_err();
        assert!(matches!(err, InteractionError::StateTeardown { .. }));
        assert_eq!(*log.lock().unwrap(), ["consumer-teardown"]);
    }

    #[test]
    fn test_state_setup_failure_unwinds_consumer_setup() {
        let (log, make) = recorder();
        let mut states = ProviderStates::new();
        states
            .bind_consumer("order-web", Some(make("consumer-setup")), Some(make("consumer-teardown")))
            .unwrap();
        states
            .add_state(
                "order 1 exists",
                Some(state_action(|| anyhow::bail!("database down"))),
                Some(make("state-teardown")),
            )
            .unwrap();

        let err = states.set_up(Some("order 1 exists")).unwrap_err();
        assert!(matches!(err, InteractionError::StateSetup { ref state, .. } if state == "order 1 exists"));
        assert_eq!(*log.lock().unwrap(), ["consumer-setup", "consumer-teardown"]);
    }

    #[test]
    fn test_consumer_setup_failure_skips_consumer_teardown() {
        let (log, make) = recorder();
        let mut states = ProviderStates::new();
        states
            .bind_consumer(
                "order-web",
                Some(state_action(|| anyhow::bail!("seed failed"))),
                Some(make("consumer-teardown")),
            )
            .unwrap();

        let err = states.set_up(None).unwrap_err();
        assert!(matches!(err, InteractionError::StateSetup { ref state, .. } if state == "consumer order-web"));
        assert!(log.lock().unwrap().is_empty());
    }
}
