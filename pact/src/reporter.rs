//! Per-interaction outcome tracking and the aggregate report.

use crate::contract::Interaction;
use crate::error::InteractionError;
use crate::matching::Mismatch;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Why an interaction failed.
#[derive(Debug)]
pub enum Failure {
    /// The response differed from the expectation
    Mismatches(Vec<Mismatch>),
    /// The interaction could not be completed
    Error(InteractionError),
}

/// A failed interaction.
#[derive(Debug)]
pub struct FailedInteraction {
    /// Interaction description
    pub description: String,
    /// Provider state, if recorded
    pub provider_state: Option<String>,
    /// Mismatches or hard error
    pub failure: Failure,
}

impl FailedInteraction {
    /// Mismatches; for a body that could not be read, those found before it.
    #[must_use]
    pub fn mismatches(&self) -> &[Mismatch] {
        match &self.failure {
            Failure::Mismatches(mismatches) => mismatches,
            Failure::Error(InteractionError::MalformedBody(err)) => &err.mismatches,
            Failure::Error(_) => &[],
        }
    }

    /// Hard error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&InteractionError> {
        match &self.failure {
            Failure::Error(err) => Some(err),
            Failure::Mismatches(_) => None,
        }
    }
}

/// Outcome of one `verify` call.
#[derive(Debug)]
pub struct VerificationReport {
    /// Consumer named in the contract
    pub consumer: String,
    /// Provider named in the contract
    pub provider: String,
    /// Interactions executed
    pub total: usize,
    /// Interactions that passed
    pub passed: usize,
    /// Failed interactions, in execution order
    pub failed: Vec<FailedInteraction>,
    /// When the report was finalized
    pub verified_at: DateTime<Utc>,
}

impl VerificationReport {
    /// Whether every executed interaction passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Verifying a pact between {} and {}: {} of {} interactions passed",
            self.consumer, self.provider, self.passed, self.total
        )?;
        for (index, failed) in self.failed.iter().enumerate() {
            write!(f, "{}) '{}'", index + 1, failed.description)?;
            if let Some(state) = &failed.provider_state {
                write!(f, " given '{state}'")?;
            }
            writeln!(f)?;
            if let Some(err) = failed.error() {
                writeln!(f, "    - Error: {err}")?;
            }
            for mismatch in failed.mismatches() {
                writeln!(f, "    - {mismatch}")?;
            }
        }
        Ok(())
    }
}

/// Accumulates outcomes while the verifier runs.
#[derive(Debug)]
pub struct Reporter {
    consumer: String,
    provider: String,
    total: usize,
    passed: usize,
    failed: Vec<FailedInteraction>,
}

impl Reporter {
    /// Start a report for a contract.
    #[must_use]
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        let consumer = consumer.into();
        let provider = provider.into();
        info!(%consumer, %provider, "Verifying pact");
        Self {
            consumer,
            provider,
            total: 0,
            passed: 0,
            failed: Vec::new(),
        }
    }

    /// An interaction is about to run.
    pub fn start(&mut self, interaction: &Interaction) {
        self.total += 1;
        debug!(
            description = %interaction.description,
            provider_state = interaction.provider_state.as_deref().unwrap_or_default(),
            "Verifying interaction"
        );
    }

    /// Record the comparison outcome; no mismatches means a pass.
    pub fn record_mismatches(&mut self, interaction: &Interaction, mismatches: Vec<Mismatch>) {
        if mismatches.is_empty() {
            self.passed += 1;
            debug!(description = %interaction.description, "Interaction passed");
            return;
        }

        warn!(
            description = %interaction.description,
            mismatches = mismatches.len(),
            "Interaction did not match"
        );
        self.push(interaction, Failure::Mismatches(mismatches));
    }

    /// Record a hard error.
    pub fn record_error(&mut self, interaction: &Interaction, err: InteractionError) {
        error!(description = %interaction.description, error = %err, "Interaction failed");
        self.push(interaction, Failure::Error(err));
    }

    /// Produce the report.
    #[must_use]
    pub fn finalize(self) -> VerificationReport {
        info!(
            consumer = %self.consumer,
            provider = %self.provider,
            total = self.total,
            passed = self.passed,
            failed = self.failed.len(),
            "Pact verification finished"
        );
        VerificationReport {
            consumer: self.consumer,
            provider: self.provider,
            total: self.total,
            passed: self.passed,
            failed: self.failed,
            verified_at: Utc::now(),
        }
    }

    fn push(&mut self, interaction: &Interaction, failure: Failure) {
        self.failed.push(FailedInteraction {
            description: interaction.description.clone(),
            provider_state: interaction.provider_state.clone(),
            failure,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyError;
    use crate::matching::ComparisonError;
    use serde_json::json;

    fn interaction(description: &str, state: Option<&str>) -> Interaction {
        serde_json::from_value(json!({
            "description": description,
            "providerState": state,
            "request": {"method": "GET", "path": "/"},
            "response": {"status": 200}
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = Reporter::new("order-web", "order-api").finalize();
        assert!(report.is_success());
        assert_eq!(report.total, 0);
        assert_eq!(report.passed, 0);
    }

    #[test]
    fn test_counts_and_order() {
        let first = interaction("first", None);
        let second = interaction("second", Some("s"));
        let third = interaction("third", None);

        let mut reporter = Reporter::new("order-web", "order-api");
        reporter.start(&first);
        reporter.record_mismatches(&first, vec![]);
        reporter.start(&second);
        reporter.record_mismatches(
            &second,
            vec![Mismatch::Status {
                expected: 200,
                actual: 500,
            }],
        );
        reporter.start(&third);
        reporter.record_error(&third, InteractionError::InvalidRequest("no method".to_string()));

        let report = reporter.finalize();
        assert!(!report.is_success());
        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].description, "second");
        assert_eq!(report.failed[0].provider_state.as_deref(), Some("s"));
        assert_eq!(report.failed[0].mismatches().len(), 1);
        assert!(report.failed[1].error().is_some());
        assert!(report.failed[1].mismatches().is_empty());
    }

    #[test]
    fn test_display_lists_every_failure() {
        let failing = interaction("order exists", Some("order 1 exists"));
        let mut reporter = Reporter::new("order-web", "order-api");
        reporter.start(&failing);
        reporter.record_mismatches(
            &failing,
            vec![Mismatch::Status {
                expected: 200,
                actual: 404,
            }],
        );

        let text = reporter.finalize().to_string();
        assert!(text.contains("0 of 1 interactions passed"));
        assert!(text.contains("1) 'order exists' given 'order 1 exists'"));
        assert!(text.contains("StatusMismatch: expected status 200 but was 404"));
    }

    #[test]
    fn test_unreadable_body_keeps_earlier_mismatches() {
        let failing = interaction("order exists", None);
        let mut reporter = Reporter::new("order-web", "order-api");
        reporter.start(&failing);
        reporter.record_error(
            &failing,
            InteractionError::MalformedBody(ComparisonError {
                source: BodyError::MalformedJson {
                    content_type: "application/json".to_string(),
                    reason: "expected value".to_string(),
                },
                mismatches: vec![Mismatch::Status {
                    expected: 200,
                    actual: 500,
                }],
            }),
        );

        let report = reporter.finalize();
        assert!(report.failed[0].error().is_some());
        assert_eq!(report.failed[0].mismatches().len(), 1);

        let text = report.to_string();
        assert!(text.contains("Error: Body declared as 'application/json' is not valid JSON"));
        assert!(text.contains("StatusMismatch: expected status 200 but was 500"));
    }
}
