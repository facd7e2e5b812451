//! Reports and reporting sinks
//!
//! Verification itself never panics; it returns reports. A sink is the
//! boundary where failures turn into whatever the surrounding test framework
//! understands. `AssertingSink` panics, which is what `#[test]` functions want.

use crate::error::HarnessError;
use crate::exception::{ExceptionReport, ExceptionSummary};
use crate::verifier::{OutcomeSummary, PropertyFailure, VerificationOutcome};
use serde::Serialize;

/// Outcomes for the accessor pairs of one type.
#[derive(Debug, Clone)]
pub struct ClassReport {
    pub type_name: String,
    pub outcomes: Vec<VerificationOutcome>,
    /// Set when the type could not be verified at all
    pub error: Option<HarnessError>,
}

impl ClassReport {
    pub fn new(type_name: impl Into<String>, outcomes: Vec<VerificationOutcome>) -> Self {
        Self {
            type_name: type_name.into(),
            outcomes,
            error: None,
        }
    }

    pub fn unverified(type_name: impl Into<String>, error: HarnessError) -> Self {
        Self {
            type_name: type_name.into(),
            outcomes: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.outcomes.iter().all(VerificationOutcome::is_pass)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PropertyFailure> + '_ {
        self.outcomes.iter().filter_map(VerificationOutcome::failure)
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count() + usize::from(self.error.is_some())
    }

    pub fn summary(&self) -> ClassSummary {
        ClassSummary {
            type_name: self.type_name.clone(),
            outcomes: self.outcomes.iter().map(OutcomeSummary::from).collect(),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }

    pub fn deliver(&self, sink: &mut dyn ReportSink) {
        if let Some(error) = &self.error {
            sink.type_failed(&self.type_name, error);
        }
        for failure in self.failures() {
            sink.property_failed(failure);
        }
    }

    pub fn assert_passed(&self) {
        let mut sink = AssertingSink::default();
        self.deliver(&mut sink);
        sink.finish();
    }
}

/// Reports for every type of a batch, in verification order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub classes: Vec<ClassReport>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.classes.iter().all(ClassReport::is_success)
    }

    pub fn failure_count(&self) -> usize {
        self.classes.iter().map(ClassReport::failure_count).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PropertyFailure> + '_ {
        self.classes.iter().flat_map(ClassReport::failures)
    }

    pub fn class(&self, type_name: &str) -> Option<&ClassReport> {
        self.classes.iter().find(|c| c.type_name == type_name)
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            passed: self.is_success(),
            failures: self.failure_count(),
            classes: self.classes.iter().map(ClassReport::summary).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, HarnessError> {
        Ok(serde_json::to_string_pretty(&self.summary())?)
    }

    pub fn deliver(&self, sink: &mut dyn ReportSink) {
        for class in &self.classes {
            class.deliver(sink);
        }
    }

    /// Panic with every failure message unless the whole batch passed.
    pub fn assert_passed(&self) {
        let mut sink = AssertingSink::default();
        self.deliver(&mut sink);
        sink.finish();
    }
}

impl ExceptionReport {
    pub fn deliver(&self, sink: &mut dyn ReportSink) {
        for outcome in self.failures() {
            if let Some(error) = outcome.error() {
                sink.contract_failed(&self.exception, outcome.signature(), error);
            }
        }
    }

    pub fn assert_passed(&self) {
        let mut sink = AssertingSink::default();
        self.deliver(&mut sink);
        sink.finish();
    }

    pub fn to_json(&self) -> Result<String, HarnessError> {
        let summary: ExceptionSummary = self.summary();
        Ok(serde_json::to_string_pretty(&summary)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSummary {
    pub type_name: String,
    pub outcomes: Vec<OutcomeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub passed: bool,
    pub failures: usize,
    pub classes: Vec<ClassSummary>,
}

/// Receives every failure of a report.
pub trait ReportSink {
    /// The type as a whole could not be verified.
    fn type_failed(&mut self, type_name: &str, error: &HarnessError);

    fn property_failed(&mut self, failure: &PropertyFailure);

    fn contract_failed(&mut self, exception: &str, signature: &str, error: &HarnessError);
}

fn type_message(type_name: &str, error: &HarnessError) -> String {
    format!("{} was not verified: {}", type_name, error)
}

fn property_message(failure: &PropertyFailure) -> String {
    match &failure.error {
        HarnessError::AssertionMismatch { .. } => failure.error.to_string(),
        error => format!(
            "an error was raised while testing {}.{}: {}",
            failure.owner, failure.property, error
        ),
    }
}

fn contract_message(exception: &str, signature: &str, error: &HarnessError) -> String {
    match error {
        HarnessError::ConstructorInvocation { .. } => error.to_string(),
        other => format!("{} via `{}`: {}", exception, signature, other),
    }
}

/// Keeps failure messages in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    pub messages: Vec<String>,
}

impl ReportSink for CollectingSink {
    fn type_failed(&mut self, type_name: &str, error: &HarnessError) {
        self.messages.push(type_message(type_name, error));
    }

    fn property_failed(&mut self, failure: &PropertyFailure) {
        self.messages.push(property_message(failure));
    }

    fn contract_failed(&mut self, exception: &str, signature: &str, error: &HarnessError) {
        self.messages.push(contract_message(exception, signature, error));
    }
}

/// Forwards failures to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl ReportSink for LoggingSink {
    fn type_failed(&mut self, type_name: &str, error: &HarnessError) {
        log::error!("{}", type_message(type_name, error));
    }

    fn property_failed(&mut self, failure: &PropertyFailure) {
        log::error!("{}", property_message(failure));
    }

    fn contract_failed(&mut self, exception: &str, signature: &str, error: &HarnessError) {
        log::error!("{}", contract_message(exception, signature, error));
    }
}

/// Collects failures and panics in `finish` if there were any.
#[derive(Debug, Default)]
pub struct AssertingSink {
    collected: CollectingSink,
}

impl AssertingSink {
    pub fn finish(self) {
        let messages = self.collected.messages;
        if !messages.is_empty() {
            panic!(
                "{} verification failure(s):\n  {}",
                messages.len(),
                messages.join("\n  ")
            );
        }
    }
}

impl ReportSink for AssertingSink {
    fn type_failed(&mut self, type_name: &str, error: &HarnessError) {
        self.collected.type_failed(type_name, error);
    }

    fn property_failed(&mut self, failure: &PropertyFailure) {
        self.collected.property_failed(failure);
    }

    fn contract_failed(&mut self, exception: &str, signature: &str, error: &HarnessError) {
        self.collected.contract_failed(exception, signature, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvocationError;

    fn mismatch() -> VerificationOutcome {
        VerificationOutcome::Fail(PropertyFailure {
            owner: "Profile".into(),
            property: "age".into(),
            expected: Some("32".into()),
            actual: Some("1".into()),
            error: HarnessError::AssertionMismatch {
                owner: "Profile".into(),
                property: "age".into(),
                expected: "32".into(),
                actual: "1".into(),
            },
        })
    }

    fn panicked() -> VerificationOutcome {
        VerificationOutcome::Fail(PropertyFailure {
            owner: "Profile".into(),
            property: "name".into(),
            expected: Some("\"sample-string\"".into()),
            actual: None,
            error: HarnessError::Invocation {
                owner: "Profile".into(),
                member: "getter for `name`".into(),
                source: InvocationError::Panicked("boom".into()),
            },
        })
    }

    fn batch() -> BatchReport {
        BatchReport {
            classes: vec![
                ClassReport::new("Profile", vec![mismatch(), panicked()]),
                ClassReport::new("Tag", vec![VerificationOutcome::Pass { property: "label".into() }]),
            ],
        }
    }

    #[test]
    fn test_counts_and_lookup() {
        let report = batch();
        assert!(!report.is_success());
        assert_eq!(report.failure_count(), 2);
        assert!(report.class("Tag").unwrap().is_success());
        assert!(report.class("Missing").is_none());
    }

    #[test]
    fn test_collecting_sink_messages_name_property() {
        let mut sink = CollectingSink::default();
        batch().deliver(&mut sink);

        assert_eq!(sink.messages.len(), 2);
        assert!(sink.messages[0].contains("`age`"));
        assert!(sink.messages[0].contains("expected 32, got 1"));
        assert!(sink.messages[1].starts_with("an error was raised while testing Profile.name"));
    }

    #[test]
    #[should_panic(expected = "2 verification failure(s)")]
    fn test_asserting_sink_panics_on_failure() {
        batch().assert_passed();
    }

    #[test]
    fn test_asserting_sink_is_silent_on_success() {
        BatchReport::default().assert_passed();
    }

    #[test]
    fn test_summary_json() {
        let json = batch().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["passed"], false);
        assert_eq!(value["failures"], 2);
        assert_eq!(value["classes"][1]["outcomes"][0]["property"], "label");
    }

    #[test]
    fn test_unverified_type_counts_as_failure() {
        let report = BatchReport {
            classes: vec![ClassReport::unverified(
                "Ghost",
                HarnessError::NotRegistered {
                    type_name: "Ghost".into(),
                    role: "a data type",
                },
            )],
        };
        assert!(!report.is_success());
        assert_eq!(report.failure_count(), 1);

        let mut sink = CollectingSink::default();
        report.deliver(&mut sink);
        assert_eq!(
            sink.messages,
            vec!["Ghost was not verified: `Ghost` is not registered as a data type".to_string()]
        );

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["classes"][0]["error"], "`Ghost` is not registered as a data type");
    }
}
