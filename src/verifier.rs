//! Property verification
//!
//! For every accessor pair of a type: build a genuine instance of the owner,
//! synthesize a value for the property, push it through the setter, read it
//! back through the getter and compare by value. Anything that goes wrong on
//! the way, including a panic inside user code, becomes a `Fail` outcome for
//! that property alone.

use crate::config::{FailureMode, HarnessConfig};
use crate::error::HarnessError;
use crate::introspect::AccessorPair;
use crate::synthesis::ValueSynthesizer;
use crate::value::{render, values_equal, TypeDescriptor};
use serde::Serialize;

/// Why one property did not round-trip.
#[derive(Debug, Clone)]
pub struct PropertyFailure {
    pub owner: String,
    pub property: String,
    /// Rendering of the value handed to the setter, when one was synthesized
    pub expected: Option<String>,
    /// Rendering of the getter's result, when the getter returned
    pub actual: Option<String>,
    pub error: HarnessError,
}

impl PropertyFailure {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    Pass { property: String },
    Fail(PropertyFailure),
}

impl VerificationOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, VerificationOutcome::Pass { .. })
    }

    pub fn property(&self) -> &str {
        match self {
            VerificationOutcome::Pass { property } => property,
            VerificationOutcome::Fail(failure) => &failure.property,
        }
    }

    pub fn failure(&self) -> Option<&PropertyFailure> {
        match self {
            VerificationOutcome::Pass { .. } => None,
            VerificationOutcome::Fail(failure) => Some(failure),
        }
    }
}

/// Serializable view of one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub property: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&VerificationOutcome> for OutcomeSummary {
    fn from(outcome: &VerificationOutcome) -> Self {
        Self {
            property: outcome.property().to_string(),
            passed: outcome.is_pass(),
            message: outcome.failure().map(PropertyFailure::message),
        }
    }
}

pub struct PropertyVerifier<'a> {
    synthesizer: ValueSynthesizer<'a>,
    failure_mode: FailureMode,
    log_passes: bool,
}

impl<'a> PropertyVerifier<'a> {
    pub fn new(synthesizer: ValueSynthesizer<'a>, config: &HarnessConfig) -> Self {
        Self {
            synthesizer,
            failure_mode: config.failure_mode,
            log_passes: config.log_passes,
        }
    }

    pub fn synthesizer(&self) -> &ValueSynthesizer<'a> {
        &self.synthesizer
    }

    /// Verify every accessor pair of `ty` not named in `excluded`.
    ///
    /// With `FailureMode::FailFast` the returned outcomes end at the first
    /// failure; properties after it are not reported. A type the
    /// introspector does not know is `NotRegistered`.
    pub fn verify(
        &self,
        ty: &TypeDescriptor,
        excluded: &[&str],
    ) -> Result<Vec<VerificationOutcome>, HarnessError> {
        let introspector = self.synthesizer.introspector();
        if introspector.describe(ty).is_none() {
            return Err(HarnessError::NotRegistered {
                type_name: ty.simple_name(),
                role: "a data type",
            });
        }

        let pairs = introspector.find_accessor_pairs(ty, excluded);
        if pairs.is_empty() {
            log::warn!("{} has no accessor pairs to verify", ty);
        }

        let mut outcomes = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            let outcome = self.verify_pair(pair);
            let failed = !outcome.is_pass();
            outcomes.push(outcome);
            if failed && self.failure_mode == FailureMode::FailFast {
                log::warn!(
                    "stopping {} after `{}` failed; {} properties not verified",
                    ty,
                    pair.property_name,
                    pairs.len() - outcomes.len()
                );
                break;
            }
        }
        Ok(outcomes)
    }

    pub fn verify_pair(&self, pair: &AccessorPair) -> VerificationOutcome {
        match self.round_trip(pair) {
            Ok(()) => {
                if self.log_passes {
                    log::debug!("{}.{} round-trips", pair.owner, pair.property_name);
                }
                VerificationOutcome::Pass {
                    property: pair.property_name.clone(),
                }
            }
            Err(failure) => {
                log::error!(
                    "an error was raised while testing {}.{}: {}",
                    failure.owner,
                    failure.property,
                    failure.error
                );
                VerificationOutcome::Fail(failure)
            }
        }
    }

    fn round_trip(&self, pair: &AccessorPair) -> Result<(), PropertyFailure> {
        let owner = pair.owner.simple_name();
        let fail = |error: HarnessError, expected: Option<String>, actual: Option<String>| {
            PropertyFailure {
                owner: owner.clone(),
                property: pair.property_name.clone(),
                expected,
                actual,
                error,
            }
        };

        let invocation = |member: &str, source| HarnessError::Invocation {
            owner: owner.clone(),
            member: format!("{} for `{}`", member, pair.property_name),
            source,
        };

        let mut instance = self
            .synthesizer
            .construct(&pair.owner)
            .map_err(|e| fail(e.into(), None, None))?
            .value;

        // The owner's constructor may already have stored the very value the
        // synthesizer would hand out; the setter must see a different one.
        let current = pair
            .get(&*instance)
            .map_err(|source| fail(invocation("getter", source), None, None))?;
        let expected = match self
            .synthesizer
            .synthesize_distinct(&pair.declared_type, &*current)
            .map_err(|e| fail(e.into(), None, None))?
        {
            Some(synthesized) => synthesized.value,
            None => {
                let current_text = render(&*current);
                let error = HarnessError::Inconclusive {
                    owner: owner.clone(),
                    property: pair.property_name.clone(),
                    value: current_text.clone(),
                };
                return Err(fail(error, None, Some(current_text)));
            }
        };
        let expected_text = render(&*expected);

        pair.set(&mut *instance, expected.clone()).map_err(|source| {
            fail(invocation("setter", source), Some(expected_text.clone()), None)
        })?;

        let actual = pair.get(&*instance).map_err(|source| {
            fail(invocation("getter", source), Some(expected_text.clone()), None)
        })?;

        if values_equal(&*expected, &*actual) {
            Ok(())
        } else {
            let actual_text = render(&*actual);
            let error = HarnessError::AssertionMismatch {
                owner: owner.clone(),
                property: pair.property_name.clone(),
                expected: expected_text.clone(),
                actual: actual_text.clone(),
            };
            Err(fail(error, Some(expected_text), Some(actual_text)))
        }
    }
}
