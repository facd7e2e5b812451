//! Exception-contract verification
//!
//! Checks that error types honour the usual construction conventions: a
//! constructor that takes a message must render exactly that message, and a
//! constructor that takes a cause must expose exactly that cause through
//! `Error::source`. Every registered constructor of the error type is
//! exercised with supplied or synthesized arguments.

use crate::error::{HarnessError, InvocationError};
use crate::introspect::{BoxedError, ExceptionConstructor, ExceptionIntrospector};
use crate::synthesis::ValueSynthesizer;
use crate::value::{render, BoxedValue, TypeDescriptor};
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// A shareable error value used as a constructor's cause argument.
///
/// Equality is identity, so a cause survives the round trip through an
/// error type only if that type hands back the very error it was given.
#[derive(Clone)]
pub struct Cause {
    inner: Arc<dyn Error + Send + Sync + 'static>,
}

impl Cause {
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// A cause carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(MessageError(message.into()))
    }

    pub fn as_error(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.inner
    }

    fn address(&self) -> *const () {
        Arc::as_ptr(&self.inner) as *const ()
    }

    /// Whether `source` is this cause, either the wrapped error itself or a
    /// `Cause` sharing it.
    pub fn is_same(&self, source: &(dyn Error + 'static)) -> bool {
        if let Some(other) = source.downcast_ref::<Cause>() {
            return other.address() == self.address();
        }
        source as *const dyn Error as *const () == self.address()
    }
}

impl PartialEq for Cause {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for Cause {}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cause").field(&self.inner.to_string()).finish()
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl Error for Cause {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source()
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for MessageError {}

/// One error type under test, with optional explicit constructor arguments.
#[derive(Debug, Clone)]
pub struct ExceptionContractCase {
    pub exception_type: TypeDescriptor,
    /// Positional arguments; `None` entries are synthesized
    pub supplied_args: Vec<Option<BoxedValue>>,
}

impl ExceptionContractCase {
    pub fn new(exception_type: TypeDescriptor) -> Self {
        Self {
            exception_type,
            supplied_args: Vec::new(),
        }
    }

    pub fn with_args(exception_type: TypeDescriptor, supplied_args: Vec<Option<BoxedValue>>) -> Self {
        Self {
            exception_type,
            supplied_args,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ContractOutcome {
    Pass { signature: String },
    Fail { signature: String, error: HarnessError },
}

impl ContractOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, ContractOutcome::Pass { .. })
    }

    pub fn signature(&self) -> &str {
        match self {
            ContractOutcome::Pass { signature } | ContractOutcome::Fail { signature, .. } => signature,
        }
    }

    pub fn error(&self) -> Option<&HarnessError> {
        match self {
            ContractOutcome::Pass { .. } => None,
            ContractOutcome::Fail { error, .. } => Some(error),
        }
    }
}

/// Every constructor outcome for one error type.
#[derive(Debug, Clone)]
pub struct ExceptionReport {
    pub exception: String,
    pub outcomes: Vec<ContractOutcome>,
}

impl ExceptionReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ContractOutcome::is_pass)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ContractOutcome> + '_ {
        self.outcomes.iter().filter(|o| !o.is_pass())
    }

    pub fn summary(&self) -> ExceptionSummary {
        ExceptionSummary {
            exception: self.exception.clone(),
            constructors: self.outcomes.len(),
            failures: self
                .failures()
                .filter_map(|o| o.error().map(|e| e.to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionSummary {
    pub exception: String,
    pub constructors: usize,
    pub failures: Vec<String>,
}

pub struct ExceptionVerifier<'a> {
    synthesizer: ValueSynthesizer<'a>,
    exceptions: &'a dyn ExceptionIntrospector,
    log_passes: bool,
}

impl<'a> ExceptionVerifier<'a> {
    pub fn new(
        synthesizer: ValueSynthesizer<'a>,
        exceptions: &'a dyn ExceptionIntrospector,
        log_passes: bool,
    ) -> Self {
        Self {
            synthesizer,
            exceptions,
            log_passes,
        }
    }

    /// Verify every constructor of one error type with synthesized arguments.
    pub fn verify_exception(
        &self,
        exception_type: Option<TypeDescriptor>,
    ) -> Result<ExceptionReport, HarnessError> {
        let exception_type = self.registered(exception_type)?;
        Ok(self.verify_case(&ExceptionContractCase::new(exception_type)))
    }

    /// Verify `base` (if it is itself an error type) and every error type
    /// nested in it.
    pub fn verify_exceptions(
        &self,
        base: Option<TypeDescriptor>,
    ) -> Result<Vec<ExceptionReport>, HarnessError> {
        let base = required(base, "base type")?;

        let mut targets = Vec::new();
        if self.exceptions.is_exception(&base) {
            targets.push(base);
        }
        targets.extend(self.exceptions.nested_exceptions(&base));
        if targets.is_empty() {
            return Err(HarnessError::NotRegistered {
                type_name: base.simple_name(),
                role: "an error type or a container of error types",
            });
        }

        Ok(targets
            .iter()
            .map(|ty| self.verify_case(&ExceptionContractCase::new(*ty)))
            .collect())
    }

    /// Verify one error type, preferring `explicit_args` over synthesis.
    pub fn verify_exception_with_args(
        &self,
        exception_type: Option<TypeDescriptor>,
        explicit_args: Vec<Option<BoxedValue>>,
    ) -> Result<ExceptionReport, HarnessError> {
        let exception_type = self.registered(exception_type)?;
        Ok(self.verify_case(&ExceptionContractCase::with_args(exception_type, explicit_args)))
    }

    fn registered(&self, exception_type: Option<TypeDescriptor>) -> Result<TypeDescriptor, HarnessError> {
        let exception_type = required(exception_type, "exception type")?;
        if self.exceptions.is_exception(&exception_type) {
            Ok(exception_type)
        } else {
            Err(HarnessError::NotRegistered {
                type_name: exception_type.simple_name(),
                role: "an error type",
            })
        }
    }

    pub fn verify_case(&self, case: &ExceptionContractCase) -> ExceptionReport {
        let constructors = self.exceptions.exception_constructors(&case.exception_type);
        if constructors.is_empty() {
            log::warn!("{} has no registered constructors", case.exception_type);
        }

        let outcomes = constructors
            .iter()
            .map(|constructor| {
                let signature = constructor.signature();
                match self.check_constructor(constructor, &case.supplied_args) {
                    Ok(()) => {
                        if self.log_passes {
                            log::debug!("{} honours its contract", signature);
                        }
                        ContractOutcome::Pass { signature }
                    }
                    Err(error) => {
                        log::error!("{}", error);
                        ContractOutcome::Fail { signature, error }
                    }
                }
            })
            .collect();

        ExceptionReport {
            exception: case.exception_type.simple_name(),
            outcomes,
        }
    }

    fn check_constructor(
        &self,
        constructor: &ExceptionConstructor,
        supplied: &[Option<BoxedValue>],
    ) -> Result<(), HarnessError> {
        let signature = constructor.signature();
        let args = self.arguments_for(constructor, supplied)?;

        let message = constructor
            .params
            .iter()
            .position(|p| p.is::<String>() || p.is::<&'static str>())
            .map(|index| message_text(&args[index]));
        let cause = constructor
            .params
            .iter()
            .position(|p| p.is::<Cause>())
            .and_then(|index| args[index].downcast_ref::<Cause>().cloned());

        let error = constructor.invoke(args).map_err(|source| {
            let reason = match source {
                InvocationError::Panicked(text) => format!("constructor panicked: {}", text),
                other => format!("constructor failed: {}", other),
            };
            HarnessError::ConstructorInvocation {
                signature: signature.clone(),
                reason,
            }
        })?;

        check_message(&signature, &error, message.as_deref())?;
        check_cause(&signature, &error, cause.as_ref())
    }

    fn arguments_for(
        &self,
        constructor: &ExceptionConstructor,
        supplied: &[Option<BoxedValue>],
    ) -> Result<Vec<BoxedValue>, HarnessError> {
        let mut used = vec![false; supplied.len()];
        let mut args = Vec::with_capacity(constructor.params.len());

        for (position, param) in constructor.params.iter().enumerate() {
            let fits = |index: usize| {
                supplied[index]
                    .as_ref()
                    .map_or(false, |value| (**value).value_type_id() == param.id())
            };

            let chosen = if position < supplied.len() && !used[position] && fits(position) {
                Some(position)
            } else {
                (0..supplied.len()).find(|&index| !used[index] && fits(index))
            };

            match chosen.and_then(|index| supplied[index].as_ref().map(|value| (index, value))) {
                Some((index, value)) => {
                    used[index] = true;
                    args.push(value.clone());
                }
                None => {
                    let synthesized = self.synthesizer.synthesize(param).map_err(|source| {
                        HarnessError::ConstructorInvocation {
                            signature: constructor.signature(),
                            reason: format!("argument {}: {}", position, source),
                        }
                    })?;
                    args.push(synthesized.value);
                }
            }
        }
        Ok(args)
    }
}

fn required(ty: Option<TypeDescriptor>, what: &str) -> Result<TypeDescriptor, HarnessError> {
    ty.ok_or_else(|| HarnessError::InvalidArgument(format!("input {} is missing", what)))
}

fn message_text(value: &BoxedValue) -> String {
    if let Some(text) = value.downcast_ref::<String>() {
        text.clone()
    } else if let Some(text) = value.downcast_ref::<&'static str>() {
        text.to_string()
    } else {
        render(&**value)
    }
}

fn check_message(signature: &str, error: &BoxedError, expected: Option<&str>) -> Result<(), HarnessError> {
    let expected = match expected {
        Some(expected) => expected,
        None => return Ok(()),
    };
    let actual = error.to_string();
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::ConstructorInvocation {
            signature: signature.to_string(),
            reason: format!("message is {:?}, expected {:?}", actual, expected),
        })
    }
}

fn check_cause(signature: &str, error: &BoxedError, expected: Option<&Cause>) -> Result<(), HarnessError> {
    let expected = match expected {
        Some(expected) => expected,
        None => return Ok(()),
    };
    match error.source() {
        Some(source) if expected.is_same(source) => Ok(()),
        Some(source) => Err(HarnessError::ConstructorInvocation {
            signature: signature.to_string(),
            reason: format!("cause is {:?}, expected {:?}", source.to_string(), expected.to_string()),
        }),
        None => Err(HarnessError::ConstructorInvocation {
            signature: signature.to_string(),
            reason: format!("cause is missing, expected {:?}", expected.to_string()),
        }),
    }
}
