//! Error taxonomy shared by synthesis, property verification and the
//! exception-contract checks.

use crate::value::TypeDescriptor;
use std::fmt::Write;
use std::sync::Arc;
use thiserror::Error;

/// Why synthesis of a single type gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisErrorKind {
    /// Not in the primitive catalog
    UnsupportedType,
    /// Every construction strategy was exhausted
    CannotConstruct { reason: String },
    /// Nested construction went deeper than the configured limit
    RecursionLimitExceeded { limit: usize },
}

/// A synthesis failure, attributed to the type that failed and to the chain
/// of requesters that led there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.render())]
pub struct SynthesisError {
    pub kind: SynthesisErrorKind,
    /// The type that could not be produced
    pub failed: TypeDescriptor,
    /// Requesters, outermost first, ending with `failed`
    pub chain: Vec<TypeDescriptor>,
}

impl SynthesisError {
    pub fn new(kind: SynthesisErrorKind, failed: TypeDescriptor, chain: Vec<TypeDescriptor>) -> Self {
        Self { kind, failed, chain }
    }

    pub fn unsupported(failed: TypeDescriptor) -> Self {
        Self::new(SynthesisErrorKind::UnsupportedType, failed, vec![failed])
    }

    /// The top-level type whose synthesis was originally requested
    pub fn requester(&self) -> TypeDescriptor {
        self.chain.first().copied().unwrap_or(self.failed)
    }

    pub fn chain_display(&self) -> String {
        self.chain
            .iter()
            .map(|ty| ty.simple_name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    fn render(&self) -> String {
        let mut out = format!("cannot synthesize `{}` for `{}`", self.failed, self.requester());
        if self.chain.len() > 1 {
            let _ = write!(out, " (via {})", self.chain_display());
        }
        let _ = match &self.kind {
            SynthesisErrorKind::UnsupportedType => write!(out, ": unsupported type"),
            SynthesisErrorKind::CannotConstruct { reason } => write!(out, ": {}", reason),
            SynthesisErrorKind::RecursionLimitExceeded { limit } => {
                write!(out, ": recursion limit of {} exceeded", limit)
            }
        };
        out
    }
}

/// Failure raised while invoking a reflective member.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),

    #[error("argument {position}: expected `{expected}`, got `{actual}`")]
    ArgumentMismatch {
        position: usize,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("expected {expected} arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Error)]
pub enum HarnessError {
    /// A required input was absent or malformed; raised before any work.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("failed when testing property `{property}` of `{owner}`: expected {expected}, got {actual}")]
    AssertionMismatch {
        owner: String,
        property: String,
        expected: String,
        actual: String,
    },

    #[error("{member} of `{owner}` failed: {source}")]
    Invocation {
        owner: String,
        member: String,
        #[source]
        source: InvocationError,
    },

    #[error("constructor `{signature}` broke its contract: {reason}")]
    ConstructorInvocation { signature: String, reason: String },

    /// The owner already held every value the synthesizer could offer, so a
    /// setter that ignores its argument would go unnoticed.
    #[error("property `{property}` of `{owner}` cannot be checked: every candidate value equals its current value {value}")]
    Inconclusive {
        owner: String,
        property: String,
        value: String,
    },

    #[error("`{type_name}` is not registered as {role}")]
    NotRegistered { type_name: String, role: &'static str },

    #[error("report serialization failed: {0}")]
    Serialization(#[source] Arc<serde_json::Error>),
}

impl From<serde_json::Error> for HarnessError {
    fn from(error: serde_json::Error) -> Self {
        HarnessError::Serialization(Arc::new(error))
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
