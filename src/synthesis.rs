//! Value synthesis
//!
//! Produces one representative value for an arbitrary registered type. The
//! strategies are tried in a fixed order and the first success wins:
//!
//! 1. **Catalog**: the primitive catalog sample, when the type is recognized.
//! 2. **Double**: a test double, when the type is `Open` and the double
//!    factory has one.
//! 3. **Constructed**: a real instance built through the type's
//!    constructors, no-argument constructors first, synthesizing every
//!    parameter recursively.
//!
//! Only exhaustion of all three becomes an error. Nested failures keep the
//! full requester chain so the report names the top-level type that asked.

use crate::catalog::PrimitiveCatalog;
use crate::config::HarnessConfig;
use crate::double::DoubleFactory;
use crate::error::{SynthesisError, SynthesisErrorKind};
use crate::introspect::{ConstructorInfo, Extensibility, StructuralIntrospector};
use crate::value::{values_equal, BoxedValue, DynValue, TypeDescriptor};
use serde::Serialize;
use std::fmt;

/// Which layer produced a synthesized value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Catalog,
    Double,
    Constructed,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Catalog => write!(f, "catalog"),
            Strategy::Double => write!(f, "double"),
            Strategy::Constructed => write!(f, "constructed"),
        }
    }
}

/// A successfully synthesized value, owned by the caller.
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub value: BoxedValue,
    pub strategy: Strategy,
}

pub type SynthesisResult = Result<Synthesized, SynthesisError>;

/// Layered value synthesizer.
///
/// Holds no mutable state: the recursion path lives on the stack of each
/// call, so one synthesizer can serve concurrent verification calls.
pub struct ValueSynthesizer<'a> {
    catalog: &'static PrimitiveCatalog,
    introspector: &'a dyn StructuralIntrospector,
    doubles: &'a dyn DoubleFactory,
    max_depth: usize,
}

impl<'a> ValueSynthesizer<'a> {
    pub fn new(
        introspector: &'a dyn StructuralIntrospector,
        doubles: &'a dyn DoubleFactory,
        config: &HarnessConfig,
    ) -> Self {
        Self {
            catalog: PrimitiveCatalog::global(),
            introspector,
            doubles,
            max_depth: config.max_depth.max(1),
        }
    }

    pub fn introspector(&self) -> &'a dyn StructuralIntrospector {
        self.introspector
    }

    /// Synthesize a representative value of `ty`.
    pub fn synthesize(&self, ty: &TypeDescriptor) -> SynthesisResult {
        let mut path = Vec::new();
        let result = self.synthesize_in(ty, &mut path);
        if let Ok(synthesized) = &result {
            log::debug!("synthesized {} via {}", ty, synthesized.strategy);
        }
        result
    }

    /// Build a real instance of `ty`, bypassing the catalog and doubles.
    ///
    /// Used for the object under test, which has to be the genuine type for
    /// its accessors to mean anything.
    pub fn construct(&self, ty: &TypeDescriptor) -> SynthesisResult {
        let mut path = Vec::new();
        self.enter(ty, &mut path, |this, ty, path| this.construct_in(ty, path))
    }

    /// Synthesize a value of `ty` that is not equal to `current`.
    ///
    /// Candidates, in order: the regular synthesized value, the catalog zero
    /// value, one value per registered constructor, then a constructed
    /// instance whose own properties are filled through their setters.
    /// `Ok(None)` when every candidate equals `current`.
    pub fn synthesize_distinct(
        &self,
        ty: &TypeDescriptor,
        current: &dyn DynValue,
    ) -> Result<Option<Synthesized>, SynthesisError> {
        let first = self.synthesize(ty)?;
        if !values_equal(&*first.value, current) {
            return Ok(Some(first));
        }

        if let Some(zero) = self.catalog.zero_value(ty) {
            if !values_equal(&*zero, current) {
                log::debug!("using the zero value of {}", ty);
                return Ok(Some(Synthesized {
                    value: zero,
                    strategy: Strategy::Catalog,
                }));
            }
        }

        let mut constructors = self.introspector.constructors(ty);
        constructors.sort_by_key(|c| c.arity());
        for constructor in &constructors {
            let mut path = vec![*ty];
            let value = match self.arguments_for(constructor, &mut path) {
                Ok(args) => constructor.invoke(args).ok(),
                Err(_) => None,
            };
            if let Some(value) = value.filter(|v| !values_equal(&**v, current)) {
                log::debug!("using {} for a distinct {}", constructor.signature(), ty);
                return Ok(Some(Synthesized {
                    value,
                    strategy: Strategy::Constructed,
                }));
            }
        }

        match self.populated(ty) {
            Some(value) if !values_equal(&*value, current) => {
                log::debug!("using a populated {}", ty);
                Ok(Some(Synthesized {
                    value,
                    strategy: Strategy::Constructed,
                }))
            }
            _ => Ok(None),
        }
    }

    fn populated(&self, ty: &TypeDescriptor) -> Option<BoxedValue> {
        let pairs = self.introspector.find_accessor_pairs(ty, &[]);
        if pairs.is_empty() {
            return None;
        }
        let mut instance = self.construct(ty).ok()?.value;
        for pair in &pairs {
            let mut path = vec![*ty];
            let value = self.synthesize_in(&pair.declared_type, &mut path).ok()?.value;
            pair.set(&mut *instance, value).ok()?;
        }
        Some(instance)
    }

    fn synthesize_in(&self, ty: &TypeDescriptor, path: &mut Vec<TypeDescriptor>) -> SynthesisResult {
        self.enter(ty, path, |this, ty, path| this.resolve(ty, path))
    }

    fn enter<F>(&self, ty: &TypeDescriptor, path: &mut Vec<TypeDescriptor>, step: F) -> SynthesisResult
    where
        F: FnOnce(&Self, &TypeDescriptor, &mut Vec<TypeDescriptor>) -> SynthesisResult,
    {
        if path.len() >= self.max_depth {
            let mut chain = path.clone();
            chain.push(*ty);
            return Err(SynthesisError::new(
                SynthesisErrorKind::RecursionLimitExceeded { limit: self.max_depth },
                *ty,
                chain,
            ));
        }

        path.push(*ty);
        let result = step(self, ty, path);
        path.pop();
        result
    }

    fn resolve(&self, ty: &TypeDescriptor, path: &mut Vec<TypeDescriptor>) -> SynthesisResult {
        if let Ok(value) = self.catalog.sample(ty) {
            return Ok(Synthesized {
                value,
                strategy: Strategy::Catalog,
            });
        }

        let open = self
            .introspector
            .describe(ty)
            .map_or(false, |info| info.extensibility == Extensibility::Open);
        if open {
            if let Some(value) = self.doubles.create_double(ty) {
                return Ok(Synthesized {
                    value,
                    strategy: Strategy::Double,
                });
            }
            log::warn!("no test double for open type {}, trying construction", ty);
        }

        self.construct_in(ty, path)
    }

    fn construct_in(&self, ty: &TypeDescriptor, path: &mut Vec<TypeDescriptor>) -> SynthesisResult {
        let cannot = |reason: String, path: &[TypeDescriptor]| {
            SynthesisError::new(
                SynthesisErrorKind::CannotConstruct { reason },
                *ty,
                path.to_vec(),
            )
        };

        let info = match self.introspector.describe(ty) {
            Some(info) => info,
            None => {
                let reason = "type is neither in the catalog nor registered".to_string();
                return Err(cannot(reason, path.as_slice()));
            }
        };
        if info.is_abstract {
            return Err(cannot("abstract type without a usable test double".into(), path.as_slice()));
        }

        let mut constructors = self.introspector.constructors(ty);
        if constructors.is_empty() {
            return Err(cannot("no constructor registered".into(), path.as_slice()));
        }
        constructors.sort_by_key(|c| c.arity());

        let mut nested_failure = None;
        let mut invocation_failure = None;
        for constructor in &constructors {
            let args = match self.arguments_for(constructor, path) {
                Ok(args) => args,
                Err(err) => {
                    log::debug!("{} unusable: {}", constructor.signature(), err);
                    nested_failure.get_or_insert(err);
                    continue;
                }
            };
            match constructor.invoke(args) {
                Ok(value) => {
                    return Ok(Synthesized {
                        value,
                        strategy: Strategy::Constructed,
                    })
                }
                Err(err) => {
                    log::warn!("{} failed: {}", constructor.signature(), err);
                    invocation_failure.get_or_insert(format!("{} failed: {}", constructor.signature(), err));
                }
            }
        }

        // A nested failure names the deeper culprit, so it wins over a
        // constructor that merely threw.
        Err(match (nested_failure, invocation_failure) {
            (Some(nested), _) => nested,
            (None, Some(reason)) => cannot(reason, path.as_slice()),
            (None, None) => cannot("no usable constructor".into(), path.as_slice()),
        })
    }

    fn arguments_for(
        &self,
        constructor: &ConstructorInfo,
        path: &mut Vec<TypeDescriptor>,
    ) -> Result<Vec<BoxedValue>, SynthesisError> {
        constructor
            .params
            .iter()
            .map(|param| self.synthesize_in(param, path).map(|s| s.value))
            .collect()
    }
}
