//! # Beancheck
//!
//! Automated verification of data-object contracts.
//!
//! Given a type described to a [`TypeRegistry`], the harness builds a real
//! instance, synthesizes a representative value for each property, pushes it
//! through the setter and reads it back through the getter. Error types get
//! the matching treatment: every registered constructor is invoked and the
//! resulting error must carry exactly the message and cause it was given.
//!
//! Values come from a layered synthesizer (primitive catalog, then test
//! doubles for open types, then recursive construction), so most data
//! objects need nothing beyond their registration.
//!
//! ```ignore
//! let mut harness = Harness::new();
//! harness
//!     .registry_mut()
//!     .bean::<Invoice>()
//!     .constructor(Invoice::default)
//!     .property("number", |i: &Invoice| i.number.clone(), |i, v| i.number = v)
//!     .register();
//! harness.assert_class::<Invoice>();
//! ```

pub mod batch;
pub mod catalog;
pub mod config;
pub mod double;
pub mod error;
pub mod exception;
pub mod introspect;
pub mod registry;
pub mod report;
pub mod synthesis;
pub mod value;
pub mod verifier;

pub use batch::BatchDriver;
pub use catalog::{CatalogEntry, PrimitiveCatalog};
pub use config::{FailureMode, HarnessConfig};
pub use double::{Double, DoubleFactory, DoubleRegistry, NoDoubles};
pub use error::{HarnessError, HarnessResult, InvocationError, SynthesisError, SynthesisErrorKind};
pub use exception::{Cause, ContractOutcome, ExceptionContractCase, ExceptionReport, ExceptionVerifier};
pub use introspect::{
    AccessorPair, ClassCriteria, ClassDiscovery, ConstructorInfo, ExceptionConstructor,
    ExceptionIntrospector, Extensibility, StructuralIntrospector, TypeInfo,
};
pub use registry::{ArgList, BeanBuilder, ExceptionBuilder, TypeRegistry};
pub use report::{
    AssertingSink, BatchReport, ClassReport, CollectingSink, LoggingSink, ReportSink,
};
pub use synthesis::{Strategy, Synthesized, ValueSynthesizer};
pub use value::{boxed, BoxedValue, DynValue, TypeDescriptor};
pub use verifier::{PropertyFailure, PropertyVerifier, VerificationOutcome};

/// Owns a registry, a double registry and a configuration, and hands out
/// the verification components wired against them.
#[derive(Default)]
pub struct Harness {
    registry: TypeRegistry,
    doubles: DoubleRegistry,
    config: HarnessConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HarnessConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn doubles_mut(&mut self) -> &mut DoubleRegistry {
        &mut self.doubles
    }

    pub fn synthesizer(&self) -> ValueSynthesizer<'_> {
        ValueSynthesizer::new(&self.registry, &self.doubles, &self.config)
    }

    pub fn verifier(&self) -> PropertyVerifier<'_> {
        PropertyVerifier::new(self.synthesizer(), &self.config)
    }

    pub fn batch(&self) -> BatchDriver<'_> {
        BatchDriver::new(self.verifier(), &self.registry)
    }

    pub fn exceptions(&self) -> ExceptionVerifier<'_> {
        ExceptionVerifier::new(self.synthesizer(), &self.registry, self.config.log_passes)
    }

    /// Verify the accessors of `T` and panic on any failure.
    pub fn assert_class<T: 'static>(&self) {
        self.batch()
            .verify_class(&TypeDescriptor::of::<T>(), &[])
            .assert_passed();
    }

    /// Verify the constructors of error type `E` and panic on any failure.
    pub fn assert_exception<E: 'static>(&self) {
        match self.exceptions().verify_exception(Some(TypeDescriptor::of::<E>())) {
            Ok(report) => report.assert_passed(),
            Err(error) => panic!("{}", error),
        }
    }

    /// Verify every registered type under `package` and panic on any failure.
    pub fn assert_package(&self, package: &str) {
        match self.batch().verify_package_default(Some(package)) {
            Ok(report) => report.assert_passed(),
            Err(error) => panic!("{}", error),
        }
    }
}
