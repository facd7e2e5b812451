//! Structural introspection seams
//!
//! The harness never inspects a type on its own. Everything it knows about
//! accessors, constructors and packages comes through the traits in this
//! module; `TypeRegistry` is the bundled implementation.

use crate::error::{HarnessError, InvocationError};
use crate::value::{BoxedValue, DynValue, TypeDescriptor};
use regex::Regex;
use std::error::Error;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub type GetterFn = Arc<dyn Fn(&dyn DynValue) -> Result<BoxedValue, InvocationError> + Send + Sync>;
pub type SetterFn = Arc<dyn Fn(&mut dyn DynValue, BoxedValue) -> Result<(), InvocationError> + Send + Sync>;
pub type ConstructorFn = Arc<dyn Fn(Vec<BoxedValue>) -> Result<BoxedValue, InvocationError> + Send + Sync>;
pub type BoxedError = Box<dyn Error + Send + Sync + 'static>;
pub type ExceptionFn = Arc<dyn Fn(Vec<BoxedValue>) -> Result<BoxedError, InvocationError> + Send + Sync>;

/// Whether a test double may stand in for the type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extensibility {
    /// Only real instances will do
    Sealed,
    /// The type is an interface-like seam; doubles are acceptable
    Open,
}

/// Static facts about a registered type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub descriptor: TypeDescriptor,
    pub is_abstract: bool,
    pub extensibility: Extensibility,
    pub package: String,
    pub markers: Vec<String>,
    pub is_exception: bool,
}

impl TypeInfo {
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            is_abstract: false,
            extensibility: Extensibility::Sealed,
            package: descriptor.package().to_string(),
            markers: Vec::new(),
            is_exception: false,
        }
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }
}

/// A readable and writable property of one owner type.
#[derive(Clone)]
pub struct AccessorPair {
    pub property_name: String,
    pub declared_type: TypeDescriptor,
    pub owner: TypeDescriptor,
    getter: GetterFn,
    setter: SetterFn,
}

impl AccessorPair {
    pub fn new(
        owner: TypeDescriptor,
        property_name: impl Into<String>,
        declared_type: TypeDescriptor,
        getter: GetterFn,
        setter: SetterFn,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            declared_type,
            owner,
            getter,
            setter,
        }
    }

    pub fn get(&self, instance: &dyn DynValue) -> Result<BoxedValue, InvocationError> {
        guarded(|| (self.getter)(instance))
    }

    pub fn set(&self, instance: &mut dyn DynValue, value: BoxedValue) -> Result<(), InvocationError> {
        guarded(|| (self.setter)(instance, value))
    }
}

impl fmt::Debug for AccessorPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorPair")
            .field("owner", &self.owner)
            .field("property_name", &self.property_name)
            .field("declared_type", &self.declared_type)
            .finish()
    }
}

/// One way of building an instance of `owner`.
#[derive(Clone)]
pub struct ConstructorInfo {
    pub owner: TypeDescriptor,
    pub params: Vec<TypeDescriptor>,
    invoke: ConstructorFn,
}

impl ConstructorInfo {
    pub fn new(owner: TypeDescriptor, params: Vec<TypeDescriptor>, invoke: ConstructorFn) -> Self {
        Self { owner, params, invoke }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn signature(&self) -> String {
        signature(&self.owner, &self.params)
    }

    pub fn invoke(&self, args: Vec<BoxedValue>) -> Result<BoxedValue, InvocationError> {
        check_arity(self.params.len(), args.len())?;
        guarded(|| (self.invoke)(args))
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// A constructor of an error type.
#[derive(Clone)]
pub struct ExceptionConstructor {
    pub owner: TypeDescriptor,
    pub params: Vec<TypeDescriptor>,
    invoke: ExceptionFn,
}

impl ExceptionConstructor {
    pub fn new(owner: TypeDescriptor, params: Vec<TypeDescriptor>, invoke: ExceptionFn) -> Self {
        Self { owner, params, invoke }
    }

    pub fn signature(&self) -> String {
        signature(&self.owner, &self.params)
    }

    pub fn invoke(&self, args: Vec<BoxedValue>) -> Result<BoxedError, InvocationError> {
        check_arity(self.params.len(), args.len())?;
        guarded(|| (self.invoke)(args))
    }
}

impl fmt::Debug for ExceptionConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

fn signature(owner: &TypeDescriptor, params: &[TypeDescriptor]) -> String {
    let params = params
        .iter()
        .map(|p| p.simple_name())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({})", owner.simple_name(), params)
}

fn check_arity(expected: usize, actual: usize) -> Result<(), InvocationError> {
    if expected == actual {
        Ok(())
    } else {
        Err(InvocationError::ArityMismatch { expected, actual })
    }
}

/// Run user code, turning a panic into `InvocationError::Panicked`.
pub fn guarded<T, F>(call: F) -> Result<T, InvocationError>
where
    F: FnOnce() -> Result<T, InvocationError>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(InvocationError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}

/// Enumerates members of a type.
pub trait StructuralIntrospector {
    fn describe(&self, ty: &TypeDescriptor) -> Option<TypeInfo>;

    /// Accessor pairs with both a getter and a setter, minus `excluded` names.
    fn find_accessor_pairs(&self, ty: &TypeDescriptor, excluded: &[&str]) -> Vec<AccessorPair>;

    fn constructors(&self, ty: &TypeDescriptor) -> Vec<ConstructorInfo>;
}

/// Enumerates error types and their constructors.
pub trait ExceptionIntrospector {
    fn is_exception(&self, ty: &TypeDescriptor) -> bool;

    fn exception_constructors(&self, ty: &TypeDescriptor) -> Vec<ExceptionConstructor>;

    /// Error types declared inside or as subtypes of `container`
    fn nested_exceptions(&self, container: &TypeDescriptor) -> Vec<TypeDescriptor>;
}

/// Finds the types that live in a package.
pub trait ClassDiscovery {
    fn find_classes(&self, package: &str, criteria: &ClassCriteria) -> Vec<TypeDescriptor>;
}

/// Filter applied when discovering the types of a package.
#[derive(Debug, Clone)]
pub struct ClassCriteria {
    pub include_abstract: bool,
    pub name_pattern: Option<Regex>,
    pub required_marker: Option<String>,
    pub include_subpackages: bool,
}

impl Default for ClassCriteria {
    fn default() -> Self {
        Self {
            include_abstract: false,
            name_pattern: None,
            required_marker: None,
            include_subpackages: true,
        }
    }
}

impl ClassCriteria {
    pub fn builder() -> ClassCriteriaBuilder {
        ClassCriteriaBuilder::default()
    }

    /// Whether a type in `package_root` passes this filter.
    pub fn matches(&self, info: &TypeInfo, package_root: &str) -> bool {
        let in_package = info.package == package_root
            || (self.include_subpackages
                && info
                    .package
                    .strip_prefix(package_root)
                    .map_or(false, |rest| rest.starts_with("::")));
        if !in_package {
            return false;
        }
        if info.is_exception {
            return false;
        }
        if info.is_abstract && !self.include_abstract {
            return false;
        }
        if let Some(pattern) = &self.name_pattern {
            if !pattern.is_match(&info.descriptor.simple_name()) {
                return false;
            }
        }
        if let Some(marker) = &self.required_marker {
            if !info.has_marker(marker) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Default)]
pub struct ClassCriteriaBuilder {
    include_abstract: bool,
    name_pattern: Option<String>,
    required_marker: Option<String>,
    exclude_subpackages: bool,
}

impl ClassCriteriaBuilder {
    pub fn include_abstract(mut self, include: bool) -> Self {
        self.include_abstract = include;
        self
    }

    pub fn name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn required_marker(mut self, marker: impl Into<String>) -> Self {
        self.required_marker = Some(marker.into());
        self
    }

    pub fn include_subpackages(mut self, include: bool) -> Self {
        self.exclude_subpackages = !include;
        self
    }

    pub fn build(self) -> Result<ClassCriteria, HarnessError> {
        let name_pattern = match self.name_pattern {
            Some(pattern) => Some(Regex::new(&pattern).map_err(|e| {
                HarnessError::InvalidArgument(format!("bad name pattern `{}`: {}", pattern, e))
            })?),
            None => None,
        };
        Ok(ClassCriteria {
            include_abstract: self.include_abstract,
            name_pattern,
            required_marker: self.required_marker,
            include_subpackages: !self.exclude_subpackages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    fn info(package: &str) -> TypeInfo {
        let mut info = TypeInfo::new(TypeDescriptor::of::<Widget>());
        info.package = package.to_string();
        info
    }

    #[test]
    fn test_guarded_converts_panics() {
        let result: Result<(), _> = guarded(|| panic!("setter exploded"));
        assert_eq!(result, Err(InvocationError::Panicked("setter exploded".into())));

        let formatted: Result<(), _> = guarded(|| panic!("code {}", 7));
        assert_eq!(formatted, Err(InvocationError::Panicked("code 7".into())));
    }

    #[test]
    fn test_constructor_checks_arity() {
        let ctor = ConstructorInfo::new(
            TypeDescriptor::of::<Widget>(),
            vec![TypeDescriptor::of::<String>()],
            Arc::new(|_: Vec<BoxedValue>| Ok(Box::new(1_u8) as BoxedValue)),
        );
        assert_eq!(ctor.signature(), "Widget(String)");
        assert_eq!(
            ctor.invoke(Vec::new()).unwrap_err(),
            InvocationError::ArityMismatch { expected: 1, actual: 0 }
        );
    }

    #[test]
    fn test_criteria_package_matching() {
        let criteria = ClassCriteria::default();
        assert!(criteria.matches(&info("app::model"), "app::model"));
        assert!(criteria.matches(&info("app::model::nested"), "app::model"));
        assert!(!criteria.matches(&info("app::models"), "app::model"));

        let flat = ClassCriteria::builder().include_subpackages(false).build().unwrap();
        assert!(!flat.matches(&info("app::model::nested"), "app::model"));
    }

    #[test]
    fn test_criteria_filters() {
        let criteria = ClassCriteria::builder()
            .name_pattern("^Wid")
            .required_marker("Entity")
            .build()
            .unwrap();

        let mut tagged = info("app");
        assert!(!criteria.matches(&tagged, "app"));
        tagged.markers.push("Entity".into());
        assert!(criteria.matches(&tagged, "app"));

        tagged.is_abstract = true;
        assert!(!criteria.matches(&tagged, "app"));
    }

    #[test]
    fn test_invalid_pattern_is_invalid_argument() {
        let err = ClassCriteria::builder().name_pattern("(").build().unwrap_err();
        assert!(matches!(err, HarnessError::InvalidArgument(_)));
    }
}
