//! Type registry
//!
//! The bundled `StructuralIntrospector`, `ExceptionIntrospector` and
//! `ClassDiscovery`. Types are described once through typed builders; the
//! builders erase the closures into reflective callables that downcast their
//! arguments at call time.
//!
//! ```ignore
//! let mut registry = TypeRegistry::new();
//! registry
//!     .bean::<Invoice>()
//!     .constructor(Invoice::default)
//!     .property("number", |i: &Invoice| i.number.clone(), |i, v| i.number = v)
//!     .register();
//! ```

use crate::error::InvocationError;
use crate::introspect::{
    AccessorPair, BoxedError, ClassCriteria, ClassDiscovery, ConstructorFn, ConstructorInfo,
    ExceptionConstructor, ExceptionFn, ExceptionIntrospector, Extensibility, GetterFn, SetterFn,
    StructuralIntrospector, TypeInfo,
};
use crate::value::{downcast, BoxedValue, DynValue, TypeDescriptor};
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::error::Error;
use std::marker::PhantomData;
use std::sync::Arc;

/// Positional view over reflective constructor arguments.
pub struct ArgList {
    args: std::vec::IntoIter<BoxedValue>,
    position: usize,
}

impl ArgList {
    pub fn new(args: Vec<BoxedValue>) -> Self {
        Self {
            args: args.into_iter(),
            position: 0,
        }
    }

    /// Take the next argument as an `A`.
    pub fn next<A: Any>(&mut self) -> Result<A, InvocationError> {
        let position = self.position;
        self.position += 1;
        let value = self.args.next().ok_or(InvocationError::ArityMismatch {
            expected: position + 1,
            actual: position,
        })?;
        let actual = value.type_name();
        downcast::<A>(value).map_err(|_| InvocationError::ArgumentMismatch {
            position,
            expected: type_name::<A>(),
            actual,
        })
    }
}

#[derive(Debug, Clone)]
struct TypeRecord {
    info: TypeInfo,
    accessors: Vec<AccessorPair>,
    constructors: Vec<ConstructorInfo>,
    exception_constructors: Vec<ExceptionConstructor>,
    parent: Option<TypeDescriptor>,
}

impl TypeRecord {
    fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            info: TypeInfo::new(descriptor),
            accessors: Vec::new(),
            constructors: Vec::new(),
            exception_constructors: Vec::new(),
            parent: None,
        }
    }
}

/// Registration-ordered catalogue of described types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    records: HashMap<TypeDescriptor, TypeRecord>,
    order: Vec<TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start describing a data object.
    pub fn bean<T: DynValue>(&mut self) -> BeanBuilder<'_, T> {
        BeanBuilder {
            registry: self,
            record: TypeRecord::new(TypeDescriptor::of::<T>()),
            _marker: PhantomData,
        }
    }

    /// Start describing an error type.
    pub fn exception<E>(&mut self) -> ExceptionBuilder<'_, E>
    where
        E: Error + Send + Sync + 'static,
    {
        let mut record = TypeRecord::new(TypeDescriptor::of::<E>());
        record.info.is_exception = true;
        ExceptionBuilder {
            registry: self,
            record,
            _marker: PhantomData,
        }
    }

    /// Describe an interface-like seam: abstract and open to doubles.
    pub fn interface<T: ?Sized + 'static>(&mut self) -> &mut Self {
        let mut record = TypeRecord::new(TypeDescriptor::of::<T>());
        record.info.is_abstract = true;
        record.info.extensibility = Extensibility::Open;
        self.insert(record);
        self
    }

    /// Describe an enum by its variants. Synthesis uses the last variant,
    /// which keeps it apart from a `Default` that sits on the first; the
    /// other variants remain as fallbacks when a distinct value is needed.
    pub fn enumeration<T, I>(&mut self, variants: I) -> &mut Self
    where
        T: DynValue,
        I: IntoIterator<Item = T>,
    {
        let descriptor = TypeDescriptor::of::<T>();
        let mut record = TypeRecord::new(descriptor);
        let mut variants: Vec<T> = variants.into_iter().collect();
        // last variant first; the rest stay available as distinct values
        if let Some(last) = variants.pop() {
            variants.insert(0, last);
        }
        for variant in variants {
            let invoke: ConstructorFn = Arc::new(move |_: Vec<BoxedValue>| Ok(variant.clone_boxed()));
            record
                .constructors
                .push(ConstructorInfo::new(descriptor, Vec::new(), invoke));
        }
        self.insert(record);
        self
    }

    /// Describe `Vec<T>`, built as a one-element sequence.
    pub fn sequence<T: DynValue + Clone + PartialEq>(&mut self) -> &mut Self {
        self.bean::<Vec<T>>().constructor1(|element: T| vec![element]).register();
        self
    }

    /// Describe `Option<T>`, built as `Some`.
    pub fn optional<T: DynValue + Clone + PartialEq>(&mut self) -> &mut Self {
        self.bean::<Option<T>>().constructor1(|value: T| Some(value)).register();
        self
    }

    pub fn contains(&self, ty: &TypeDescriptor) -> bool {
        self.records.contains_key(ty)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registered types, oldest registration first
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        self.order.iter()
    }

    fn insert(&mut self, record: TypeRecord) {
        let descriptor = record.info.descriptor;
        if self.records.insert(descriptor, record).is_some() {
            log::debug!("replaced registration of {}", descriptor);
        } else {
            self.order.push(descriptor);
        }
    }
}

impl StructuralIntrospector for TypeRegistry {
    fn describe(&self, ty: &TypeDescriptor) -> Option<TypeInfo> {
        self.records.get(ty).map(|record| record.info.clone())
    }

    fn find_accessor_pairs(&self, ty: &TypeDescriptor, excluded: &[&str]) -> Vec<AccessorPair> {
        self.records
            .get(ty)
            .map(|record| {
                record
                    .accessors
                    .iter()
                    .filter(|pair| !excluded.contains(&pair.property_name.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn constructors(&self, ty: &TypeDescriptor) -> Vec<ConstructorInfo> {
        self.records
            .get(ty)
            .map(|record| record.constructors.clone())
            .unwrap_or_default()
    }
}

impl ExceptionIntrospector for TypeRegistry {
    fn is_exception(&self, ty: &TypeDescriptor) -> bool {
        self.records.get(ty).map_or(false, |record| record.info.is_exception)
    }

    fn exception_constructors(&self, ty: &TypeDescriptor) -> Vec<ExceptionConstructor> {
        self.records
            .get(ty)
            .map(|record| record.exception_constructors.clone())
            .unwrap_or_default()
    }

    fn nested_exceptions(&self, container: &TypeDescriptor) -> Vec<TypeDescriptor> {
        self.order
            .iter()
            .filter(|ty| {
                self.records
                    .get(ty)
                    .map_or(false, |r| r.info.is_exception && r.parent.as_ref() == Some(container))
            })
            .copied()
            .collect()
    }
}

impl ClassDiscovery for TypeRegistry {
    fn find_classes(&self, package: &str, criteria: &ClassCriteria) -> Vec<TypeDescriptor> {
        self.order
            .iter()
            .filter(|ty| {
                self.records
                    .get(ty)
                    .map_or(false, |record| criteria.matches(&record.info, package))
            })
            .copied()
            .collect()
    }
}

/// Describes one data object; finish with `register`.
#[must_use = "a bean description does nothing until `register` is called"]
pub struct BeanBuilder<'r, T> {
    registry: &'r mut TypeRegistry,
    record: TypeRecord,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, T: DynValue> BeanBuilder<'r, T> {
    /// Override the package, which defaults to the Rust module path.
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.record.info.package = package.into();
        self
    }

    /// Attach a marker used by `ClassCriteria::required_marker`.
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.record.info.markers.push(marker.into());
        self
    }

    /// Allow doubles to stand in for this type.
    pub fn open(mut self) -> Self {
        self.record.info.extensibility = Extensibility::Open;
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.record.info.is_abstract = true;
        self
    }

    pub fn constructor<F>(self, build: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor_with(Vec::new(), move |_| Ok(build()))
    }

    pub fn constructor1<A, F>(self, build: F) -> Self
    where
        A: Any,
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        self.constructor_with(vec![TypeDescriptor::of::<A>()], move |args| {
            Ok(build(args.next::<A>()?))
        })
    }

    pub fn constructor2<A, B, F>(self, build: F) -> Self
    where
        A: Any,
        B: Any,
        F: Fn(A, B) -> T + Send + Sync + 'static,
    {
        let params = vec![TypeDescriptor::of::<A>(), TypeDescriptor::of::<B>()];
        self.constructor_with(params, move |args| {
            let a = args.next::<A>()?;
            let b = args.next::<B>()?;
            Ok(build(a, b))
        })
    }

    pub fn constructor3<A, B, C, F>(self, build: F) -> Self
    where
        A: Any,
        B: Any,
        C: Any,
        F: Fn(A, B, C) -> T + Send + Sync + 'static,
    {
        let params = vec![
            TypeDescriptor::of::<A>(),
            TypeDescriptor::of::<B>(),
            TypeDescriptor::of::<C>(),
        ];
        self.constructor_with(params, move |args| {
            let a = args.next::<A>()?;
            let b = args.next::<B>()?;
            let c = args.next::<C>()?;
            Ok(build(a, b, c))
        })
    }

    /// Register a fallible constructor over an explicit parameter list.
    pub fn constructor_with<F>(mut self, params: Vec<TypeDescriptor>, build: F) -> Self
    where
        F: Fn(&mut ArgList) -> Result<T, InvocationError> + Send + Sync + 'static,
    {
        let invoke: ConstructorFn = Arc::new(move |args: Vec<BoxedValue>| {
            let mut args = ArgList::new(args);
            build(&mut args).map(|bean| Box::new(bean) as BoxedValue)
        });
        let owner = self.record.info.descriptor;
        self.record
            .constructors
            .push(ConstructorInfo::new(owner, params, invoke));
        self
    }

    /// Describe a property through its getter and setter.
    pub fn property<V, G, S>(mut self, name: &str, getter: G, setter: S) -> Self
    where
        V: DynValue,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let get: GetterFn = Arc::new(move |instance: &dyn DynValue| {
            let bean = instance
                .downcast_ref::<T>()
                .ok_or_else(|| receiver_mismatch::<T>(instance.type_name()))?;
            Ok(Box::new(getter(bean)) as BoxedValue)
        });
        let set: SetterFn = Arc::new(move |instance: &mut dyn DynValue, value: BoxedValue| {
            let receiver = instance.type_name();
            let bean = instance
                .downcast_mut::<T>()
                .ok_or_else(|| receiver_mismatch::<T>(receiver))?;
            let actual = value.type_name();
            let value = downcast::<V>(value).map_err(|_| InvocationError::ArgumentMismatch {
                position: 0,
                expected: type_name::<V>(),
                actual,
            })?;
            setter(bean, value);
            Ok(())
        });

        let owner = self.record.info.descriptor;
        self.record.accessors.push(AccessorPair::new(
            owner,
            name,
            TypeDescriptor::of::<V>(),
            get,
            set,
        ));
        self
    }

    pub fn register(self) {
        self.registry.insert(self.record);
    }
}

fn receiver_mismatch<T>(actual: &'static str) -> InvocationError {
    InvocationError::Failed(format!(
        "receiver is `{}`, not `{}`",
        actual,
        type_name::<T>()
    ))
}

/// Describes one error type; finish with `register`.
#[must_use = "an exception description does nothing until `register` is called"]
pub struct ExceptionBuilder<'r, E> {
    registry: &'r mut TypeRegistry,
    record: TypeRecord,
    _marker: PhantomData<fn() -> E>,
}

impl<'r, E> ExceptionBuilder<'r, E>
where
    E: Error + Send + Sync + 'static,
{
    /// Declare the container (enclosing type or base error) this error
    /// belongs to.
    pub fn nested_in<C: ?Sized + 'static>(mut self) -> Self {
        self.record.parent = Some(TypeDescriptor::of::<C>());
        self
    }

    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.record.info.package = package.into();
        self
    }

    pub fn constructor<F>(self, build: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.constructor_with(Vec::new(), move |_| Ok(build()))
    }

    pub fn constructor1<A, F>(self, build: F) -> Self
    where
        A: Any,
        F: Fn(A) -> E + Send + Sync + 'static,
    {
        self.constructor_with(vec![TypeDescriptor::of::<A>()], move |args| {
            Ok(build(args.next::<A>()?))
        })
    }

    pub fn constructor2<A, B, F>(self, build: F) -> Self
    where
        A: Any,
        B: Any,
        F: Fn(A, B) -> E + Send + Sync + 'static,
    {
        let params = vec![TypeDescriptor::of::<A>(), TypeDescriptor::of::<B>()];
        self.constructor_with(params, move |args| {
            let a = args.next::<A>()?;
            let b = args.next::<B>()?;
            Ok(build(a, b))
        })
    }

    pub fn constructor_with<F>(mut self, params: Vec<TypeDescriptor>, build: F) -> Self
    where
        F: Fn(&mut ArgList) -> Result<E, InvocationError> + Send + Sync + 'static,
    {
        let invoke: ExceptionFn = Arc::new(move |args: Vec<BoxedValue>| {
            let mut args = ArgList::new(args);
            build(&mut args).map(|err| Box::new(err) as BoxedError)
        });
        let owner = self.record.info.descriptor;
        self.record
            .exception_constructors
            .push(ExceptionConstructor::new(owner, params, invoke));
        self
    }

    pub fn register(self) {
        self.registry.insert(self.record);
    }
}
