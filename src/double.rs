//! Test doubles for interface-like types
//!
//! A double is a behaviour-less stand-in handed to a setter when the declared
//! property type is an open seam (typically a trait object) with no
//! meaningful real instance. Doubles only have to survive a round trip, so
//! their equality is identity.

use crate::value::{BoxedValue, DynValue, TypeDescriptor};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Produces doubles for types the introspector reports as `Open`.
pub trait DoubleFactory {
    /// `None` when no double is available, which sends synthesis on to
    /// direct construction.
    fn create_double(&self, ty: &TypeDescriptor) -> Option<BoxedValue>;
}

/// Never produces a double.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDoubles;

impl DoubleFactory for NoDoubles {
    fn create_double(&self, _ty: &TypeDescriptor) -> Option<BoxedValue> {
        None
    }
}

/// Shared handle whose equality is pointer identity.
///
/// Use it as the declared type of properties that hold trait objects:
/// `Double<dyn Clock>` equals only itself and its clones.
pub struct Double<T: ?Sized> {
    inner: Arc<T>,
}

impl<T: ?Sized> Double<T> {
    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }

    pub fn as_arc(&self) -> &Arc<T> {
        &self.inner
    }

    fn address(&self) -> *const () {
        Arc::as_ptr(&self.inner) as *const ()
    }
}

impl<T> Double<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Arc::new(value) }
    }
}

impl<T: ?Sized> Clone for Double<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> PartialEq for Double<T> {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl<T: ?Sized> Eq for Double<T> {}

impl<T: ?Sized> Deref for Double<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized> fmt::Debug for Double<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Double<{}>@{:p}", std::any::type_name::<T>(), self.address())
    }
}

type DoubleMaker = Box<dyn Fn() -> BoxedValue + Send + Sync>;

/// Factory registry keyed by the double's declared type.
#[derive(Default)]
pub struct DoubleRegistry {
    makers: HashMap<TypeDescriptor, DoubleMaker>,
}

impl DoubleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for doubles of `T`; a later registration replaces
    /// an earlier one.
    pub fn register<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: DynValue,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.makers.insert(
            TypeDescriptor::of::<T>(),
            Box::new(move || Box::new(factory()) as BoxedValue),
        );
        self
    }

    /// Register `T::default()` as the double for `T`.
    pub fn register_default<T>(&mut self) -> &mut Self
    where
        T: DynValue + Default,
    {
        self.register::<T, _>(T::default)
    }

    pub fn contains(&self, ty: &TypeDescriptor) -> bool {
        self.makers.contains_key(ty)
    }

    pub fn len(&self) -> usize {
        self.makers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.makers.is_empty()
    }
}

impl DoubleFactory for DoubleRegistry {
    fn create_double(&self, ty: &TypeDescriptor) -> Option<BoxedValue> {
        let double = self.makers.get(ty).map(|make| make());
        if double.is_some() {
            log::debug!("created test double for {}", ty);
        }
        double
    }
}

impl fmt::Debug for DoubleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoubleRegistry")
            .field("types", &self.makers.keys().collect::<Vec<_>>())
            .finish()
    }
}
