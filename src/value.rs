//! Dynamic values and type handles
//!
//! Rust has no runtime reflection, so the harness moves values around as
//! `Box<dyn DynValue>` and identifies types through `TypeDescriptor`, a thin
//! wrapper over `TypeId` that remembers the readable type name.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque handle to a concrete type.
///
/// Equality and hashing only look at the `TypeId`; the name is carried for
/// error messages and package discovery.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// Descriptor for `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name as reported by the compiler
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name with every module path stripped, generics included.
    ///
    /// `alloc::vec::Vec<my_app::model::Child>` becomes `Vec<Child>`.
    pub fn simple_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        let mut segment = String::new();
        for ch in self.name.chars() {
            match ch {
                '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                    out.push_str(last_path_segment(&segment));
                    segment.clear();
                    out.push(ch);
                }
                _ => segment.push(ch),
            }
        }
        out.push_str(last_path_segment(&segment));
        out
    }

    /// Module path of the outermost type, empty for primitives.
    pub fn package(&self) -> &'static str {
        let outer = self.name.split('<').next().unwrap_or(self.name);
        match outer.rsplit_once("::") {
            Some((path, _)) => path,
            None => "",
        }
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

fn last_path_segment(segment: &str) -> &str {
    segment.rsplit("::").next().unwrap_or(segment)
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({})", self.name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.simple_name())
    }
}

/// A value that can cross the reflective boundary.
///
/// Blanket-implemented for every `'static + Debug + Clone + PartialEq + Send + Sync`
/// type, so user structs only need the usual derives to take part.
pub trait DynValue: Any + fmt::Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn clone_boxed(&self) -> BoxedValue;

    /// Value equality against another dynamic value; different concrete
    /// types never compare equal.
    fn dyn_eq(&self, other: &dyn DynValue) -> bool;

    fn type_name(&self) -> &'static str;
}

pub type BoxedValue = Box<dyn DynValue>;

impl<T> DynValue for T
where
    T: Any + fmt::Debug + Clone + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_boxed(&self) -> BoxedValue {
        Box::new(self.clone())
    }

    fn dyn_eq(&self, other: &dyn DynValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl Clone for BoxedValue {
    fn clone(&self) -> Self {
        (**self).clone_boxed()
    }
}

impl dyn DynValue {
    /// Dynamic type of the boxed value
    pub fn value_type_id(&self) -> TypeId {
        self.as_any().type_id()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Box a concrete value.
pub fn boxed<T: DynValue>(value: T) -> BoxedValue {
    Box::new(value)
}

/// Take ownership of the concrete value, handing the box back on a type miss.
pub fn downcast<T: Any>(value: BoxedValue) -> Result<T, BoxedValue> {
    if (*value).is::<T>() {
        match value.into_any().downcast::<T>() {
            Ok(concrete) => Ok(*concrete),
            Err(_) => unreachable!("type checked before downcast"),
        }
    } else {
        Err(value)
    }
}

/// Structural equality of two dynamic values.
pub fn values_equal(left: &dyn DynValue, right: &dyn DynValue) -> bool {
    left.dyn_eq(right)
}

/// Debug rendering used in failure messages.
pub fn render(value: &dyn DynValue) -> String {
    format!("{:?}", value)
}
