//! Primitive value catalog
//!
//! A fixed, process-wide table of representative values for the primitive,
//! standard-library and common third-party types a property is likely to
//! declare. Every sample is chosen to differ from the type's zero value so a
//! setter that silently drops its argument cannot pass a round-trip check.

use crate::error::SynthesisError;
use crate::exception::Cause;
use crate::value::{BoxedValue, DynValue, TypeDescriptor};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One catalog row: the sample handed out and, where the type has one, the
/// zero value the sample must differ from.
#[derive(Debug)]
pub struct CatalogEntry {
    pub descriptor: TypeDescriptor,
    sample: BoxedValue,
    zero: Option<BoxedValue>,
}

impl CatalogEntry {
    fn new<T: DynValue + Default>(sample: T) -> Self {
        Self {
            descriptor: TypeDescriptor::of::<T>(),
            sample: Box::new(sample),
            zero: Some(Box::new(T::default())),
        }
    }

    fn without_zero<T: DynValue>(sample: T, zero: Option<T>) -> Self {
        Self {
            descriptor: TypeDescriptor::of::<T>(),
            sample: Box::new(sample),
            zero: zero.map(|z| Box::new(z) as BoxedValue),
        }
    }
}

/// Read-only lookup table keyed by type.
#[derive(Debug)]
pub struct PrimitiveCatalog {
    entries: HashMap<TypeDescriptor, CatalogEntry>,
    order: Vec<TypeDescriptor>,
}

static GLOBAL_CATALOG: Lazy<PrimitiveCatalog> = Lazy::new(PrimitiveCatalog::standard);

impl PrimitiveCatalog {
    /// The shared catalog, built on first use.
    pub fn global() -> &'static PrimitiveCatalog {
        &GLOBAL_CATALOG
    }

    fn standard() -> Self {
        let mut catalog = Self {
            entries: HashMap::new(),
            order: Vec::new(),
        };

        catalog.insert(CatalogEntry::new(true));
        catalog.insert(CatalogEntry::new('x'));

        catalog.insert(CatalogEntry::new(8_i8));
        catalog.insert(CatalogEntry::new(16_i16));
        catalog.insert(CatalogEntry::new(32_i32));
        catalog.insert(CatalogEntry::new(64_i64));
        catalog.insert(CatalogEntry::new(128_i128));
        catalog.insert(CatalogEntry::new(42_isize));
        catalog.insert(CatalogEntry::new(8_u8));
        catalog.insert(CatalogEntry::new(16_u16));
        catalog.insert(CatalogEntry::new(32_u32));
        catalog.insert(CatalogEntry::new(64_u64));
        catalog.insert(CatalogEntry::new(128_u128));
        catalog.insert(CatalogEntry::new(42_usize));

        catalog.insert(CatalogEntry::new(3.5_f32));
        catalog.insert(CatalogEntry::new(6.25_f64));
        catalog.insert(CatalogEntry::new(half::f16::from_f32(1.5)));

        catalog.insert(CatalogEntry::new(String::from("sample-string")));
        catalog.insert(CatalogEntry::new::<&'static str>("sample-str"));

        catalog.insert(CatalogEntry::new(vec![0xCA_u8, 0xFE]));
        catalog.insert(CatalogEntry::new(vec![String::from("sample-element")]));
        catalog.insert(CatalogEntry::new(vec![32_i32]));
        catalog.insert(CatalogEntry::new(vec![64_i64]));
        catalog.insert(CatalogEntry::new(
            [(String::from("sample-key"), String::from("sample-value"))]
                .into_iter()
                .collect::<HashMap<_, _>>(),
        ));
        catalog.insert(CatalogEntry::new(
            [(String::from("sample-key"), String::from("sample-value"))]
                .into_iter()
                .collect::<BTreeMap<_, _>>(),
        ));
        catalog.insert(CatalogEntry::new(
            [String::from("sample-member")].into_iter().collect::<HashSet<_>>(),
        ));
        catalog.insert(CatalogEntry::new(
            [String::from("sample-member")].into_iter().collect::<BTreeSet<_>>(),
        ));

        catalog.insert(CatalogEntry::new(Some(String::from("sample-option"))));
        catalog.insert(CatalogEntry::new(Some(32_i32)));
        catalog.insert(CatalogEntry::new(Some(64_i64)));
        catalog.insert(CatalogEntry::new(Some(true)));

        catalog.insert(CatalogEntry::new(Duration::from_secs(90)));
        catalog.insert(CatalogEntry::without_zero::<SystemTime>(
            UNIX_EPOCH + Duration::from_secs(1_600_000_000),
            Some(UNIX_EPOCH),
        ));
        catalog.insert(CatalogEntry::new(PathBuf::from("/tmp/sample-path")));
        catalog.insert(CatalogEntry::without_zero(
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        ));
        catalog.insert(CatalogEntry::new(serde_json::json!({ "sample": 1 })));
        catalog.insert(CatalogEntry::without_zero::<Cause>(
            Cause::message("sample cause"),
            None,
        ));

        catalog
    }

    fn insert(&mut self, entry: CatalogEntry) {
        let descriptor = entry.descriptor;
        if self.entries.insert(descriptor, entry).is_none() {
            self.order.push(descriptor);
        }
    }

    pub fn is_recognized(&self, ty: &TypeDescriptor) -> bool {
        self.entries.contains_key(ty)
    }

    /// A fresh copy of the catalog sample for `ty`.
    pub fn sample(&self, ty: &TypeDescriptor) -> Result<BoxedValue, SynthesisError> {
        self.entries
            .get(ty)
            .map(|entry| entry.sample.clone())
            .ok_or_else(|| SynthesisError::unsupported(*ty))
    }

    /// Zero value of `ty`, if the catalog knows one.
    pub fn zero_value(&self, ty: &TypeDescriptor) -> Option<BoxedValue> {
        self.entries.get(ty).and_then(|entry| entry.zero.clone())
    }

    /// Recognized types, in insertion order
    pub fn descriptors(&self) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
