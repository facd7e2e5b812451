//! # Bean Verification Test Suite
//!
//! End-to-end checks of accessor verification through the public API:
//! registration, value synthesis across all three layers, batch runs over
//! explicit type lists and discovered packages, and the asserting facade.

use beancheck::{
    ClassCriteria, Double, FailureMode, Harness, HarnessConfig, HarnessError, Strategy,
    SynthesisErrorKind, TypeDescriptor,
};
use std::sync::Arc;

mod inventory {
    use beancheck::Double;

    pub trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    pub struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            1_700_000_000
        }
    }

    pub type SharedClock = Double<dyn Clock>;

    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct Child {
        pub label: String,
    }

    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct Shelf {
        pub name: String,
        pub count: i32,
        pub children: Vec<Child>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Stocktake {
        pub shelf: Shelf,
        pub clock: SharedClock,
    }

    /// Stores the count off by one.
    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct Miscounted {
        pub count: i32,
    }

    pub mod archive {
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct Ledger {
            pub entries: Vec<String>,
        }
    }
}

use inventory::archive::Ledger;
use inventory::{Child, Clock, FixedClock, Miscounted, SharedClock, Shelf, Stocktake};

fn harness_with(config: HarnessConfig) -> Harness {
    let mut harness = Harness::with_config(config);

    let registry = harness.registry_mut();
    registry
        .bean::<Child>()
        .constructor1(|label: String| Child { label })
        .property("label", |c: &Child| c.label.clone(), |c, v| c.label = v)
        .register();
    registry.sequence::<Child>();
    registry
        .bean::<Shelf>()
        .constructor(Shelf::default)
        .property("name", |s: &Shelf| s.name.clone(), |s, v| s.name = v)
        .property("count", |s: &Shelf| s.count, |s, v| s.count = v)
        .property("children", |s: &Shelf| s.children.clone(), |s, v| s.children = v)
        .register();
    registry.interface::<SharedClock>();
    registry
        .bean::<Stocktake>()
        .constructor2(|shelf: Shelf, clock: SharedClock| Stocktake { shelf, clock })
        .property("shelf", |s: &Stocktake| s.shelf.clone(), |s, v| s.shelf = v)
        .property("clock", |s: &Stocktake| s.clock.clone(), |s, v| s.clock = v)
        .register();
    registry
        .bean::<Miscounted>()
        .constructor(Miscounted::default)
        .property("count", |m: &Miscounted| m.count, |m, v: i32| m.count = v + 1)
        .register();
    registry
        .bean::<Ledger>()
        .marker("Archived")
        .constructor(Ledger::default)
        .property("entries", |l: &Ledger| l.entries.clone(), |l, v| l.entries = v)
        .register();

    harness.doubles_mut().register::<SharedClock, _>(|| {
        Double::from_arc(Arc::new(FixedClock) as Arc<dyn Clock>)
    });
    harness
}

fn harness() -> Harness {
    harness_with(HarnessConfig::default())
}

#[test]
fn test_value_object_with_nested_sequence_passes() {
    let harness = harness();
    let report = harness
        .batch()
        .verify_class(&TypeDescriptor::of::<Shelf>(), &[]);

    let properties: Vec<_> = report.outcomes.iter().map(|o| o.property()).collect();
    assert_eq!(properties, vec!["name", "count", "children"]);
    assert!(report.is_success(), "{:?}", report);
    harness.assert_class::<Shelf>();
}

#[test]
fn test_synthesis_layers() {
    let harness = harness();
    let synth = harness.synthesizer();

    let count = synth.synthesize(&TypeDescriptor::of::<i32>()).unwrap();
    assert_eq!(count.strategy, Strategy::Catalog);

    let clock = synth.synthesize(&TypeDescriptor::of::<SharedClock>()).unwrap();
    assert_eq!(clock.strategy, Strategy::Double);
    let clock = clock.value.downcast_ref::<SharedClock>().unwrap();
    assert_eq!(clock.now(), 1_700_000_000);

    let children = synth.synthesize(&TypeDescriptor::of::<Vec<Child>>()).unwrap();
    assert_eq!(children.strategy, Strategy::Constructed);
    let children = children.value.downcast_ref::<Vec<Child>>().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].label, "sample-string");
}

#[test]
fn test_double_survives_round_trip() {
    let harness = harness();
    let report = harness
        .batch()
        .verify_class(&TypeDescriptor::of::<Stocktake>(), &[]);
    assert_eq!(report.outcomes.len(), 2);
    assert!(report.is_success(), "{:?}", report);
}

#[test]
fn test_broken_setter_is_reported_with_values() {
    let harness = harness();
    let report = harness
        .batch()
        .verify_class(&TypeDescriptor::of::<Miscounted>(), &[]);

    let failure = report.failures().next().unwrap();
    assert_eq!(failure.owner, "Miscounted");
    assert_eq!(failure.property, "count");
    assert_eq!(failure.expected.as_deref(), Some("32"));
    assert_eq!(failure.actual.as_deref(), Some("33"));
}

#[test]
#[should_panic(expected = "`count`")]
fn test_assert_class_panics_on_broken_setter() {
    harness().assert_class::<Miscounted>();
}

#[test]
fn test_batch_reports_every_type() {
    let harness = harness();
    let types = [
        TypeDescriptor::of::<Shelf>(),
        TypeDescriptor::of::<Miscounted>(),
        TypeDescriptor::of::<Ledger>(),
    ];
    let report = harness.batch().verify_classes(Some(&types[..])).unwrap();

    assert_eq!(report.classes.len(), 3);
    assert_eq!(report.failure_count(), 1);
    assert!(report.class("Shelf").unwrap().is_success());
    assert!(!report.class("Miscounted").unwrap().is_success());
    assert!(report.class("Ledger").unwrap().is_success());

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["failures"], 1);
}

#[test]
fn test_missing_inputs_are_rejected() {
    let harness = harness();
    let batch = harness.batch();
    assert!(matches!(batch.verify_classes(None), Err(HarnessError::InvalidArgument(_))));
    assert!(matches!(
        batch.verify_package(None, &ClassCriteria::default()),
        Err(HarnessError::InvalidArgument(_))
    ));
}

#[test]
fn test_package_discovery_follows_registration_order() {
    let harness = harness();
    let package = TypeDescriptor::of::<Shelf>().package();

    let report = harness
        .batch()
        .verify_package(Some(package), &ClassCriteria::default())
        .unwrap();
    let names: Vec<_> = report.classes.iter().map(|c| c.type_name.as_str()).collect();
    assert_eq!(names, vec!["Child", "Shelf", "Stocktake", "Miscounted", "Ledger"]);

    let archived = ClassCriteria::builder().required_marker("Archived").build().unwrap();
    let report = harness.batch().verify_package(Some(package), &archived).unwrap();
    assert_eq!(report.classes.len(), 1);
    assert!(report.is_success());
}

#[test]
fn test_fail_fast_stops_within_a_type() {
    let mut harness = harness_with(HarnessConfig::default().fail_fast());
    harness
        .registry_mut()
        .bean::<Shelf>()
        .constructor(Shelf::default)
        .property("count", |s: &Shelf| s.count, |_, _: i32| {})
        .property("name", |s: &Shelf| s.name.clone(), |s, v| s.name = v)
        .register();
    assert_eq!(harness.config().failure_mode, FailureMode::FailFast);

    let report = harness
        .batch()
        .verify_class(&TypeDescriptor::of::<Shelf>(), &[]);
    assert_eq!(report.outcomes.len(), 1);
    assert!(!report.is_success());
}

#[test]
fn test_self_referential_type_hits_recursion_limit() {
    #[derive(Debug, Clone, PartialEq)]
    struct Node {
        next: Box<Node>,
    }

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Holder {
        count: i32,
    }

    let mut harness = harness_with(HarnessConfig::default().with_max_depth(3));
    harness
        .registry_mut()
        .bean::<Node>()
        .constructor1(|next: Node| Node { next: Box::new(next) })
        .register();
    harness
        .registry_mut()
        .bean::<Holder>()
        .constructor1(|_node: Node| Holder::default())
        .property("count", |h: &Holder| h.count, |h, v| h.count = v)
        .register();

    let error = harness
        .synthesizer()
        .synthesize(&TypeDescriptor::of::<Holder>())
        .unwrap_err();
    assert!(matches!(error.kind, SynthesisErrorKind::RecursionLimitExceeded { limit: 3 }));
    assert_eq!(error.chain.first(), Some(&TypeDescriptor::of::<Holder>()));

    let report = harness
        .batch()
        .verify_class(&TypeDescriptor::of::<Holder>(), &[]);
    assert!(matches!(report.outcomes[0].failure().unwrap().error, HarnessError::Synthesis(_)));
}

#[test]
fn test_config_from_json() {
    let config = HarnessConfig::from_json(r#"{ "max_depth": 4, "failure_mode": "fail_fast" }"#).unwrap();
    assert_eq!(config.max_depth, 4);
    assert_eq!(config.failure_mode, FailureMode::FailFast);
    assert!(!config.log_passes);
}

#[test]
fn test_ignored_setters_fail_even_when_constructor_stores_samples() {
    #[derive(Debug, Clone, PartialEq)]
    struct Receipt {
        number: String,
        total: i64,
    }

    let mut harness = harness();
    harness
        .registry_mut()
        .bean::<Receipt>()
        .constructor2(|number: String, total: i64| Receipt { number, total })
        .property("number", |r: &Receipt| r.number.clone(), |_, _: String| {})
        .property("total", |r: &Receipt| r.total, |_, _: i64| {})
        .register();

    let report = harness
        .batch()
        .verify_class(&TypeDescriptor::of::<Receipt>(), &[]);
    assert_eq!(report.failure_count(), 2);
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.property, "number");
    assert_eq!(failure.expected.as_deref(), Some("\"\""));
    assert_eq!(failure.actual.as_deref(), Some("\"sample-string\""));
}

#[test]
#[should_panic(expected = "is not registered as a data type")]
fn test_assert_class_panics_for_unregistered_type() {
    struct Unknown;

    harness().assert_class::<Unknown>();
}

#[test]
fn test_assert_package_with_default_criteria() {
    let harness = harness();
    harness.assert_package(TypeDescriptor::of::<Ledger>().package());

    let report = harness
        .batch()
        .verify_package_default(Some(TypeDescriptor::of::<Shelf>().package()))
        .unwrap();
    assert_eq!(report.classes.len(), 5);
    assert_eq!(report.failure_count(), 1);
}
