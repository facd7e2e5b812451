//! Batch driver
//!
//! Applies the property verifier to one type, a list of types, or every
//! type a package discovery turns up. Batches never stop early: each type
//! gets its own report, whatever happened to the previous one.

use crate::error::HarnessError;
use crate::introspect::{ClassCriteria, ClassDiscovery};
use crate::report::{BatchReport, ClassReport};
use crate::value::TypeDescriptor;
use crate::verifier::PropertyVerifier;

pub struct BatchDriver<'a> {
    verifier: PropertyVerifier<'a>,
    discovery: &'a dyn ClassDiscovery,
}

impl<'a> BatchDriver<'a> {
    pub fn new(verifier: PropertyVerifier<'a>, discovery: &'a dyn ClassDiscovery) -> Self {
        Self { verifier, discovery }
    }

    /// Verify one type, skipping the named properties.
    pub fn verify_class(&self, ty: &TypeDescriptor, excluded: &[&str]) -> ClassReport {
        log::debug!("verifying accessors of {}", ty);
        match self.verifier.verify(ty, excluded) {
            Ok(outcomes) => ClassReport::new(ty.simple_name(), outcomes),
            Err(error) => {
                log::error!("{}", error);
                ClassReport::unverified(ty.simple_name(), error)
            }
        }
    }

    /// Verify each listed type; `None` is rejected before anything runs.
    pub fn verify_classes(&self, types: Option<&[TypeDescriptor]>) -> Result<BatchReport, HarnessError> {
        let types =
            types.ok_or_else(|| HarnessError::InvalidArgument("input classes are missing".to_string()))?;

        Ok(BatchReport {
            classes: types.iter().map(|ty| self.verify_class(ty, &[])).collect(),
        })
    }

    /// Verify every type discovered in `package` under `criteria`.
    pub fn verify_package(
        &self,
        package: Option<&str>,
        criteria: &ClassCriteria,
    ) -> Result<BatchReport, HarnessError> {
        let package =
            package.ok_or_else(|| HarnessError::InvalidArgument("input package is missing".to_string()))?;
        if package.trim().is_empty() {
            return Err(HarnessError::InvalidArgument("input package is empty".to_string()));
        }

        let types = self.discovery.find_classes(package, criteria);
        if types.is_empty() {
            log::warn!("no types found in package {}", package);
        }
        self.verify_classes(Some(&types[..]))
    }

    /// `verify_package` with the default criteria.
    pub fn verify_package_default(&self, package: Option<&str>) -> Result<BatchReport, HarnessError> {
        self.verify_package(package, &ClassCriteria::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::double::NoDoubles;
    use crate::registry::TypeRegistry;
    use crate::synthesis::ValueSynthesizer;

    mod shop {
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct Order {
            pub id: u64,
        }

        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct OrderLine {
            pub quantity: u32,
        }

        pub mod legacy {
            #[derive(Debug, Clone, PartialEq, Default)]
            pub struct Voucher {
                pub code: String,
            }
        }
    }

    use shop::legacy::Voucher;
    use shop::{Order, OrderLine};

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .bean::<Order>()
            .constructor(Order::default)
            .property("id", |o: &Order| o.id, |o, v| o.id = v)
            .register();
        registry
            .bean::<OrderLine>()
            .constructor(OrderLine::default)
            // broken: never stores the quantity
            .property("quantity", |l: &OrderLine| l.quantity, |_, _: u32| {})
            .register();
        registry
            .bean::<Voucher>()
            .marker("Legacy")
            .constructor(Voucher::default)
            .property("code", |v: &Voucher| v.code.clone(), |v, c| v.code = c)
            .register();
        registry
    }

    fn with_driver<R>(run: impl FnOnce(&BatchDriver<'_>) -> R) -> R {
        let registry = registry();
        let config = HarnessConfig::default();
        let synth = ValueSynthesizer::new(&registry, &NoDoubles, &config);
        let driver = BatchDriver::new(PropertyVerifier::new(synth, &config), &registry);
        run(&driver)
    }

    #[test]
    fn test_missing_inputs_fail_before_verifying() {
        with_driver(|driver| {
            assert!(matches!(driver.verify_classes(None), Err(HarnessError::InvalidArgument(_))));
            assert!(matches!(
                driver.verify_package(None, &ClassCriteria::default()),
                Err(HarnessError::InvalidArgument(_))
            ));
            assert!(matches!(
                driver.verify_package(Some("  "), &ClassCriteria::default()),
                Err(HarnessError::InvalidArgument(_))
            ));
        });
    }

    #[test]
    fn test_batch_continues_past_a_failing_type() {
        with_driver(|driver| {
            let types = [TypeDescriptor::of::<OrderLine>(), TypeDescriptor::of::<Order>()];
            let report = driver.verify_classes(Some(&types[..])).unwrap();

            assert_eq!(report.classes.len(), 2);
            assert!(!report.classes[0].is_success());
            assert!(report.classes[1].is_success());
            assert_eq!(report.failure_count(), 1);
        });
    }

    #[test]
    fn test_package_discovery() {
        with_driver(|driver| {
            let package = TypeDescriptor::of::<Order>().package();

            let everything = driver.verify_package(Some(package), &ClassCriteria::default()).unwrap();
            assert_eq!(everything.classes.len(), 3);

            let flat = ClassCriteria::builder().include_subpackages(false).build().unwrap();
            let top_level = driver.verify_package(Some(package), &flat).unwrap();
            assert_eq!(top_level.classes.len(), 2);

            let lines = ClassCriteria::builder().name_pattern("Line$").build().unwrap();
            let only_lines = driver.verify_package(Some(package), &lines).unwrap();
            assert_eq!(only_lines.classes.len(), 1);
            assert_eq!(only_lines.classes[0].type_name, "OrderLine");

            let legacy = ClassCriteria::builder().required_marker("Legacy").build().unwrap();
            let vouchers = driver.verify_package(Some(package), &legacy).unwrap();
            assert!(vouchers.is_success());
            assert_eq!(vouchers.classes[0].type_name, "Voucher");
        });
    }

    #[test]
    fn test_verify_class_honours_exclusions() {
        with_driver(|driver| {
            let report = driver.verify_class(&TypeDescriptor::of::<OrderLine>(), &["quantity"]);
            assert!(report.outcomes.is_empty());
            assert!(report.is_success());
        });
    }

    #[test]
    fn test_unregistered_type_fails_its_class_only() {
        struct Ghost;

        with_driver(|driver| {
            let types = [TypeDescriptor::of::<Ghost>(), TypeDescriptor::of::<Order>()];
            let report = driver.verify_classes(Some(&types[..])).unwrap();

            assert_eq!(report.failure_count(), 1);
            assert!(matches!(
                report.classes[0].error,
                Some(HarnessError::NotRegistered { .. })
            ));
            assert!(report.classes[1].is_success());
        });
    }

    #[test]
    fn test_default_criteria_package_run() {
        with_driver(|driver| {
            let package = TypeDescriptor::of::<Order>().package();
            let report = driver.verify_package_default(Some(package)).unwrap();
            assert_eq!(report.classes.len(), 3);
            assert!(matches!(
                driver.verify_package_default(None),
                Err(HarnessError::InvalidArgument(_))
            ));
        });
    }
}
