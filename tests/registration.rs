use ferrous_services::{
    Construct, Definition, Lifecycle, LocatorConfig, RegistryCache, ServiceContext, ServiceError,
    ServiceResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Settings;

#[test]
fn test_re_registration_is_rejected() {
    let lifecycle = Lifecycle::new();
    let owner = lifecycle.owner("owner");
    let registry = RegistryCache::new().ensure_registry(&owner);
    let settings = Definition::<Settings>::of();

    registry.register(&settings).unwrap();
    let first = registry.get(&settings).unwrap();

    let err = registry.register(&settings).unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyRegistered(_)));
    assert!(err.to_string().starts_with("Cannot re-register the same service: "));

    assert!(Arc::ptr_eq(&first, &registry.get(&settings).unwrap()));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_register_after_get_is_rejected() {
    let lifecycle = Lifecycle::new();
    let registry = RegistryCache::new().ensure_registry(&lifecycle.owner("owner"));
    let settings = Definition::from_fn("settings", |_| Ok(Settings));

    registry.get(&settings).unwrap();
    assert!(matches!(
        registry.register(&settings),
        Err(ServiceError::AlreadyRegistered("settings"))
    ));
}

#[test]
fn test_contains_reports_registered_definitions() {
    let lifecycle = Lifecycle::new();
    let registry = RegistryCache::new().ensure_registry(&lifecycle.owner("owner"));
    let settings = Definition::<Settings>::of();

    assert!(registry.is_empty());
    assert!(!registry.contains(&settings));
    registry.get(&settings).unwrap();
    assert!(registry.contains(&settings));
    assert!(registry.contains_key(&settings.key()));
}

#[test]
fn test_failed_construction_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let flaky = Definition::from_fn("flaky", move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(ServiceError::custom("database unavailable"))
        } else {
            Ok(Settings)
        }
    });

    let lifecycle = Lifecycle::new();
    let owner = lifecycle.owner("owner");
    let registry = RegistryCache::new().ensure_registry(&owner);

    let err = registry.get(&flaky).unwrap_err();
    assert_eq!(err.to_string(), "database unavailable");
    assert!(!registry.contains(&flaky));
    assert_eq!(registry.destroyable().child_count(), 0);

    registry.get(&flaky).unwrap();
    registry.get(&flaky).unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_failed_construction_discards_its_destructors() {
    let released = Arc::new(AtomicUsize::new(0));
    let counter = released.clone();
    let failing = Definition::from_fn("half_built", move |cx| {
        let counter = counter.clone();
        cx.register_destructor(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        Err::<Settings, _>(ServiceError::custom("boom"))
    });

    let lifecycle = Lifecycle::new();
    let owner = lifecycle.owner("owner");
    let registry = RegistryCache::new().ensure_registry(&owner);
    assert!(registry.get(&failing).is_err());

    owner.destroy();
    lifecycle.settle();
    // The instance never made it into the registry
    assert_eq!(released.load(Ordering::SeqCst), 0);
}

#[derive(Debug, thiserror::Error)]
#[error("missing api key")]
struct MissingKey;

#[test]
fn test_constructor_errors_propagate_unchanged() {
    let lifecycle = Lifecycle::new();
    let registry = RegistryCache::new().ensure_registry(&lifecycle.owner("owner"));
    let client = Definition::from_fn("client", |_| {
        Err::<Settings, _>(ServiceError::custom(MissingKey))
    });

    match registry.get(&client) {
        Err(ServiceError::Custom(inner)) => assert!(inner.downcast_ref::<MissingKey>().is_some()),
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

struct Left;
struct Right;

impl Construct for Left {
    fn construct(cx: &ServiceContext<'_>) -> ServiceResult<Self> {
        cx.get(&Definition::<Right>::constructed())?;
        Ok(Left)
    }
}

impl Construct for Right {
    fn construct(cx: &ServiceContext<'_>) -> ServiceResult<Self> {
        cx.get(&Definition::<Left>::constructed())?;
        Ok(Right)
    }
}

#[test]
fn test_circular_construction_is_reported() {
    let lifecycle = Lifecycle::new();
    let registry = RegistryCache::new().ensure_registry(&lifecycle.owner("owner"));

    match registry.get(&Definition::<Left>::constructed()) {
        Err(ServiceError::Circular(path)) => {
            assert_eq!(path.len(), 3);
            assert!(path[0].ends_with("Left"));
            assert!(path[1].ends_with("Right"));
            assert!(path[2].ends_with("Left"));
        }
        other => panic!("expected a cycle, got {:?}", other.map(|_| ())),
    }
    assert!(registry.is_empty());
}

#[derive(Debug)]
struct SelfReferential;

impl Construct for SelfReferential {
    fn construct(cx: &ServiceContext<'_>) -> ServiceResult<Self> {
        cx.get(&Definition::<SelfReferential>::constructed())?;
        Ok(SelfReferential)
    }
}

#[test]
fn test_self_dependency_is_reported() {
    let lifecycle = Lifecycle::new();
    let registry = RegistryCache::new().ensure_registry(&lifecycle.owner("owner"));

    let err = registry
        .get(&Definition::<SelfReferential>::constructed())
        .unwrap_err();
    assert!(err.to_string().starts_with("Circular dependency: "));
}

struct Top;
struct Middle;
#[derive(Default)]
struct Bottom;

impl Construct for Top {
    fn construct(cx: &ServiceContext<'_>) -> ServiceResult<Self> {
        cx.get(&Definition::<Middle>::constructed())?;
        Ok(Top)
    }
}

impl Construct for Middle {
    fn construct(cx: &ServiceContext<'_>) -> ServiceResult<Self> {
        cx.get(&Definition::<Bottom>::of())?;
        Ok(Middle)
    }
}

#[test]
fn test_nesting_beyond_max_depth_fails() {
    let lifecycle = Lifecycle::new();
    let cache = RegistryCache::with_config(LocatorConfig::default().with_max_depth(2));
    let registry = cache.ensure_registry(&lifecycle.owner("owner"));

    assert!(matches!(
        registry.get(&Definition::<Top>::constructed()),
        Err(ServiceError::DepthExceeded(2))
    ));
    assert!(registry.is_empty());

    // Resolving from the middle of the chain fits within the limit
    registry.get(&Definition::<Middle>::constructed()).unwrap();
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_zero_max_depth_still_resolves_top_level_services() {
    let lifecycle = Lifecycle::new();
    let cache = RegistryCache::with_config(LocatorConfig::default().with_max_depth(0));
    let registry = cache.ensure_registry(&lifecycle.owner("owner"));

    registry.get(&Definition::<Settings>::of()).unwrap();
    assert!(matches!(
        registry.get(&Definition::<Middle>::constructed()),
        Err(ServiceError::DepthExceeded(1))
    ));
}

#[test]
fn test_same_definition_in_other_registries_is_not_a_cycle() {
    struct Outer;

    let cache = Arc::new(RegistryCache::new());
    let lifecycle = Lifecycle::new();
    let other = lifecycle.owner("other");
    let other_registry = cache.ensure_registry(&other);
    let settings = Definition::<Settings>::of();

    let nested = settings.clone();
    let outer = Definition::from_fn("outer", move |cx| {
        cx.get(&nested)?;
        other_registry.get(&nested)?;
        Ok(Outer)
    });

    let registry = cache.ensure_registry(&lifecycle.owner("owner"));
    registry.get(&outer).unwrap();
    assert!(cache.get(&other).unwrap().contains(&settings));
}
