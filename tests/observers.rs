use ferrous_services::{
    Definition, Lifecycle, LocatorConfig, LoggingObserver, Owner, RegistryCache, ServiceError,
    ServiceObserver,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ServiceObserver for RecordingObserver {
    fn registry_created(&self, owner: &Owner) {
        self.push(format!("registry:{}", owner.label()));
    }

    fn instantiating(&self, definition: &str) {
        self.push(format!("instantiating:{definition}"));
    }

    fn instantiated(&self, definition: &str, _duration: Duration) {
        self.push(format!("instantiated:{definition}"));
    }

    fn instantiation_failed(&self, definition: &str, error: &ServiceError) {
        self.push(format!("failed:{definition}:{error}"));
    }

    fn instance_destroyed(&self, definition: &str) {
        self.push(format!("destroyed:{definition}"));
    }
}

#[test]
fn test_observer_sees_the_instance_lifecycle() {
    let observer = Arc::new(RecordingObserver::default());
    let cache = RegistryCache::new();
    cache.add_observer(observer.clone());

    let lifecycle = Lifecycle::new();
    let owner = lifecycle.owner("app");
    let registry = cache.ensure_registry(&owner);
    let mailer = Definition::from_fn("mailer", |_| Ok(()));

    registry.get(&mailer).unwrap();
    registry.get(&mailer).unwrap();
    owner.destroy();
    lifecycle.settle();

    assert_eq!(
        observer.events(),
        vec![
            "registry:app",
            "instantiating:mailer",
            "instantiated:mailer",
            "destroyed:mailer",
        ]
    );
}

#[test]
fn test_observer_sees_failures() {
    let observer = Arc::new(RecordingObserver::default());
    let cache = RegistryCache::new();
    let lifecycle = Lifecycle::new();
    let registry = cache.ensure_registry(&lifecycle.owner("app"));
    // Added after the registry exists
    cache.add_observer(observer.clone());

    let broken = Definition::from_fn("broken", |_| Err::<(), _>(ServiceError::custom("no socket")));
    assert!(registry.get(&broken).is_err());

    assert_eq!(
        observer.events(),
        vec!["instantiating:broken", "failed:broken:no socket"]
    );
}

#[test]
fn test_logging_observer_is_installed_by_config() {
    let cache = RegistryCache::with_config(LocatorConfig::default().with_log_events(true));
    let lifecycle = Lifecycle::new();
    let owner = lifecycle.owner("logged");

    cache
        .ensure_registry(&owner)
        .get(&Definition::from_fn("logged", |_| Ok(())))
        .unwrap();
    owner.destroy();
    lifecycle.settle();

    assert_eq!(LoggingObserver::with_prefix("custom").prefix(), "custom");
    assert_eq!(LoggingObserver::default().prefix(), "ferrous-services");
}
