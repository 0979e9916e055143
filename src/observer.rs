//! Diagnostic observers for registry and instance lifecycle events.
//!
//! Observers see every registry created for an owner, every instantiation
//! (with its duration or error) and every instance teardown. The built-in
//! [`LoggingObserver`] forwards them to `tracing`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ServiceError;
use crate::internal::sync::RwLock;
use crate::lifecycle::Owner;

/// Observer trait for service locator events.
///
/// Calls are made synchronously on the thread doing the work, so keep
/// implementations lightweight.
///
/// # Examples
///
/// ```
/// use ferrous_services::{RegistryCache, ServiceObserver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct CountingObserver {
///     created: AtomicUsize,
/// }
///
/// impl ServiceObserver for CountingObserver {
///     fn instantiating(&self, _definition: &str) {}
///
///     fn instantiated(&self, _definition: &str, _duration: Duration) {
///         self.created.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let cache = RegistryCache::new();
/// cache.add_observer(Arc::new(CountingObserver::default()));
/// ```
pub trait ServiceObserver: Send + Sync {
    /// Called when a registry is created for an owner.
    fn registry_created(&self, owner: &Owner) {
        let _ = owner;
    }

    /// Called before a definition's constructor runs.
    fn instantiating(&self, definition: &str);

    /// Called after a constructor returned successfully.
    fn instantiated(&self, definition: &str, duration: Duration);

    /// Called when a constructor returned an error. The error still propagates.
    fn instantiation_failed(&self, definition: &str, error: &ServiceError) {
        let _ = (definition, error);
    }

    /// Called when an instance is torn down, after its own destructors.
    fn instance_destroyed(&self, definition: &str) {
        let _ = definition;
    }
}

/// Container for registered observers.
///
/// Shared between a cache and the registries it creates, so observers added
/// later still see events from existing registries.
#[derive(Default)]
pub(crate) struct Observers {
    observers: RwLock<Vec<Arc<dyn ServiceObserver>>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, observer: Arc<dyn ServiceObserver>) {
        self.observers.write().push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.read().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub(crate) fn registry_created(&self, owner: &Owner) {
        for observer in self.observers.read().iter() {
            observer.registry_created(owner);
        }
    }

    pub(crate) fn instantiating(&self, definition: &str) {
        for observer in self.observers.read().iter() {
            observer.instantiating(definition);
        }
    }

    pub(crate) fn instantiated(&self, definition: &str, duration: Duration) {
        for observer in self.observers.read().iter() {
            observer.instantiated(definition, duration);
        }
    }

    pub(crate) fn instantiation_failed(&self, definition: &str, error: &ServiceError) {
        for observer in self.observers.read().iter() {
            observer.instantiation_failed(definition, error);
        }
    }

    pub(crate) fn instance_destroyed(&self, definition: &str) {
        for observer in self.observers.read().iter() {
            observer.instance_destroyed(definition);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers").field("len", &self.len()).finish()
    }
}

/// Built-in observer that emits `tracing` events.
///
/// Instantiation and teardown are logged at `debug`, registry creation at
/// `trace`, constructor failures at `warn`. Every event carries the observer's
/// prefix in its `locator` field.
///
/// # Examples
///
/// ```
/// use ferrous_services::{LoggingObserver, RegistryCache};
/// use std::sync::Arc;
///
/// let cache = RegistryCache::new();
/// cache.add_observer(Arc::new(LoggingObserver::with_prefix("billing")));
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    /// Creates a new logging observer with default prefix.
    pub fn new() -> Self {
        Self {
            prefix: "ferrous-services".to_string(),
        }
    }

    /// Creates a new logging observer with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceObserver for LoggingObserver {
    fn registry_created(&self, owner: &Owner) {
        tracing::trace!(locator = %self.prefix, owner = %owner.label(), id = %owner.id(), "registry created");
    }

    fn instantiating(&self, definition: &str) {
        tracing::debug!(locator = %self.prefix, definition, "instantiating service");
    }

    fn instantiated(&self, definition: &str, duration: Duration) {
        tracing::debug!(locator = %self.prefix, definition, ?duration, "service instantiated");
    }

    fn instantiation_failed(&self, definition: &str, error: &ServiceError) {
        tracing::warn!(locator = %self.prefix, definition, %error, "service construction failed");
    }

    fn instance_destroyed(&self, definition: &str) {
        tracing::debug!(locator = %self.prefix, definition, "service destroyed");
    }
}
