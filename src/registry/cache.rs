//! Owner to registry association.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::ServiceRegistry;
use crate::config::LocatorConfig;
use crate::internal::sync::Mutex;
use crate::lifecycle::{DestroyableId, Owner, WeakDestroyable};
use crate::observer::{LoggingObserver, Observers, ServiceObserver};

/// Cache of one [`ServiceRegistry`] per owner.
///
/// Entries refer to their owner weakly: an owner that is no longer reachable
/// does not keep its registry alive, and its entry is pruned by the next
/// insertion that finds the cache has doubled since the last sweep (or by
/// [`prune`](Self::prune)). Insertion stays amortised constant time. Destroying an owner does not
/// remove its entry; lookups against a destroyed owner keep returning the same
/// registry.
///
/// # Examples
///
/// ```
/// use ferrous_services::{HasOwner, Lifecycle, RegistryCache};
/// use std::sync::Arc;
///
/// let cache = RegistryCache::new();
/// let lifecycle = Lifecycle::new();
/// let owner = lifecycle.owner("app");
///
/// let first = cache.ensure_registry(&owner);
/// let second = cache.ensure_registry(&owner);
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(first.owner(), Some(owner.clone()));
///
/// owner.destroy();
/// lifecycle.settle();
/// assert!(first.destroyable().is_destroyed());
/// ```
pub struct RegistryCache {
    entries: Mutex<Entries>,
    observers: Arc<Observers>,
    config: LocatorConfig,
}

// Dead entries are swept once the map reaches `prune_at`; after a sweep it is
// reset to twice the number of survivors
struct Entries {
    map: HashMap<DestroyableId, CacheEntry>,
    prune_at: usize,
}

const MIN_PRUNE_AT: usize = 32;

impl Entries {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            prune_at: MIN_PRUNE_AT,
        }
    }

    fn take_dead(&mut self) -> Vec<CacheEntry> {
        let dead: Vec<DestroyableId> = self
            .map
            .iter()
            .filter(|(_, entry)| !entry.owner.is_alive())
            .map(|(id, _)| *id)
            .collect();
        let dead = dead.iter().filter_map(|id| self.map.remove(id)).collect();
        self.prune_at = (self.map.len() * 2).max(MIN_PRUNE_AT);
        dead
    }
}

struct CacheEntry {
    owner: WeakDestroyable,
    registry: Arc<ServiceRegistry>,
}

impl RegistryCache {
    /// Creates an empty cache with the default configuration.
    pub fn new() -> Self {
        Self::with_config(LocatorConfig::default())
    }

    /// Creates an empty cache with `config`.
    ///
    /// A `max_depth` of 0 would reject every lookup; it is raised to 1.
    pub fn with_config(mut config: LocatorConfig) -> Self {
        if config.max_depth == 0 {
            tracing::warn!("max_depth must be at least 1; using 1");
            config.max_depth = 1;
        }
        let observers = Arc::new(Observers::new());
        if config.log_events {
            observers.add(Arc::new(LoggingObserver::new()));
        }
        Self {
            entries: Mutex::new(Entries::new()),
            observers,
            config,
        }
    }

    /// The process-wide cache, configured from the environment on first use.
    pub fn global() -> &'static RegistryCache {
        static GLOBAL: OnceLock<RegistryCache> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let config = LocatorConfig::from_env().unwrap_or_else(|error| {
                tracing::warn!(%error, "invalid locator configuration, using defaults");
                LocatorConfig::default()
            });
            RegistryCache::with_config(config)
        })
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Adds an observer; it also sees events from registries created earlier.
    pub fn add_observer(&self, observer: Arc<dyn ServiceObserver>) {
        self.observers.add(observer);
    }

    /// Returns the registry for `owner`, creating it on first request.
    ///
    /// A new registry records `owner` as its owner and is attached beneath it,
    /// so destroying the owner destroys the registry and its instances.
    pub fn ensure_registry(&self, owner: &Owner) -> Arc<ServiceRegistry> {
        let (registry, dead) = {
            let mut entries = self.entries.lock();
            if let Some(entry) = entries.map.get(&owner.id()) {
                return entry.registry.clone();
            }

            let dead = if entries.map.len() >= entries.prune_at {
                entries.take_dead()
            } else {
                Vec::new()
            };
            let registry = ServiceRegistry::new(owner, self.observers.clone(), self.config.max_depth);
            owner.associate_child(registry.destroyable());
            entries.map.insert(
                owner.id(),
                CacheEntry {
                    owner: owner.downgrade(),
                    registry: registry.clone(),
                },
            );
            (registry, dead)
        };

        // Dropping pruned registries may run service `Drop` impls; keep that
        // outside the lock
        drop(dead);
        self.observers.registry_created(owner);
        registry
    }

    /// Returns the registry for `owner` without creating one.
    pub fn get(&self, owner: &Owner) -> Option<Arc<ServiceRegistry>> {
        self.entries
            .lock()
            .map
            .get(&owner.id())
            .map(|entry| entry.registry.clone())
    }

    /// Removes entries whose owner is gone, returning how many were removed.
    pub fn prune(&self) -> usize {
        let dead = self.entries.lock().take_dead();
        dead.len()
    }

    /// Number of cached registries, including ones awaiting pruning.
    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().map.is_empty()
    }
}

impl Default for RegistryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegistryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCache")
            .field("len", &self.len())
            .field("observers", &self.observers)
            .field("config", &self.config)
            .finish()
    }
}

/// Returns the registry for `owner` from the process-wide cache.
pub fn ensure_registry(owner: &Owner) -> Arc<ServiceRegistry> {
    RegistryCache::global().ensure_registry(owner)
}
