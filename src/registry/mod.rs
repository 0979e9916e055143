//! Per-owner service registries.
//!
//! A [`ServiceRegistry`] maps definitions to the singleton built for its owner.
//! Instances are created lazily on the first [`get`](ServiceRegistry::get)
//! through a [`Resource`], whose cleanup destroys the instance when the
//! registry (and therefore the owner) is destroyed.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use crate::context::ServiceContext;
use crate::definition::Definition;
use crate::error::{ServiceError, ServiceResult};
use crate::internal::sync::Mutex;
use crate::internal::StackGuard;
use crate::key::DefinitionKey;
use crate::lifecycle::{Destroyable, HasOwner, Owner, WeakDestroyable};
use crate::manager::{ConstructManager, ServiceManager};
use crate::observer::Observers;
use crate::resource::{resource, Resource, ResourceApi};

mod cache;

pub use cache::{ensure_registry, RegistryCache};

type AnyArc = Arc<dyn Any + Send + Sync>;

// One slot per definition; empty until a construction succeeds
#[derive(Default)]
struct Slot {
    value: Mutex<Option<AnyArc>>,
    ready: AtomicBool,
}

type Managed<S> = Resource<Arc<S>>;

/// Registry of singletons for one owner.
///
/// Obtained from [`RegistryCache::ensure_registry`]. The registry is attached
/// to its owner as a destroyable child, so destroying the owner tears down
/// every instance it created, each exactly once.
///
/// # Thread Safety
///
/// The definition map is locked only to find a definition's slot. The
/// check-then-create sequence for one definition is serialised on that slot,
/// so two threads asking for the same service get the same instance and the
/// constructor runs once. Constructors resolving other services through
/// [`ServiceContext::get`] do not contend with unrelated definitions.
///
/// # Deadlocks
///
/// A definition's slot stays locked while its constructor runs. A cycle on
/// one thread is reported as [`ServiceError::Circular`], but a cycle split
/// across threads is not detected: if thread 1 builds A, which needs B, while
/// thread 2 builds B, which needs A, both threads block forever. Break such
/// cycles, or resolve one side up front on a single thread.
///
/// # Examples
///
/// ```
/// use ferrous_services::{Definition, Lifecycle, RegistryCache, ServiceError};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Metrics;
///
/// let lifecycle = Lifecycle::new();
/// let owner = lifecycle.owner("app");
/// let registry = RegistryCache::new().ensure_registry(&owner);
/// let metrics = Definition::<Metrics>::of();
///
/// let a = registry.get(&metrics).unwrap();
/// let b = registry.get(&metrics).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// assert!(matches!(
///     registry.register(&metrics),
///     Err(ServiceError::AlreadyRegistered(_))
/// ));
/// ```
pub struct ServiceRegistry {
    me: Weak<ServiceRegistry>,
    node: Destroyable,
    owner: WeakDestroyable,
    slots: Mutex<HashMap<DefinitionKey, Arc<Slot>>>,
    observers: Arc<Observers>,
    max_depth: usize,
}

impl ServiceRegistry {
    pub(crate) fn new(owner: &Owner, observers: Arc<Observers>, max_depth: usize) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            node: owner.sibling(format!("{}::services", owner.label())),
            owner: owner.downgrade(),
            slots: Mutex::new(HashMap::new()),
            observers,
            max_depth,
        })
    }

    /// Returns the instance for `definition`, creating it on first request.
    ///
    /// Constructor errors are returned unchanged and leave the definition
    /// unregistered, so a later call retries.
    pub fn get<S>(&self, definition: &Definition<S>) -> ServiceResult<Arc<S>>
    where
        S: Send + Sync + 'static,
    {
        let _guard = StackGuard::enter(self.id(), definition.key(), self.max_depth)?;
        let slot = self.slot(definition.key());
        let mut entry = slot.value.lock();

        let existing = entry
            .as_ref()
            .map(|stored| downcast::<S>(stored, definition.name()));
        let managed = match existing {
            Some(found) => found?,
            None => {
                let managed = self.register_into(&mut entry, definition)?;
                slot.ready.store(true, Ordering::Release);
                managed
            }
        };
        drop(entry);

        managed.current()
    }

    /// Instantiates and stores `definition`.
    ///
    /// Fails with [`ServiceError::AlreadyRegistered`] if the definition is
    /// already registered; an existing instance is never replaced.
    pub fn register<S>(&self, definition: &Definition<S>) -> ServiceResult<()>
    where
        S: Send + Sync + 'static,
    {
        let _guard = StackGuard::enter(self.id(), definition.key(), self.max_depth)?;
        let slot = self.slot(definition.key());
        let mut entry = slot.value.lock();

        if entry.is_some() {
            return Err(ServiceError::AlreadyRegistered(definition.name()));
        }
        self.register_into(&mut entry, definition)?;
        slot.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Returns true if an instance for `definition` exists.
    ///
    /// Does not wait for a construction in progress on another thread.
    pub fn contains<S>(&self, definition: &Definition<S>) -> bool {
        self.contains_key(&definition.key())
    }

    pub fn contains_key(&self, key: &DefinitionKey) -> bool {
        self.slots
            .lock()
            .get(key)
            .is_some_and(|slot| slot.ready.load(Ordering::Acquire))
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.ready.load(Ordering::Acquire))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The destroyable attached beneath the owner.
    pub fn destroyable(&self) -> &Destroyable {
        &self.node
    }

    pub fn id(&self) -> u64 {
        self.node.id().as_u64()
    }

    fn slot(&self, key: DefinitionKey) -> Arc<Slot> {
        self.slots.lock().entry(key).or_default().clone()
    }

    fn register_into<S>(
        &self,
        entry: &mut Option<AnyArc>,
        definition: &Definition<S>,
    ) -> ServiceResult<Arc<Managed<S>>>
    where
        S: Send + Sync + 'static,
    {
        let registry = self.me.clone();
        let factory_definition = definition.clone();
        let managed = resource(&self.node, move |api| {
            let registry = registry
                .upgrade()
                .ok_or(ServiceError::RegistryDropped(factory_definition.name()))?;
            registry.instantiate(&factory_definition, api)
        });

        // Force the value now so a failed construction never reaches the map
        if let Err(err) = managed.current() {
            managed.destroyable().detach();
            return Err(err);
        }

        let managed = Arc::new(managed);
        *entry = Some(managed.clone() as AnyArc);
        Ok(managed)
    }

    fn instantiate<S>(&self, definition: &Definition<S>, api: &mut ResourceApi) -> ServiceResult<Arc<S>>
    where
        S: Send + Sync + 'static,
    {
        let name = definition.name();
        let node = self.node.sibling(name);
        let cx = ServiceContext::new(self, &node, *definition.info());

        let observing = self.observers.has_observers();
        if observing {
            self.observers.instantiating(name);
        }
        let started = Instant::now();

        let instance = match ConstructManager.create(definition, &cx) {
            Ok(instance) => Arc::new(instance),
            Err(err) => {
                if observing {
                    self.observers.instantiation_failed(name, &err);
                }
                return Err(err);
            }
        };
        if observing {
            self.observers.instantiated(name, started.elapsed());
        }

        definition.attach_teardown(&instance, &node);
        let observers = self.observers.clone();
        node.register_destructor(move || observers.instance_destroyed(name));

        api.on.cleanup(move || node.destroy());
        Ok(instance)
    }
}

impl HasOwner for ServiceRegistry {
    fn owner(&self) -> Option<Owner> {
        self.owner.upgrade()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("node", &self.node)
            .field("owner", &self.owner)
            .field("len", &self.len())
            .finish()
    }
}

fn downcast<S>(stored: &AnyArc, name: &'static str) -> ServiceResult<Arc<Managed<S>>>
where
    S: Send + Sync + 'static,
{
    stored
        .clone()
        .downcast::<Managed<S>>()
        .map_err(|_| ServiceError::TypeMismatch(name))
}
