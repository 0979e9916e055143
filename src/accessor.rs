//! The service injection point.
//!
//! [`service`] turns a definition into a [`ServiceAccessor`]: a read-only,
//! lazy handle that any hosting object with an owner can read through. All
//! hosts sharing an owner see the same instance; hosts under different owners
//! never do.

use std::fmt;
use std::sync::Arc;

use crate::definition::Definition;
use crate::error::{ServiceError, ServiceResult};
use crate::lifecycle::HasOwner;
use crate::registry::RegistryCache;

/// Declares an owner-scoped service.
///
/// Declaring the accessor creates nothing; the instance is built on the first
/// [`get`](ServiceAccessor::get) under a given owner.
///
/// # Examples
///
/// ```
/// use ferrous_services::{service, Definition, HasOwner, Lifecycle, Owner, OwnerCell};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Counter {
///     data: AtomicUsize,
/// }
///
/// #[derive(Default)]
/// struct Widget {
///     owner: OwnerCell,
/// }
///
/// impl HasOwner for Widget {
///     fn owner(&self) -> Option<Owner> {
///         self.owner.get()
///     }
/// }
///
/// let counter = service(Definition::<Counter>::of());
/// let lifecycle = Lifecycle::new();
/// let app = lifecycle.owner("app");
///
/// let first = Widget::default();
/// let second = Widget::default();
/// first.owner.set(&app);
/// second.owner.set(&app);
///
/// counter.get(&first).unwrap().data.fetch_add(1, Ordering::SeqCst);
/// assert_eq!(counter.get(&second).unwrap().data.load(Ordering::SeqCst), 1);
/// ```
pub fn service<S>(definition: Definition<S>) -> ServiceAccessor<S>
where
    S: Send + Sync + 'static,
{
    ServiceAccessor::new(definition)
}

/// Lazy, owner-scoped, read-only access to one service definition.
pub struct ServiceAccessor<S> {
    definition: Definition<S>,
    cache: Option<Arc<RegistryCache>>,
}

impl<S> ServiceAccessor<S>
where
    S: Send + Sync + 'static,
{
    /// Creates an accessor backed by the process-wide cache.
    pub fn new(definition: Definition<S>) -> Self {
        Self {
            definition,
            cache: None,
        }
    }

    /// Resolves through `cache` instead of the process-wide cache.
    pub fn with_cache(mut self, cache: Arc<RegistryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn definition(&self) -> &Definition<S> {
        &self.definition
    }

    /// Returns the instance for `host`'s owner, creating it on first access.
    ///
    /// Fails with [`ServiceError::NoOwner`] if `host` has no owner yet.
    /// Constructor errors are returned unchanged.
    pub fn get<H>(&self, host: &H) -> ServiceResult<Arc<S>>
    where
        H: HasOwner + ?Sized,
    {
        let owner = host
            .owner()
            .ok_or(ServiceError::NoOwner(self.definition.name()))?;
        let registry = self.cache().ensure_registry(&owner);
        registry.get(&self.definition)
    }

    /// Like [`get`](Self::get), panicking on failure.
    ///
    /// Use this where a missing owner is a programming error.
    pub fn get_required<H>(&self, host: &H) -> Arc<S>
    where
        H: HasOwner + ?Sized,
    {
        self.get(host)
            .unwrap_or_else(|e| panic!("Failed to resolve service {}: {}", self.definition.name(), e))
    }

    fn cache(&self) -> &RegistryCache {
        match &self.cache {
            Some(cache) => cache,
            None => RegistryCache::global(),
        }
    }
}

impl<S> Clone for ServiceAccessor<S> {
    fn clone(&self) -> Self {
        Self {
            definition: self.definition.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S> fmt::Debug for ServiceAccessor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccessor")
            .field("definition", &self.definition)
            .field("global", &self.cache.is_none())
            .finish()
    }
}
