//! Context handed to service constructors.

use std::future::Future;
use std::sync::Arc;

use crate::definition::{Definition, DefinitionInfo};
use crate::error::ServiceResult;
use crate::lifecycle::{Destroyable, HasOwner, Owner};
use crate::registry::ServiceRegistry;

/// Context passed to constructors while an instance is being built.
///
/// It exposes the owner the instance is scoped to, resolves sibling services
/// from the same registry, and registers destructors on the instance itself.
/// Destructors run once, when the owner is destroyed and its lifecycle has
/// settled.
///
/// # Examples
///
/// ```
/// use ferrous_services::{Definition, Lifecycle, RegistryCache};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Database {
///     url: String,
/// }
///
/// struct Repository {
///     db: Arc<Database>,
/// }
///
/// let repository = Definition::from_fn("Repository", |cx| {
///     let db = cx.get(&Definition::<Database>::of())?;
///     cx.register_destructor(|| println!("repository closed"));
///     Ok(Repository { db })
/// });
///
/// let lifecycle = Lifecycle::new();
/// let owner = lifecycle.owner("app");
/// let registry = RegistryCache::new().ensure_registry(&owner);
///
/// let repo = registry.get(&repository).unwrap();
/// let db = registry.get(&Definition::<Database>::of()).unwrap();
/// assert!(Arc::ptr_eq(&repo.db, &db));
/// ```
pub struct ServiceContext<'a> {
    registry: &'a ServiceRegistry,
    instance: &'a Destroyable,
    definition: DefinitionInfo,
}

impl<'a> ServiceContext<'a> {
    pub(crate) fn new(
        registry: &'a ServiceRegistry,
        instance: &'a Destroyable,
        definition: DefinitionInfo,
    ) -> Self {
        Self {
            registry,
            instance,
            definition,
        }
    }

    /// The owner the instance is scoped to.
    pub fn owner(&self) -> Option<Owner> {
        self.registry.owner()
    }

    pub fn definition(&self) -> &DefinitionInfo {
        &self.definition
    }

    pub fn definition_name(&self) -> &'static str {
        self.definition.name()
    }

    /// Resolves another service under the same owner.
    pub fn get<T>(&self, definition: &Definition<T>) -> ServiceResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.registry.get(definition)
    }

    /// The registry building this instance.
    pub fn registry(&self) -> &ServiceRegistry {
        self.registry
    }

    /// Registers a destructor on the instance being built.
    pub fn register_destructor<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.instance.register_destructor(f);
    }

    /// Registers an async destructor on the instance being built.
    pub fn register_async_destructor<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.instance.register_async_destructor(f);
    }
}
