//! Service definitions: what a registry instantiates, and under which identity.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::context::ServiceContext;
use crate::error::ServiceResult;
use crate::key::{key_of_type, DefinitionKey, TypeVariant};
use crate::lifecycle::Destroyable;
use crate::traits::{AsyncDestroy, Destroy};

bitflags! {
    /// Capability markers attached to a definition when it is created.
    ///
    /// Kind checks are membership tests on this set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Can be instantiated with no arguments beyond a [`ServiceContext`]
        const CONSTRUCTIBLE = 1 << 0;
        /// Built from a resource-style factory function
        const RESOURCE = 1 << 1;
        /// Carries a teardown hook for its instances
        const TEARDOWN = 1 << 2;
    }
}

/// Services that know how to construct themselves.
///
/// This is the fallible counterpart of `Default`: the error is returned to the
/// caller of the accessor unchanged, and nothing is cached, so the next access
/// tries again.
///
/// # Examples
///
/// ```
/// use ferrous_services::{Construct, Definition, ServiceContext, ServiceError, ServiceResult};
///
/// struct Settings {
///     path: String,
/// }
///
/// impl Construct for Settings {
///     fn construct(cx: &ServiceContext<'_>) -> ServiceResult<Self> {
///         let path = std::env::var("SETTINGS_PATH").map_err(ServiceError::custom)?;
///         cx.register_destructor(|| println!("settings released"));
///         Ok(Settings { path })
///     }
/// }
///
/// let settings = Definition::<Settings>::constructed();
/// assert!(settings.info().is_constructible());
/// ```
pub trait Construct: Sized + Send + Sync + 'static {
    fn construct(cx: &ServiceContext<'_>) -> ServiceResult<Self>;
}

/// Type-erased view of a definition: its identity and capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionInfo {
    key: DefinitionKey,
    capabilities: Capabilities,
}

impl DefinitionInfo {
    pub fn key(&self) -> DefinitionKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.display_name()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn is_constructible(&self) -> bool {
        self.capabilities.contains(Capabilities::CONSTRUCTIBLE)
    }

    pub fn is_resource(&self) -> bool {
        self.capabilities.contains(Capabilities::RESOURCE)
    }

    pub fn has_teardown(&self) -> bool {
        self.capabilities.contains(Capabilities::TEARDOWN)
    }
}

type Factory<S> = Arc<dyn Fn(&ServiceContext<'_>) -> ServiceResult<S> + Send + Sync>;
type Teardown<S> = Arc<dyn Fn(&Arc<S>, &Destroyable) + Send + Sync>;

/// Names a service and how to create it.
///
/// Definitions are compared by identity. Class-like definitions
/// ([`of`](Self::of), [`constructed`](Self::constructed)) are identified by
/// the service type and how it is built, so `of()` and
/// `of().destroyable()` name different services. Closure definitions
/// ([`from_fn`](Self::from_fn), [`resource`](Self::resource)) are identified
/// by the value itself: clones share an identity and separately built
/// definitions never do. Adding a new teardown hook yields a new identity.
///
/// # Examples
///
/// ```
/// use ferrous_services::Definition;
///
/// #[derive(Default)]
/// struct Clock;
/// # impl ferrous_services::Destroy for Clock {
/// #     fn destroy(&self) {}
/// # }
///
/// let a = Definition::<Clock>::of();
/// let b = Definition::<Clock>::of();
/// assert_eq!(a.key(), b.key());
///
/// let c = Definition::from_fn("clock", |_| Ok(Clock));
/// let d = Definition::from_fn("clock", |_| Ok(Clock));
/// assert_ne!(c.key(), d.key());
/// assert_eq!(c.key(), c.clone().key());
///
/// assert_ne!(a.key(), Definition::<Clock>::of().destroyable().key());
/// ```
pub struct Definition<S> {
    info: DefinitionInfo,
    factory: Factory<S>,
    teardowns: Vec<Teardown<S>>,
    hooks: TypeVariant,
}

impl<S: Send + Sync + 'static> Definition<S> {
    /// Class-like definition constructed through `Default`.
    pub fn of() -> Self
    where
        S: Default,
    {
        Self::with_factory(
            key_of_type::<S>(),
            Capabilities::CONSTRUCTIBLE,
            Arc::new(construct_default::<S>),
        )
    }

    /// Class-like definition constructed through [`Construct`].
    pub fn constructed() -> Self
    where
        S: Construct,
    {
        Self::with_factory(
            key_of_type::<S>().with_variant(TypeVariant::CONSTRUCT),
            Capabilities::CONSTRUCTIBLE,
            Arc::new(S::construct),
        )
    }

    /// Value-identity definition backed by a constructor closure.
    pub fn from_fn<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&ServiceContext<'_>) -> ServiceResult<S> + Send + Sync + 'static,
    {
        Self::with_factory(
            DefinitionKey::object(name),
            Capabilities::CONSTRUCTIBLE,
            Arc::new(f),
        )
    }

    /// Value-identity definition marked as resource-like.
    ///
    /// Instantiated the same way as [`from_fn`](Self::from_fn); the marker is
    /// visible to [`ServiceManager`](crate::ServiceManager) implementations.
    pub fn resource<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&ServiceContext<'_>) -> ServiceResult<S> + Send + Sync + 'static,
    {
        Self::with_factory(
            DefinitionKey::object(name),
            Capabilities::CONSTRUCTIBLE | Capabilities::RESOURCE,
            Arc::new(f),
        )
    }

    fn with_factory(key: DefinitionKey, capabilities: Capabilities, factory: Factory<S>) -> Self {
        Self {
            info: DefinitionInfo { key, capabilities },
            factory,
            teardowns: Vec::new(),
            hooks: TypeVariant::empty(),
        }
    }

    /// Calls [`Destroy::destroy`] on the instance when it is torn down.
    ///
    /// The result is a distinct definition from `self`. Calling this twice
    /// attaches the hook once.
    pub fn destroyable(self) -> Self
    where
        S: Destroy,
    {
        self.with_teardown(TypeVariant::DESTROY, Arc::new(|instance: &Arc<S>, node: &Destroyable| {
            let instance = instance.clone();
            node.register_destructor(move || instance.destroy());
        }))
    }

    /// Awaits [`AsyncDestroy::destroy`] on the instance when it is torn down.
    ///
    /// Like [`destroyable`](Self::destroyable), yields a distinct definition.
    pub fn async_destroyable(self) -> Self
    where
        S: AsyncDestroy,
    {
        self.with_teardown(TypeVariant::ASYNC_DESTROY, Arc::new(|instance: &Arc<S>, node: &Destroyable| {
            let instance = instance.clone();
            node.register_async_destructor(move || async move { instance.destroy().await });
        }))
    }

    fn with_teardown(mut self, hook: TypeVariant, teardown: Teardown<S>) -> Self {
        if self.hooks.contains(hook) {
            return self;
        }
        self.hooks |= hook;
        self.info.key = self.info.key.with_variant(hook);
        self.info.capabilities |= Capabilities::TEARDOWN;
        self.teardowns.push(teardown);
        self
    }

    /// Runs the definition's constructor.
    pub(crate) fn construct(&self, cx: &ServiceContext<'_>) -> ServiceResult<S> {
        (self.factory)(cx)
    }

    /// Registers teardown hooks for a freshly built instance on its node.
    pub(crate) fn attach_teardown(&self, instance: &Arc<S>, node: &Destroyable) {
        for teardown in &self.teardowns {
            teardown(instance, node);
        }
    }
}

impl<S> Definition<S> {
    pub fn info(&self) -> &DefinitionInfo {
        &self.info
    }

    pub fn key(&self) -> DefinitionKey {
        self.info.key
    }

    /// Diagnostic name: the type name or the label given at creation.
    pub fn name(&self) -> &'static str {
        self.info.name()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.info.capabilities
    }
}

fn construct_default<S: Default>(_: &ServiceContext<'_>) -> ServiceResult<S> {
    Ok(S::default())
}

impl<S> Clone for Definition<S> {
    fn clone(&self) -> Self {
        Self {
            info: self.info,
            factory: self.factory.clone(),
            teardowns: self.teardowns.clone(),
            hooks: self.hooks,
        }
    }
}

impl<S> fmt::Debug for Definition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name())
            .field("capabilities", &self.info.capabilities)
            .finish()
    }
}
