//! Definition identity keys.

use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

bitflags! {
    /// How a class-like definition builds and tears down its instance.
    ///
    /// The empty set is the plain `Default` definition. Definitions of the
    /// same type with different variants are distinct services.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeVariant: u8 {
        /// Built through `Construct` instead of `Default`
        const CONSTRUCT = 1 << 0;
        /// Carries a `Destroy` hook
        const DESTROY = 1 << 1;
        /// Carries an `AsyncDestroy` hook
        const ASYNC_DESTROY = 1 << 2;
    }
}

/// Identity of a service definition.
///
/// Definitions are compared by identity, never by name or structure:
///
/// - **Type**: class-like definitions, identified by the `TypeId` of the
///   service type and the [`TypeVariant`] it is built with. Every
///   `Definition::of::<T>()` names the same service.
/// - **Object**: value-identity definitions built from a closure. Each one is
///   assigned a fresh id, so two definitions with the same name stay distinct.
///
/// The `&'static str` is carried for diagnostics only and takes no part in
/// equality or hashing.
///
/// # Examples
///
/// ```rust
/// use ferrous_services::{key_of_type, DefinitionKey, TypeVariant};
///
/// struct Cache;
///
/// assert_eq!(key_of_type::<Cache>(), key_of_type::<Cache>());
/// assert_ne!(
///     key_of_type::<Cache>(),
///     key_of_type::<Cache>().with_variant(TypeVariant::DESTROY)
/// );
/// assert_ne!(DefinitionKey::object("cache"), DefinitionKey::object("cache"));
/// ```
#[derive(Debug, Clone, Copy)]
pub enum DefinitionKey {
    /// Service type identity with its variant and type name
    Type(TypeId, TypeVariant, &'static str),
    /// Object identity with a display label
    Object(u64, &'static str),
}

impl DefinitionKey {
    /// Allocates a fresh object identity.
    pub fn object(name: &'static str) -> Self {
        DefinitionKey::Object(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed), name)
    }

    /// Key of a definition that differs from `self` by `variant`.
    ///
    /// Type keys gain the variant bits, so the result is stable across
    /// definitions built the same way. Object keys get a fresh identity.
    pub fn with_variant(self, variant: TypeVariant) -> Self {
        match self {
            DefinitionKey::Type(id, current, name) => DefinitionKey::Type(id, current | variant, name),
            DefinitionKey::Object(_, name) => DefinitionKey::object(name),
        }
    }

    /// Get the type name or label for display
    pub fn display_name(&self) -> &'static str {
        match self {
            DefinitionKey::Type(_, _, name) => name,
            DefinitionKey::Object(_, name) => name,
        }
    }
}

impl PartialEq for DefinitionKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DefinitionKey::Type(a, va, _), DefinitionKey::Type(b, vb, _)) => a == b && va == vb,
            (DefinitionKey::Object(a, _), DefinitionKey::Object(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for DefinitionKey {}

// Names are ignored so renamed labels never split an identity
impl std::hash::Hash for DefinitionKey {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            DefinitionKey::Type(id, variant, _) => {
                0u8.hash(state);
                id.hash(state);
                variant.hash(state);
            }
            DefinitionKey::Object(id, _) => {
                1u8.hash(state);
                id.hash(state);
            }
        }
    }
}

/// Key naming the plain class-like definition of `T`.
#[inline(always)]
pub fn key_of_type<T: 'static>() -> DefinitionKey {
    DefinitionKey::Type(
        TypeId::of::<T>(),
        TypeVariant::empty(),
        std::any::type_name::<T>(),
    )
}
