//! Creation strategies for definitions.
//!
//! A [`ServiceManager`] decides whether it can handle a definition and, if so,
//! how to instantiate it. The registry currently always creates instances
//! through [`ConstructManager`]; the seam exists so another strategy can be
//! substituted without touching the registry's caching.

use crate::context::ServiceContext;
use crate::definition::{Definition, DefinitionInfo};
use crate::error::ServiceResult;
use crate::key::DefinitionKey;

/// Strategy for instantiating definitions.
pub trait ServiceManager {
    /// Returns true if this manager can create `definition`.
    fn matches(&self, definition: &DefinitionInfo) -> bool;

    /// Creates an instance of `definition`.
    fn create<S>(&self, definition: &Definition<S>, cx: &ServiceContext<'_>) -> ServiceResult<S>
    where
        S: Send + Sync + 'static;
}

/// Default strategy: call the definition's constructor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstructManager;

impl ServiceManager for ConstructManager {
    fn matches(&self, definition: &DefinitionInfo) -> bool {
        definition.is_constructible()
    }

    fn create<S>(&self, definition: &Definition<S>, cx: &ServiceContext<'_>) -> ServiceResult<S>
    where
        S: Send + Sync + 'static,
    {
        definition.construct(cx)
    }
}

/// Strategy for resource-like definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceManager;

impl ServiceManager for ResourceManager {
    fn matches(&self, definition: &DefinitionInfo) -> bool {
        is_resource_definition(definition)
    }

    fn create<S>(&self, definition: &Definition<S>, cx: &ServiceContext<'_>) -> ServiceResult<S>
    where
        S: Send + Sync + 'static,
    {
        definition.construct(cx)
    }
}

/// True for definitions carrying the resource marker.
pub fn is_resource_definition(definition: &DefinitionInfo) -> bool {
    definition.is_resource()
}

/// True for type-identity definitions that can be constructed.
pub fn is_class_definition(definition: &DefinitionInfo) -> bool {
    matches!(definition.key(), DefinitionKey::Type(..)) && definition.is_constructible()
}
