//! # ferrous-services
//!
//! Lazy, owner-scoped service singletons for Rust.
//!
//! A consumer declares a dependency on a [`Definition`] and, on first access
//! through any object that has an owner, receives the singleton for that
//! (owner, definition) pair. The instance is created once, shared by every
//! object under the same owner, and destroyed automatically when the owner is.
//!
//! ## Features
//!
//! - **Lazy**: declaring an accessor or assigning an owner constructs nothing
//! - **Owner-scoped**: one instance per (owner, definition), isolated between owners
//! - **Automatic teardown**: destroying an owner runs each instance's destructors exactly once
//! - **Retry on failure**: a constructor error is returned as is and not cached
//! - **Thread-safe**: at most one instance per (owner, definition), even under contention
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_services::{service, Definition, HasOwner, Lifecycle, Owner, OwnerCell};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! struct MyService {
//!     data: AtomicUsize,
//! }
//!
//! #[derive(Default)]
//! struct Test {
//!     owner: OwnerCell,
//! }
//!
//! impl HasOwner for Test {
//!     fn owner(&self) -> Option<Owner> {
//!         self.owner.get()
//!     }
//! }
//!
//! let foo = service(Definition::<MyService>::of());
//!
//! let lifecycle = Lifecycle::new();
//! let app = lifecycle.owner("app");
//! let my_test = Test::default();
//! my_test.owner.set(&app);
//!
//! assert_eq!(foo.get(&my_test).unwrap().data.load(Ordering::SeqCst), 0);
//! foo.get(&my_test).unwrap().data.fetch_add(1, Ordering::SeqCst);
//! assert_eq!(foo.get(&my_test).unwrap().data.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Teardown
//!
//! Destructors are scheduled when an owner is destroyed and run when its
//! [`Lifecycle`] settles:
//!
//! ```rust
//! use ferrous_services::{service, Definition, Lifecycle, OwnerCell};
//! use std::sync::{Arc, Mutex};
//!
//! struct Tracked;
//!
//! let steps = Arc::new(Mutex::new(Vec::new()));
//! let log = steps.clone();
//! let tracked = service(Definition::from_fn("Tracked", move |cx| {
//!     log.lock().unwrap().push("created");
//!     let log = log.clone();
//!     cx.register_destructor(move || log.lock().unwrap().push("destroying"));
//!     Ok(Tracked)
//! }));
//!
//! let lifecycle = Lifecycle::new();
//! let owner = lifecycle.owner("app");
//! let host = OwnerCell::with_owner(&owner);
//!
//! tracked.get(&host).unwrap();
//! owner.destroy();
//! lifecycle.settle();
//!
//! assert_eq!(*steps.lock().unwrap(), vec!["created", "destroying"]);
//! ```

// Module declarations
pub mod accessor;
pub mod config;
pub mod context;
pub mod definition;
pub mod error;
pub mod key;
pub mod lifecycle;
pub mod manager;
pub mod observer;
pub mod registry;
pub mod resource;
pub mod traits;

// Internal modules
mod internal;

// Re-export core types
pub use accessor::{service, ServiceAccessor};
pub use config::LocatorConfig;
pub use context::ServiceContext;
pub use definition::{Capabilities, Construct, Definition, DefinitionInfo};
pub use error::{BoxError, ServiceError, ServiceResult};
pub use key::{key_of_type, DefinitionKey, TypeVariant};
pub use lifecycle::{
    get_owner, set_owner, Destroyable, DestroyableId, HasOwner, Lifecycle, Owner, OwnerCell,
    Stage, WeakDestroyable,
};
pub use manager::{
    is_class_definition, is_resource_definition, ConstructManager, ResourceManager, ServiceManager,
};
pub use observer::{LoggingObserver, ServiceObserver};
pub use registry::{ensure_registry, RegistryCache, ServiceRegistry};
pub use resource::{resource, Cleanup, On, Resource, ResourceApi};
pub use traits::{AsyncDestroy, Destroy};
