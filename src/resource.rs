//! Owner-bound managed values with cleanup hooks.
//!
//! [`resource`] turns a factory into a lazily computed value whose cleanups run
//! when the value is invalidated or when its owner is destroyed. The service
//! registry builds every instance through one of these.

use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::error::ServiceResult;
use crate::internal::sync::Mutex;
use crate::lifecycle::Destroyable;

/// Boxed cleanup callback.
pub type Cleanup = Box<dyn FnOnce() + Send>;

type ResourceFactory<T> = Box<dyn Fn(&mut ResourceApi) -> ServiceResult<T> + Send + Sync>;

/// Hook registration handed to a resource factory.
#[derive(Default)]
pub struct On {
    cleanups: Vec<Cleanup>,
}

impl On {
    /// Registers `f` to run when the computed value is discarded.
    pub fn cleanup<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cleanups.push(Box::new(f));
    }
}

/// Argument of a resource factory: `api.on.cleanup(...)`.
#[derive(Default)]
pub struct ResourceApi {
    pub on: On,
}

/// A lazily computed value owned by a destroyable.
///
/// # Examples
///
/// ```
/// use ferrous_services::{resource, Lifecycle};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let lifecycle = Lifecycle::new();
/// let owner = lifecycle.owner("app");
/// let closed = Arc::new(AtomicUsize::new(0));
///
/// let counter = closed.clone();
/// let socket = resource(&owner, move |api| {
///     let counter = counter.clone();
///     api.on.cleanup(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     });
///     Ok(Arc::new("socket"))
/// });
///
/// assert!(!socket.is_computed());
/// assert_eq!(*socket.current().unwrap(), "socket");
///
/// owner.destroy();
/// lifecycle.settle();
/// assert_eq!(closed.load(Ordering::SeqCst), 1);
/// ```
pub struct Resource<T> {
    destroyable: Destroyable,
    factory: ResourceFactory<T>,
    state: Arc<Mutex<ResourceState<T>>>,
}

struct ResourceState<T> {
    value: Option<T>,
    cleanups: Vec<Cleanup>,
    torn_down: bool,
}

/// Creates a managed value owned by `owner`.
///
/// The factory does not run until [`Resource::current`] is first called.
pub fn resource<T, F>(owner: &Destroyable, factory: F) -> Resource<T>
where
    T: Clone + Send + 'static,
    F: Fn(&mut ResourceApi) -> ServiceResult<T> + Send + Sync + 'static,
{
    let destroyable = owner.sibling(format!("{}::resource", owner.label()));
    owner.associate_child(&destroyable);

    let state = Arc::new(Mutex::new(ResourceState {
        value: None,
        cleanups: Vec::new(),
        torn_down: false,
    }));

    let teardown = state.clone();
    destroyable.register_destructor(move || {
        let cleanups = {
            let mut state = teardown.lock();
            state.torn_down = true;
            mem::take(&mut state.cleanups)
        };
        run_cleanups(cleanups);
    });

    Resource {
        destroyable,
        factory: Box::new(factory),
        state,
    }
}

impl<T: Clone + Send + 'static> Resource<T> {
    /// Returns the value, computing it on first access.
    ///
    /// A factory error is returned as is and nothing is memoised, so the next
    /// call runs the factory again. After teardown the last value stays
    /// readable.
    pub fn current(&self) -> ServiceResult<T> {
        let mut state = self.state.lock();
        if let Some(value) = &state.value {
            return Ok(value.clone());
        }

        let mut api = ResourceApi::default();
        let value = match (self.factory)(&mut api) {
            Ok(value) => value,
            Err(err) => {
                drop(state);
                run_cleanups(api.on.cleanups);
                return Err(err);
            }
        };

        if state.torn_down {
            tracing::debug!(
                resource = %self.destroyable.label(),
                "value computed after teardown; its cleanups will not run"
            );
        } else {
            state.cleanups = api.on.cleanups;
        }
        state.value = Some(value.clone());
        Ok(value)
    }

    /// Discards the current value and runs its cleanups.
    ///
    /// The next [`current`](Self::current) recomputes. Has no effect after
    /// teardown.
    pub fn invalidate(&self) {
        let cleanups = {
            let mut state = self.state.lock();
            if state.torn_down {
                return;
            }
            state.value = None;
            mem::take(&mut state.cleanups)
        };
        run_cleanups(cleanups);
    }

    pub fn is_computed(&self) -> bool {
        self.state.lock().value.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.lock().torn_down
    }

    /// The destroyable tying this resource to its owner.
    pub fn destroyable(&self) -> &Destroyable {
        &self.destroyable
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Resource")
            .field("destroyable", &self.destroyable)
            .field("computed", &state.value.is_some())
            .field("torn_down", &state.torn_down)
            .finish()
    }
}

fn run_cleanups(cleanups: Vec<Cleanup>) {
    for cleanup in cleanups {
        cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::lifecycle::Lifecycle;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(
        owner: &Destroyable,
        runs: Arc<AtomicUsize>,
        cleanups: Arc<AtomicUsize>,
    ) -> Resource<usize> {
        resource(owner, move |api| {
            let n = runs.fetch_add(1, Ordering::SeqCst) + 1;
            let cleanups = cleanups.clone();
            api.on.cleanup(move || {
                cleanups.fetch_add(1, Ordering::SeqCst);
            });
            Ok(n)
        })
    }

    #[test]
    fn factory_runs_lazily_and_once() {
        let lifecycle = Lifecycle::new();
        let owner = lifecycle.owner("owner");
        let runs = Arc::new(AtomicUsize::new(0));
        let value = counting(&owner, runs.clone(), Arc::new(AtomicUsize::new(0)));

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(value.current().unwrap(), 1);
        assert_eq!(value.current().unwrap(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_runs_cleanups_and_recomputes() {
        let lifecycle = Lifecycle::new();
        let owner = lifecycle.owner("owner");
        let cleanups = Arc::new(AtomicUsize::new(0));
        let value = counting(&owner, Arc::new(AtomicUsize::new(0)), cleanups.clone());

        assert_eq!(value.current().unwrap(), 1);
        value.invalidate();
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert!(!value.is_computed());
        assert_eq!(value.current().unwrap(), 2);
    }

    #[test]
    fn owner_teardown_runs_cleanups_once() {
        let lifecycle = Lifecycle::new();
        let owner = lifecycle.owner("owner");
        let cleanups = Arc::new(AtomicUsize::new(0));
        let value = counting(&owner, Arc::new(AtomicUsize::new(0)), cleanups.clone());
        value.current().unwrap();

        owner.destroy();
        lifecycle.settle();
        value.invalidate();

        assert!(value.is_torn_down());
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(value.current().unwrap(), 1);
    }

    #[test]
    fn uncomputed_resource_has_nothing_to_clean() {
        let lifecycle = Lifecycle::new();
        let owner = lifecycle.owner("owner");
        let cleanups = Arc::new(AtomicUsize::new(0));
        let _value = counting(&owner, Arc::new(AtomicUsize::new(0)), cleanups.clone());

        owner.destroy();
        lifecycle.settle();

        assert_eq!(cleanups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_factory_is_retried() {
        let lifecycle = Lifecycle::new();
        let owner = lifecycle.owner("owner");
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let flaky = resource(&owner, move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ServiceError::custom("first attempt fails"))
            } else {
                Ok(42u32)
            }
        });

        assert_eq!(flaky.current().unwrap_err().to_string(), "first attempt fails");
        assert!(!flaky.is_computed());
        assert_eq!(flaky.current().unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
