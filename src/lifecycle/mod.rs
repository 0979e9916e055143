//! Destroyable lifecycle: owners, destroy cascades and scheduled destructors.
//!
//! A [`Destroyable`] is any node in a forest of lifecycle scopes. Children are
//! attached with [`Destroyable::associate_child`] and are destroyed with their
//! parent. Destructors are *scheduled* by [`Destroyable::destroy`] and executed
//! when the owning [`Lifecycle`] settles, so code that destroys an owner and
//! then inspects side effects must call [`Lifecycle::settle`] or await
//! [`Lifecycle::settled`] first.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::internal::sync::Mutex;
use crate::internal::{DestroyQueue, Job};

mod owner;

pub use owner::{get_owner, set_owner, HasOwner, OwnerCell};

static NEXT_DESTROYABLE_ID: AtomicU64 = AtomicU64::new(1);

/// A lifecycle scope that services are attached to.
///
/// Any destroyable can act as an owner; the alias documents intent at the
/// API boundary.
pub type Owner = Destroyable;

/// Process-unique identity of a destroyable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestroyableId(u64);

impl DestroyableId {
    fn next() -> Self {
        DestroyableId(NEXT_DESTROYABLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for diagnostics.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DestroyableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Destruction stage of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Not destroyed; children and destructors may be attached
    Live,
    /// `destroy()` was called and destructors are scheduled
    Destroying,
    /// All destructors of this node have run
    Destroyed,
}

/// Destruction scheduler.
///
/// Destroyables created through a lifecycle queue their destructors here.
/// Draining the queue is the "settled" point of the lifecycle:
///
/// - [`settle`](Self::settle) runs synchronous destructors, including ones
///   scheduled while settling, up to the first async destructor.
/// - [`settled`](Self::settled) runs all scheduled work in order, awaiting the
///   async destructors.
///
/// # Examples
///
/// ```
/// use ferrous_services::Lifecycle;
/// use std::sync::{Arc, Mutex};
///
/// let lifecycle = Lifecycle::new();
/// let owner = lifecycle.owner("app");
/// let steps = Arc::new(Mutex::new(Vec::new()));
///
/// let log = steps.clone();
/// owner.register_destructor(move || log.lock().unwrap().push("destroying"));
///
/// owner.destroy();
/// assert!(steps.lock().unwrap().is_empty()); // scheduled, not yet run
///
/// lifecycle.settle();
/// assert_eq!(*steps.lock().unwrap(), vec!["destroying"]);
/// ```
#[derive(Clone, Default)]
pub struct Lifecycle {
    inner: Arc<LifecycleInner>,
}

#[derive(Default)]
struct LifecycleInner {
    queue: Mutex<DestroyQueue>,
}

impl Lifecycle {
    /// Creates a scheduler with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a root destroyable intended to act as an owner.
    pub fn owner(&self, label: impl Into<Cow<'static, str>>) -> Owner {
        self.destroyable(label)
    }

    /// Creates a destroyable whose destructors are scheduled on this lifecycle.
    pub fn destroyable(&self, label: impl Into<Cow<'static, str>>) -> Destroyable {
        Destroyable::with_scheduler(label.into(), Arc::downgrade(&self.inner))
    }

    /// Number of scheduled jobs not yet run.
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Returns true if nothing is waiting to run.
    pub fn is_settled(&self) -> bool {
        self.inner.queue.lock().is_empty()
    }

    /// Runs scheduled synchronous destructors in order.
    ///
    /// Stops at the first async destructor, which keeps its position in the
    /// queue together with everything behind it until the next
    /// [`settled`](Self::settled).
    pub fn settle(&self) {
        loop {
            let mut queue = self.inner.queue.lock();
            match queue.pop() {
                Some(Job::Sync(f)) => {
                    drop(queue);
                    f();
                }
                Some(job) => {
                    queue.push_front(job);
                    break;
                }
                None => break,
            }
        }
    }

    /// Runs all scheduled destructors, awaiting async ones.
    pub async fn settled(&self) {
        loop {
            let job = self.inner.queue.lock().pop();
            match job {
                Some(Job::Sync(f)) => f(),
                Some(Job::Async(f)) => f().await,
                None => break,
            }
        }
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Drop for LifecycleInner {
    fn drop(&mut self) {
        let queue = self.queue.get_mut();
        if !queue.is_empty() {
            tracing::warn!(
                pending = queue.len(),
                "[ferrous-services] Lifecycle dropped with unsettled destructors. \
                 Call settle() or settled().await before dropping."
            );
        }
    }
}

/// Handle to a node of the destroyable forest.
///
/// Handles are cheap to clone and compare by identity. A parent holds its
/// children strongly; a child refers to its parent weakly.
///
/// # Examples
///
/// ```
/// use ferrous_services::Lifecycle;
///
/// let lifecycle = Lifecycle::new();
/// let app = lifecycle.owner("app");
/// let child = lifecycle.destroyable("child");
/// app.associate_child(&child);
///
/// app.destroy();
/// assert!(child.is_destroying());
///
/// lifecycle.settle();
/// assert!(app.is_destroyed() && child.is_destroyed());
/// ```
#[derive(Clone)]
pub struct Destroyable {
    node: Arc<Node>,
}

/// Weak handle to a destroyable.
#[derive(Clone, Default)]
pub struct WeakDestroyable {
    node: Weak<Node>,
}

struct Node {
    id: DestroyableId,
    label: Cow<'static, str>,
    scheduler: Weak<LifecycleInner>,
    state: Mutex<NodeState>,
}

struct NodeState {
    stage: Stage,
    parent: Weak<Node>,
    children: Vec<Destroyable>,
    destructors: Vec<Job>,
}

impl Destroyable {
    /// Creates a destroyable without a scheduler.
    ///
    /// With nothing to schedule on, `destroy()` runs synchronous destructors
    /// inline; async destructors are dropped.
    pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
        Self::with_scheduler(label.into(), Weak::new())
    }

    fn with_scheduler(label: Cow<'static, str>, scheduler: Weak<LifecycleInner>) -> Self {
        Self {
            node: Arc::new(Node {
                id: DestroyableId::next(),
                label,
                scheduler,
                state: Mutex::new(NodeState {
                    stage: Stage::Live,
                    parent: Weak::new(),
                    children: Vec::new(),
                    destructors: Vec::new(),
                }),
            }),
        }
    }

    /// Creates an unattached destroyable on the same scheduler as `self`.
    pub fn sibling(&self, label: impl Into<Cow<'static, str>>) -> Destroyable {
        Self::with_scheduler(label.into(), self.node.scheduler.clone())
    }

    pub fn id(&self) -> DestroyableId {
        self.node.id
    }

    pub fn label(&self) -> &str {
        &self.node.label
    }

    pub fn stage(&self) -> Stage {
        self.node.state.lock().stage
    }

    /// True once `destroy()` has been called, including after it finished.
    pub fn is_destroying(&self) -> bool {
        self.stage() != Stage::Live
    }

    /// True once every destructor of this node has run.
    pub fn is_destroyed(&self) -> bool {
        self.stage() == Stage::Destroyed
    }

    /// The scheduler this node queues destructors on, if it is still alive.
    pub fn lifecycle(&self) -> Option<Lifecycle> {
        self.node.scheduler.upgrade().map(|inner| Lifecycle { inner })
    }

    pub fn downgrade(&self) -> WeakDestroyable {
        WeakDestroyable {
            node: Arc::downgrade(&self.node),
        }
    }

    /// Number of attached children that have not finished destruction.
    pub fn child_count(&self) -> usize {
        self.node.state.lock().children.len()
    }

    /// Attaches `child` so that destroying `self` destroys it.
    ///
    /// A parent that is already destroying does not adopt new children; the
    /// child is left as is and will only be destroyed explicitly.
    pub fn associate_child(&self, child: &Destroyable) {
        if Arc::ptr_eq(&self.node, &child.node) {
            return;
        }
        {
            let mut state = self.node.state.lock();
            if state.stage != Stage::Live {
                tracing::debug!(
                    parent = %self.node.label,
                    child = %child.node.label,
                    "parent already destroying, child left unattached"
                );
                return;
            }
            state.children.push(child.clone());
        }
        child.node.state.lock().parent = Arc::downgrade(&self.node);
    }

    /// Registers a destructor run once when this node is destroyed.
    pub fn register_destructor<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push_destructor(Job::Sync(Box::new(f)));
    }

    /// Registers an async destructor, run by [`Lifecycle::settled`].
    pub fn register_async_destructor<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push_destructor(Job::Async(Box::new(move || Box::pin(f()))));
    }

    fn push_destructor(&self, job: Job) {
        let mut state = self.node.state.lock();
        if state.stage != Stage::Live {
            tracing::warn!(
                destroyable = %self.node.label,
                id = %self.node.id,
                "destructor registered after destroy(); it will not run"
            );
            return;
        }
        state.destructors.push(job);
    }

    /// Destroys this node and, first, all of its children.
    ///
    /// Idempotent: only the first call has an effect. Destructors are
    /// scheduled on the lifecycle rather than run in place.
    pub fn destroy(&self) {
        let (children, mut jobs) = {
            let mut state = self.node.state.lock();
            if state.stage != Stage::Live {
                return;
            }
            state.stage = Stage::Destroying;
            (
                std::mem::take(&mut state.children),
                std::mem::take(&mut state.destructors),
            )
        };

        for child in &children {
            child.destroy();
        }

        let node = self.clone();
        jobs.push(Job::Sync(Box::new(move || node.finish_destroy())));
        self.schedule(jobs);
    }

    fn schedule(&self, jobs: Vec<Job>) {
        match self.node.scheduler.upgrade() {
            Some(scheduler) => {
                let mut queue = scheduler.queue.lock();
                for job in jobs {
                    queue.push(job);
                }
            }
            None => {
                for job in jobs {
                    match job {
                        Job::Sync(f) => f(),
                        Job::Async(_) => tracing::warn!(
                            destroyable = %self.node.label,
                            "no lifecycle to await async destructor; dropped"
                        ),
                    }
                }
            }
        }
    }

    /// Removes this node from its parent's children without destroying it.
    pub(crate) fn detach(&self) {
        let parent = std::mem::take(&mut self.node.state.lock().parent).upgrade();
        if let Some(parent) = parent {
            parent
                .state
                .lock()
                .children
                .retain(|c| !Arc::ptr_eq(&c.node, &self.node));
        }
    }

    fn finish_destroy(&self) {
        self.node.state.lock().stage = Stage::Destroyed;
        self.detach();
    }
}

impl PartialEq for Destroyable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Destroyable {}

impl fmt::Debug for Destroyable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destroyable")
            .field("id", &self.node.id)
            .field("label", &self.node.label)
            .field("stage", &self.stage())
            .finish()
    }
}

impl WeakDestroyable {
    pub fn upgrade(&self) -> Option<Destroyable> {
        self.node.upgrade().map(|node| Destroyable { node })
    }

    /// True while at least one strong handle exists.
    pub fn is_alive(&self) -> bool {
        self.node.strong_count() > 0
    }
}

impl fmt::Debug for WeakDestroyable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(d) => write!(f, "WeakDestroyable({:?})", d),
            None => f.write_str("WeakDestroyable(<dropped>)"),
        }
    }
}
