//! Internal queue of scheduled destructors.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

/// Future type for async destructors.
pub(crate) type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Boxed synchronous destructor.
pub(crate) type SyncDestructor = Box<dyn FnOnce() + Send>;

/// Boxed asynchronous destructor.
pub(crate) type AsyncDestructor = Box<dyn FnOnce() -> BoxFutureUnit + Send>;

/// One unit of scheduled teardown work.
pub(crate) enum Job {
    Sync(SyncDestructor),
    Async(AsyncDestructor),
}

/// FIFO queue of destructors scheduled by `destroy()`.
///
/// Destroying a node only schedules its destructors; draining happens when the
/// lifecycle settles. Jobs run in the order they were scheduled, which puts a
/// child's destructors ahead of its parent's.
#[derive(Default)]
pub(crate) struct DestroyQueue {
    jobs: VecDeque<Job>,
}

impl DestroyQueue {
    /// Schedules a job at the back of the queue.
    pub(crate) fn push(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    /// Takes the next job off the front of the queue.
    pub(crate) fn pop(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    /// Puts a job back at the front of the queue.
    pub(crate) fn push_front(&mut self, job: Job) {
        self.jobs.push_front(job);
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if no work is scheduled.
    pub(crate) fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
