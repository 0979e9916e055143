//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod destroy_queue;
pub(crate) mod sync;

pub(crate) use circular::StackGuard;
pub(crate) use destroy_queue::{DestroyQueue, Job};
