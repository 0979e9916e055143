//! Teardown hook traits.

mod destroy;

pub use destroy::{AsyncDestroy, Destroy};
