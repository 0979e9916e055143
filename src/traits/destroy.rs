//! Teardown traits for service instances.

/// Trait for synchronous service teardown.
///
/// Implement this for services that flush or release something when their
/// owner goes away, then build the definition with
/// [`Definition::destroyable`](crate::Definition::destroyable). The hook runs
/// once, when the owner is destroyed and its lifecycle settles.
///
/// # Examples
///
/// ```
/// use ferrous_services::{Definition, Destroy};
///
/// #[derive(Default)]
/// struct Cache {
///     name: String,
/// }
///
/// impl Destroy for Cache {
///     fn destroy(&self) {
///         println!("Flushing cache: {}", self.name);
///     }
/// }
///
/// let cache = Definition::<Cache>::of().destroyable();
/// assert!(cache.info().has_teardown());
/// ```
pub trait Destroy: Send + Sync + 'static {
    /// Perform synchronous cleanup.
    fn destroy(&self);
}

/// Trait for asynchronous service teardown.
///
/// Async hooks are driven by [`Lifecycle::settled`](crate::Lifecycle::settled).
///
/// # Examples
///
/// ```
/// use ferrous_services::{AsyncDestroy, Definition};
/// use async_trait::async_trait;
///
/// #[derive(Default)]
/// struct DatabaseClient {
///     connection_id: String,
/// }
///
/// #[async_trait]
/// impl AsyncDestroy for DatabaseClient {
///     async fn destroy(&self) {
///         println!("Closing database connection: {}", self.connection_id);
///     }
/// }
///
/// let client = Definition::<DatabaseClient>::of().async_destroyable();
/// assert!(client.info().has_teardown());
/// ```
#[async_trait::async_trait]
pub trait AsyncDestroy: Send + Sync + 'static {
    /// Perform asynchronous cleanup.
    async fn destroy(&self);
}
