//! Error types for the service locator.

use thiserror::Error;

/// Boxed error type accepted from service constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Service locator errors
///
/// Represents the failure conditions of owner lookup, registration and
/// instantiation. Programming errors (a missing owner, a second registration of
/// the same definition) are reported through this type as well; callers that
/// treat them as fatal use the `*_required` accessors, which panic.
///
/// # Examples
///
/// ```rust
/// use ferrous_services::ServiceError;
///
/// let no_owner = ServiceError::NoOwner("Session");
/// let twice = ServiceError::AlreadyRegistered("Session");
/// let circular = ServiceError::Circular(vec!["A", "B", "A"]);
///
/// assert_eq!(twice.to_string(), "Cannot re-register the same service: Session");
/// assert_eq!(circular.to_string(), "Circular dependency: A -> B -> A");
/// println!("Error: {}", no_owner);
/// ```
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The hosting object has no owner assigned
    #[error(
        "Hosting object for service({0}) does not have an owner. \
         Please set the owner via set_owner before reading the service"
    )]
    NoOwner(&'static str),
    /// The definition was already registered in this registry
    #[error("Cannot re-register the same service: {0}")]
    AlreadyRegistered(&'static str),
    /// The cached instance is not of the requested type
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// A constructor requested a service that is still being constructed
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Nested construction went deeper than the configured limit
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// The registry backing a resource is gone
    #[error("Registry dropped before {0} could be constructed")]
    RegistryDropped(&'static str),
    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Error raised by a service constructor
    #[error(transparent)]
    Custom(BoxError),
}

impl ServiceError {
    /// Wraps an arbitrary constructor error without altering its message.
    pub fn custom<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        ServiceError::Custom(error.into())
    }
}

/// Result type for service operations
///
/// A convenience alias for `Result<T, ServiceError>`.
///
/// ```rust
/// use ferrous_services::{ServiceError, ServiceResult};
///
/// fn open() -> ServiceResult<u32> {
///     Err(ServiceError::custom("connection refused"))
/// }
///
/// assert_eq!(open().unwrap_err().to_string(), "connection refused");
/// ```
pub type ServiceResult<T> = Result<T, ServiceError>;
