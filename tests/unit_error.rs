use ferrous_services::{ServiceError, ServiceResult};
use std::error::Error;

#[test]
fn test_no_owner_message_names_the_definition() {
    let err = ServiceError::NoOwner("MyService");
    assert_eq!(
        err.to_string(),
        "Hosting object for service(MyService) does not have an owner. \
         Please set the owner via set_owner before reading the service"
    );
}

#[test]
fn test_error_display() {
    assert_eq!(
        ServiceError::AlreadyRegistered("Cache").to_string(),
        "Cannot re-register the same service: Cache"
    );
    assert_eq!(
        ServiceError::TypeMismatch("Cache").to_string(),
        "Type mismatch for: Cache"
    );
    assert_eq!(
        ServiceError::Circular(vec!["A", "B", "C", "A"]).to_string(),
        "Circular dependency: A -> B -> C -> A"
    );
    assert_eq!(
        ServiceError::DepthExceeded(64).to_string(),
        "Max depth 64 exceeded"
    );
    assert_eq!(
        ServiceError::Config("max_depth must be at least 1".into()).to_string(),
        "Invalid configuration: max_depth must be at least 1"
    );
}

#[test]
fn test_custom_errors_are_transparent() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml missing");
    let err = ServiceError::custom(io);

    assert_eq!(err.to_string(), "config.toml missing");
    assert!(err.source().is_none());
    match err {
        ServiceError::Custom(inner) => {
            let io = inner.downcast::<std::io::Error>().unwrap();
            assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn test_result_alias_works_with_question_mark() {
    fn inner() -> ServiceResult<u8> {
        Err(ServiceError::custom("inner failed"))
    }

    fn outer() -> ServiceResult<u8> {
        let value = inner()?;
        Ok(value + 1)
    }

    assert_eq!(outer().unwrap_err().to_string(), "inner failed");
}

#[test]
fn test_errors_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<ServiceError>();
}
