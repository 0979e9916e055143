//! Circular construction detection.

use std::cell::RefCell;

use crate::error::{ServiceError, ServiceResult};
use crate::key::DefinitionKey;

// Thread-local construction state: which (registry, definition) pairs are
// currently inside their constructor on this thread
thread_local! {
    static CONSTRUCTION_TLS: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct Frame {
    registry: u64,
    key: DefinitionKey,
}

/// Guard for one frame of the thread-local construction stack.
///
/// Entering a frame that is already on the stack reports the cycle instead of
/// pushing, so a constructor that (transitively) asks for itself fails rather
/// than deadlocking on its own slot.
pub(crate) struct StackGuard {
    frame: Option<Frame>,
}

impl StackGuard {
    pub(crate) fn enter(
        registry: u64,
        key: DefinitionKey,
        max_depth: usize,
    ) -> ServiceResult<Self> {
        CONSTRUCTION_TLS.with(|tls| {
            let mut stack = tls.borrow_mut();
            let frame = Frame { registry, key };

            if stack.contains(&frame) {
                let mut path: Vec<&'static str> = stack
                    .iter()
                    .filter(|f| f.registry == registry)
                    .map(|f| f.key.display_name())
                    .collect();
                path.push(key.display_name());
                return Err(ServiceError::Circular(path));
            }

            if stack.len() >= max_depth {
                return Err(ServiceError::DepthExceeded(stack.len()));
            }

            stack.push(frame);
            Ok(Self { frame: Some(frame) })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            CONSTRUCTION_TLS.with(|tls| {
                let mut stack = tls.borrow_mut();
                if let Some(last) = stack.pop() {
                    debug_assert!(last == frame);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;

    struct A;
    struct B;

    #[test]
    fn reentering_a_frame_reports_the_path() {
        let _a = StackGuard::enter(1, key_of_type::<A>(), 16).unwrap();
        let _b = StackGuard::enter(1, key_of_type::<B>(), 16).unwrap();
        match StackGuard::enter(1, key_of_type::<A>(), 16) {
            Err(ServiceError::Circular(path)) => {
                assert_eq!(path.len(), 3);
                assert_eq!(path[0], path[2]);
            }
            _ => panic!("expected a cycle"),
        }
    }

    #[test]
    fn same_definition_in_another_registry_is_not_a_cycle() {
        let _a = StackGuard::enter(1, key_of_type::<A>(), 16).unwrap();
        assert!(StackGuard::enter(2, key_of_type::<A>(), 16).is_ok());
    }

    #[test]
    fn depth_limit_is_enforced() {
        let _a = StackGuard::enter(1, key_of_type::<A>(), 1).unwrap();
        assert!(matches!(
            StackGuard::enter(1, key_of_type::<B>(), 1),
            Err(ServiceError::DepthExceeded(1))
        ));
    }

    #[test]
    fn frames_pop_on_drop() {
        {
            let _a = StackGuard::enter(7, key_of_type::<A>(), 16).unwrap();
        }
        assert!(StackGuard::enter(7, key_of_type::<A>(), 16).is_ok());
    }
}
