//! Lock primitives.
//!
//! With the `parking-lot` feature these are `parking_lot`'s locks. Without it
//! they wrap the std locks and recover the inner value from a poisoned lock,
//! since a panicking constructor must not wedge every later lookup.

#[cfg(feature = "parking-lot")]
pub(crate) use parking_lot::{Mutex, RwLock};

#[cfg(not(feature = "parking-lot"))]
pub(crate) use self::std_locks::{Mutex, RwLock};

#[cfg(not(feature = "parking-lot"))]
mod std_locks {
    use std::sync::{PoisonError, RwLockReadGuard, RwLockWriteGuard};

    pub(crate) type MutexGuard<'a, T> = std::sync::MutexGuard<'a, T>;

    #[derive(Debug, Default)]
    pub(crate) struct Mutex<T>(std::sync::Mutex<T>);

    impl<T> Mutex<T> {
        pub(crate) const fn new(value: T) -> Self {
            Self(std::sync::Mutex::new(value))
        }

        #[inline]
        pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }

        pub(crate) fn get_mut(&mut self) -> &mut T {
            self.0.get_mut().unwrap_or_else(PoisonError::into_inner)
        }
    }

    #[derive(Debug, Default)]
    pub(crate) struct RwLock<T>(std::sync::RwLock<T>);

    impl<T> RwLock<T> {
        pub(crate) const fn new(value: T) -> Self {
            Self(std::sync::RwLock::new(value))
        }

        #[inline]
        pub(crate) fn read(&self) -> RwLockReadGuard<'_, T> {
            self.0.read().unwrap_or_else(PoisonError::into_inner)
        }

        #[inline]
        pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
            self.0.write().unwrap_or_else(PoisonError::into_inner)
        }
    }
}
