//! Owner assignment for hosting objects.

use std::fmt;

use super::Owner;
use crate::internal::sync::RwLock;

/// Objects that can report the owner they belong to.
///
/// Hosts usually embed an [`OwnerCell`] and delegate to it:
///
/// ```
/// use ferrous_services::{HasOwner, Lifecycle, Owner, OwnerCell};
///
/// #[derive(Default)]
/// struct Dashboard {
///     owner: OwnerCell,
/// }
///
/// impl HasOwner for Dashboard {
///     fn owner(&self) -> Option<Owner> {
///         self.owner.get()
///     }
/// }
///
/// let lifecycle = Lifecycle::new();
/// let dashboard = Dashboard::default();
/// assert!(dashboard.owner().is_none());
///
/// dashboard.owner.set(&lifecycle.owner("app"));
/// assert_eq!(dashboard.owner().unwrap().label(), "app");
/// ```
pub trait HasOwner {
    /// The owner assigned to this object, if any.
    fn owner(&self) -> Option<Owner>;
}

impl<T: HasOwner + ?Sized> HasOwner for &T {
    fn owner(&self) -> Option<Owner> {
        (**self).owner()
    }
}

impl<T: HasOwner + ?Sized> HasOwner for std::sync::Arc<T> {
    fn owner(&self) -> Option<Owner> {
        (**self).owner()
    }
}

/// Interior-mutable slot holding an object's owner.
///
/// The owner is held strongly, so a host keeps its owner reachable.
#[derive(Default)]
pub struct OwnerCell {
    slot: RwLock<Option<Owner>>,
}

impl OwnerCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cell with an owner already assigned.
    pub fn with_owner(owner: &Owner) -> Self {
        Self {
            slot: RwLock::new(Some(owner.clone())),
        }
    }

    /// Assigns (or replaces) the owner.
    pub fn set(&self, owner: &Owner) {
        *self.slot.write() = Some(owner.clone());
    }

    pub fn get(&self) -> Option<Owner> {
        self.slot.read().clone()
    }

    /// Removes the owner, returning the previous one.
    pub fn clear(&self) -> Option<Owner> {
        self.slot.write().take()
    }
}

impl HasOwner for OwnerCell {
    fn owner(&self) -> Option<Owner> {
        self.get()
    }
}

impl fmt::Debug for OwnerCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnerCell").field(&self.get()).finish()
    }
}

/// Resolves the owner of `host`.
pub fn get_owner<H: HasOwner + ?Sized>(host: &H) -> Option<Owner> {
    host.owner()
}

/// Assigns `owner` to the object holding `cell`.
pub fn set_owner(cell: &OwnerCell, owner: &Owner) {
    cell.set(owner);
}
