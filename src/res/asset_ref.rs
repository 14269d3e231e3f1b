//! Reference-counted, nullable handles to assets.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::asset::{Asset, AssetObject};
use super::request::LoadTicket;

pub(crate) struct RefSlot {
    asset: Option<Asset>,
    request: Option<LoadTicket>,
}

impl RefSlot {
    // Retains the new asset before releasing the old one, so self-assignment
    // never drops the count to zero.
    fn assign(&mut self, asset: Option<Asset>) {
        if let Some(ref asset) = asset {
            asset.retain();
        }

        self.request = None;
        if let Some(prev) = std::mem::replace(&mut self.asset, asset) {
            prev.release();
        }
    }
}

/// A non-owning observer of a handle, which the loader uses to assign the
/// result of a pending load.
pub(crate) type RefTarget = Weak<Mutex<RefSlot>>;

/// A reference-counted handle to an asset.
///
/// A non-null handle contributes one to the reference count of its asset for as
/// long as it points at it. A handle could also be bound to a pending load with
/// `AssetManager::load_async`; it stays null until the load is finalized and
/// the loader assigns the asset into it.
pub struct AssetRef {
    slot: Arc<Mutex<RefSlot>>,
}

impl AssetRef {
    /// Creates a null handle.
    pub fn new() -> Self {
        AssetRef {
            slot: Arc::new(Mutex::new(RefSlot {
                asset: None,
                request: None,
            })),
        }
    }

    pub fn from_asset(asset: &Asset) -> Self {
        let v = AssetRef::new();
        v.slot.lock().assign(Some(asset.clone()));
        v
    }

    #[inline]
    pub fn get(&self) -> Option<Asset> {
        self.slot.lock().asset.clone()
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.slot.lock().asset.is_none()
    }

    /// Returns true if this handle is waiting for an asynchronous load.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.slot.lock().request.is_some()
    }

    pub fn name(&self) -> Option<String> {
        self.get().map(|v| v.name())
    }

    /// Points this handle at `asset`, or nulls it. Any pending load binding is
    /// cleared, so the load will no longer assign into this handle.
    pub fn set(&mut self, asset: Option<&Asset>) {
        self.slot.lock().assign(asset.cloned());
    }

    /// Borrows the object as `T` and maps it with `func`.
    pub fn with<T, F, R>(&self, func: F) -> Option<R>
    where
        T: AssetObject,
        F: FnOnce(&T) -> R,
    {
        let asset = self.get()?;
        let object = asset.get::<T>()?;
        let v = func(&*object);
        Some(v)
    }

    #[inline]
    pub(crate) fn downgrade(&self) -> RefTarget {
        Arc::downgrade(&self.slot)
    }
}

impl Default for AssetRef {
    fn default() -> Self {
        AssetRef::new()
    }
}

impl Clone for AssetRef {
    // The clone points at the same asset, but does not share the pending binding.
    fn clone(&self) -> Self {
        match self.get() {
            Some(asset) => AssetRef::from_asset(&asset),
            None => AssetRef::new(),
        }
    }
}

impl Drop for AssetRef {
    fn drop(&mut self) {
        let asset = self.slot.lock().asset.take();
        if let Some(asset) = asset {
            asset.release();
        }
    }
}

impl PartialEq for AssetRef {
    fn eq(&self, rhs: &Self) -> bool {
        self.get() == rhs.get()
    }
}

impl Eq for AssetRef {}

impl fmt::Debug for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("AssetRef")
            .field("asset", &slot.asset.as_ref().map(|v| v.name()))
            .field("request", &slot.request)
            .finish()
    }
}

/// Points `target` at `asset` directly.
pub(crate) fn assign(target: &RefTarget, asset: &Asset) {
    if let Some(slot) = target.upgrade() {
        slot.lock().assign(Some(asset.clone()));
    }
}

/// Nulls `target` and binds it to the load of `ticket`. Returns the request it
/// was previously bound to.
pub(crate) fn bind(target: &RefTarget, ticket: LoadTicket) -> Option<LoadTicket> {
    let slot = target.upgrade()?;
    let mut slot = slot.lock();
    let prev = slot.request.take();
    slot.assign(None);
    slot.request = Some(ticket);
    prev
}

/// The request `target` is currently bound to.
pub(crate) fn binding(target: &RefTarget) -> Option<LoadTicket> {
    let slot = target.upgrade()?;
    let request = slot.lock().request;
    request
}

/// Assigns the result of `ticket` into `target`, if it is still waiting for it.
pub(crate) fn fulfil(target: &RefTarget, ticket: LoadTicket, asset: &Asset) -> bool {
    if let Some(slot) = target.upgrade() {
        let mut slot = slot.lock();
        if slot.request == Some(ticket) {
            slot.assign(Some(asset.clone()));
            return true;
        }
    }

    false
}

/// Clears the binding of `target` to a failed load of `ticket`.
pub(crate) fn abandon(target: &RefTarget, ticket: LoadTicket) {
    if let Some(slot) = target.upgrade() {
        let mut slot = slot.lock();
        if slot.request == Some(ticket) {
            slot.request = None;
        }
    }
}
