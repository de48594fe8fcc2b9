//! Small shared helpers.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A handy shortcut to replace the `RwLock` `.write().unwrap()` /
/// `.read().unwrap()` pattern with `.wl()` / `.rl()`.
pub trait HandyRwLock<T> {
    fn wl(&self) -> RwLockWriteGuard<'_, T>;
    fn rl(&self) -> RwLockReadGuard<'_, T>;
}

impl<T> HandyRwLock<T> for RwLock<T> {
    fn wl(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap()
    }

    fn rl(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap()
    }
}

/// Shared, internally-mutable handle. Alias used throughout the crate for
/// anything owned jointly by the tree and its cursors.
pub type Pod<T> = Arc<RwLock<T>>;

pub fn pod<T>(v: T) -> Pod<T> {
    Arc::new(RwLock::new(v))
}
