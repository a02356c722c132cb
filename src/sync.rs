//! Poison recovery extension trait for `std::sync::Mutex`
//!
//! Every guarded value in this crate stays valid even if a holder panicked:
//! the cached record is only ever assigned a fully built value, and
//! registries only grow or shrink. A poisoned lock is logged and then used
//! as-is.

use std::sync::{Mutex, MutexGuard};

/// Extension trait for Mutex with poison recovery
pub(crate) trait MutexExt<T> {
    /// Lock the mutex, recovering from poison errors
    fn lock_recovered(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    fn lock_recovered(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
