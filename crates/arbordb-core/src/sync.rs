//! Lock acquisition that survives poisoning.
//!
//! A panic on another thread must not wedge every repository in the
//! process; the guarded state is always structurally valid, so a poisoned
//! lock is recovered rather than propagated.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
