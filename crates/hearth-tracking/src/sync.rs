//! Lock helper for tracker-local state

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering from poisoning.
///
/// The bus isolates panicking listeners, so a tracker whose action
/// panicked mid-dispatch may leave its state mutex poisoned; the state
/// itself is still consistent because every mutation completes before
/// the user action runs.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
