use std::sync::{Mutex, MutexGuard};

use tracing::error;

/// Lock a state mutex, recovering the guard if a previous holder panicked.
///
/// The guarded values are plain snapshots and timestamps, so the data is
/// still usable after a poisoning panic.
pub(crate) fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, what: &'static str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!(event = "sync.lock_poisoned", lock = what);
            poisoned.into_inner()
        }
    }
}
