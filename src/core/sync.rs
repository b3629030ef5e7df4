//! Mutex helpers

use std::sync::{Mutex, MutexGuard};

/// Lock `mutex`, turning poisoning into an error built by `make_error`
///
/// A panic in the task that held the lock then surfaces as a fatal error in
/// the other task instead of a second panic.
///
/// ```
/// use std::sync::Mutex;
/// use pipecat::core::sync::lock_or_error;
///
/// let pending = Mutex::new(vec![1u64, 2]);
/// let guard = lock_or_error(&pending, |msg| msg).unwrap();
/// assert_eq!(guard.len(), 2);
/// ```
pub fn lock_or_error<T: ?Sized, E>(
    mutex: &Mutex<T>,
    make_error: impl FnOnce(String) -> E,
) -> Result<MutexGuard<'_, T>, E> {
    mutex
        .lock()
        .map_err(|_| make_error("lock poisoned by a panicking task".to_string()))
}
