//! Blocking primitives shared by the state machine

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Lock a mutex, recovering the data if another thread panicked while holding it
///
/// A panicking unit of work must not wedge the whole tree: the guarded data
/// in this crate is always left in a consistent state between statements.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Signal that stays set until explicitly reset
#[derive(Debug)]
pub struct ManualResetEvent {
    signaled: Mutex<bool>,
    changed: Condvar,
}

impl ManualResetEvent {
    pub fn new(initially_set: bool) -> Self {
        Self {
            signaled: Mutex::new(initially_set),
            changed: Condvar::new(),
        }
    }

    pub fn set(&self) {
        *lock_unpoisoned(&self.signaled) = true;
        self.changed.notify_all();
    }

    pub fn reset(&self) {
        *lock_unpoisoned(&self.signaled) = false;
    }

    pub fn is_set(&self) -> bool {
        *lock_unpoisoned(&self.signaled)
    }

    /// Block until the event is set or `timeout` elapses
    ///
    /// `None` waits indefinitely. Returns whether the event was set.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        // A timeout too large to represent as a deadline is no timeout at all
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut signaled = lock_unpoisoned(&self.signaled);
        match deadline {
            None => {
                while !*signaled {
                    signaled = self
                        .changed
                        .wait(signaled)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                true
            }
            Some(deadline) => {
                while !*signaled {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    let (guard, _) = self
                        .changed
                        .wait_timeout(signaled, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    signaled = guard;
                }
                true
            }
        }
    }
}
