//! # Counting Semaphore
//!
//! Blocking, exact-count semaphore built on `parking_lot`.
//!
//! ## Semantics
//!
//! ```text
//!   release_many(n) ──> permits += n ──> n x notify_one
//!   acquire()       ──> wait while permits == 0 ──> permits -= 1
//!   close()         ──> every current and future acquire returns Err(Closed)
//! ```
//!
//! Permits are counted, so a release that happens before anyone waits is not
//! lost, and a wakeup without a permit puts the waiter back to sleep.

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Returned by [`Semaphore::acquire`] once the semaphore has been closed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("semaphore closed")]
pub struct Closed;

#[derive(Debug)]
struct SemaphoreState {
    permits: usize,
    closed: bool,
}

/// A counting semaphore with close support.
#[derive(Debug)]
pub struct Semaphore {
    /// Name, for diagnostics only.
    name: &'static str,
    /// Permit count and closed flag.
    state: Mutex<SemaphoreState>,
    /// Signalled once per released permit, broadcast on close.
    available: Condvar,
}

impl Semaphore {
    /// Creates a semaphore holding `permits` permits.
    #[must_use]
    pub fn new(name: &'static str, permits: usize) -> Self {
        Self {
            name,
            state: Mutex::new(SemaphoreState {
                permits,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Blocks until a permit is available, then takes it.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] if the semaphore is closed before or while waiting.
    pub fn acquire(&self) -> Result<(), Closed> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(Closed);
            }
            if state.permits > 0 {
                state.permits -= 1;
                return Ok(());
            }
            self.available.wait(&mut state);
        }
    }

    /// Takes a permit if one is available without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] if the semaphore is closed.
    pub fn try_acquire(&self) -> Result<bool, Closed> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Closed);
        }
        if state.permits > 0 {
            state.permits -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Adds one permit and wakes at most one waiter.
    #[inline]
    pub fn release(&self) {
        self.release_many(1);
    }

    /// Adds `count` permits and wakes at most `count` waiters.
    pub fn release_many(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut state = self.state.lock();
        state.permits += count;
        for _ in 0..count {
            if !self.available.notify_one() {
                break;
            }
        }
    }

    /// Closes the semaphore and wakes every waiter.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.available.notify_all();
        tracing::trace!(semaphore = self.name, "closed");
    }

    /// Returns true once [`Semaphore::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the number of permits currently available.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.state.lock().permits
    }
}
