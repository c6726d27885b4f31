use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Reader and writer counts guarded by the monitor mutex.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LockState {
    pub readers: usize,
    pub writers: usize,
}

/// Reader/writer lock built as a monitor over one mutex and one condition
/// variable.
///
/// The lock owns no data. It sits beside the structure it protects, and
/// callers take a [`ReadGuard`] before reading that structure or a
/// [`WriteGuard`] before changing it.
///
/// Any number of readers may hold the lock at once, or exactly one writer.
/// There is no writer preference: while readers keep arriving, a waiting
/// writer can be postponed indefinitely. Acquiring a write guard while the
/// same thread holds a read guard on the same lock deadlocks.
///
/// Guards release the lock when dropped, including during unwinding.
#[derive(Debug, Default)]
pub struct SharedExclusiveLock {
    state: Mutex<LockState>,
    changed: Condvar,
}

impl SharedExclusiveLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, LockState> {
        // The monitor mutex is never held while user code runs, so poisoning
        // cannot leave the counters inconsistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current holder counts.
    pub fn state(&self) -> LockState {
        *self.lock_state()
    }

    /// Acquire shared access, waiting while a writer holds the lock.
    pub fn read(&self) -> ReadGuard<'_> {
        let mut state = self.lock_state();
        while state.writers > 0 {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        state.readers += 1;
        ReadGuard { lock: self }
    }

    /// Acquire exclusive access, waiting while anyone else holds the lock.
    pub fn write(&self) -> WriteGuard<'_> {
        let mut state = self.lock_state();
        while state.readers > 0 || state.writers > 0 {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        state.writers = 1;
        WriteGuard { lock: self }
    }

    fn release_read(&self) {
        let mut state = self.lock_state();
        state.readers -= 1;
        if state.readers == 0 {
            self.changed.notify_one();
        }
    }

    fn release_write(&self) {
        let mut state = self.lock_state();
        state.writers = 0;
        self.changed.notify_all();
    }
}

/// Shared hold on a [`SharedExclusiveLock`].
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: &'a SharedExclusiveLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

/// Exclusive hold on a [`SharedExclusiveLock`].
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: &'a SharedExclusiveLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}
