//! Synchronization primitives for shared server structures.
//!
//! [`SharedExclusiveLock`] is a plain reader/writer monitor intended for data
//! that many sessions read and few modify, such as an index or catalog.
mod lock;

pub use lock::{LockState, ReadGuard, SharedExclusiveLock, WriteGuard};
