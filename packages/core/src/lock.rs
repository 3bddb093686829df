//! The shared chain-state read lock and the proof that it is held.
//!
//! Read handlers must observe chain state under a shared read lock owned by
//! the chain subsystem. Acquiring that lock twice on one call path can
//! deadlock once a writer is queued between the two acquisitions, so the
//! engine never asks handlers to remember a "don't lock" flag. Instead, a
//! [`ReadLockHeld`] token exists only inside the scope where the lock is
//! held, and nested calls that carry it skip acquisition.

use std::time::Duration;

/// Errors raised while acquiring the chain-state lock.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LockError {
    #[error("unable to acquire read lock on chain state within {0:?}")]
    Timeout(Duration),
}

/// Anything that keeps a lock held until dropped.
pub trait Held {}

impl<T> Held for T {}

/// An acquired read lock. Dropping it releases the lock.
pub struct ReadGuard<'a> {
    _guard: Box<dyn Held + 'a>,
}

impl<'a> ReadGuard<'a> {
    pub fn new<G: 'a>(guard: G) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

/// Access to the chain subsystem's shared lock.
pub trait ChainLock: Send + Sync {
    /// Try to take the read side, waiting at most `timeout`.
    fn read_for(&self, timeout: Duration) -> Option<ReadGuard<'_>>;
}

/// A [`ChainLock`] backed by a `parking_lot` reader-writer lock.
///
/// The chain subsystem holds the write side while it mutates state; RPC
/// handlers take the read side.
#[derive(Default)]
pub struct RwChainLock {
    inner: parking_lot::RwLock<()>,
}

impl RwChainLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the write side, blocking until it is available.
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, ()> {
        self.inner.write()
    }
}

impl ChainLock for RwChainLock {
    fn read_for(&self, timeout: Duration) -> Option<ReadGuard<'_>> {
        self.inner.try_read_for(timeout).map(ReadGuard::new)
    }
}

/// Proof that the current call path holds the chain-state read lock.
///
/// Only the engine can create one; handlers receive it by reference from
/// [`CallContext::lock_held`](crate::CallContext::lock_held).
#[derive(Debug)]
pub struct ReadLockHeld {
    _private: (),
}

impl ReadLockHeld {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}
