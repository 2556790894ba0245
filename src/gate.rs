//! Locking capability.
//!
//! The engine runs no threads of its own; concurrency correctness is
//! delegated entirely to an injected [`Gate`]. The default
//! [`SingleThreaded`] gate does nothing, leaving the engine usable
//! unmodified in single-threaded contexts. [`RwLockGate`] wraps a
//! `parking_lot` reader-writer lock for sharing one engine across threads.

use parking_lot::lock_api::RawRwLock as _;
use parking_lot::RawRwLock;

/// Lock hooks wrapping every public engine operation.
///
/// Read-only operations run between `lock_shared`/`unlock_shared`; mutating
/// operations between `lock_exclusive`/`unlock_exclusive`. The shared pair
/// defaults to the exclusive pair, so a gate that only distinguishes one
/// lock level implements two methods and still serializes correctly.
///
/// An implementation must allow any number of shared holders to run
/// together, must let an exclusive holder exclude all others, and must
/// never fail to acquire — there is no timeout or cancellation path. A hook
/// that can block indefinitely is the caller's responsibility.
pub trait Gate {
    /// Acquire the read-only lock. Defaults to the exclusive lock.
    fn lock_shared(&self) {
        self.lock_exclusive();
    }

    /// Release the read-only lock. Defaults to the exclusive unlock.
    ///
    /// Called only after a matching `lock_shared` on the same gate.
    fn unlock_shared(&self) {
        self.unlock_exclusive();
    }

    /// Acquire the read-write lock.
    fn lock_exclusive(&self);

    /// Release the read-write lock.
    ///
    /// Called only after a matching `lock_exclusive` on the same gate.
    fn unlock_exclusive(&self);
}

/// Marker for gates whose locks really exclude concurrent access.
///
/// # Safety
///
/// Implementors assert that between `lock_exclusive` and
/// `unlock_exclusive` no other shared or exclusive section runs on any
/// thread, and that shared sections never overlap an exclusive one.
/// [`Interner`](crate::Interner) is `Sync` only over such gates.
pub unsafe trait SyncGate: Gate + Sync {}

/// No-op gate for single-threaded use. This is the default capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleThreaded;

impl Gate for SingleThreaded {
    #[inline]
    fn lock_shared(&self) {}

    #[inline]
    fn unlock_shared(&self) {}

    #[inline]
    fn lock_exclusive(&self) {}

    #[inline]
    fn unlock_exclusive(&self) {}
}

/// Reader-writer gate backed by `parking_lot`.
pub struct RwLockGate {
    raw: RawRwLock,
}

impl RwLockGate {
    /// Create an unlocked gate.
    pub const fn new() -> RwLockGate {
        RwLockGate { raw: RawRwLock::INIT }
    }
}

impl Default for RwLockGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate for RwLockGate {
    fn lock_shared(&self) {
        self.raw.lock_shared();
    }

    fn unlock_shared(&self) {
        // SAFETY: the engine pairs every unlock with a prior lock on this
        // gate, on the same thread of execution.
        unsafe { self.raw.unlock_shared() }
    }

    fn lock_exclusive(&self) {
        self.raw.lock_exclusive();
    }

    fn unlock_exclusive(&self) {
        // SAFETY: as above.
        unsafe { self.raw.unlock_exclusive() }
    }
}

// SAFETY: parking_lot's reader-writer lock provides real mutual exclusion.
unsafe impl SyncGate for RwLockGate {}
