//! # strid-rs
//!
//! Bidirectional string interning over a hash-ordered AVL tree.
//!
//! Each distinct byte string registered with the [`Interner`] is assigned a
//! small integer [`StrId`] exactly once; both directions can then be
//! queried — string → id in O(log n), id → string by a deliberate linear
//! scan (see [`Interner::resolve`]). Strings whose masked hashes collide
//! fall into per-bucket chains resolved by exact byte comparison, so equal
//! ids always mean equal strings.
//!
//! ## Example
//!
//! ```rust
//! use strid_rs::{Interner, StrId};
//!
//! let interner = Interner::new();
//! let one = interner.intern("one").unwrap();
//! let two = interner.intern("two").unwrap();
//!
//! assert_ne!(one, two);
//! assert_eq!(interner.intern("one").unwrap(), one);
//! assert_eq!(interner.get("two").unwrap(), two);
//! assert_eq!(interner.resolve(one).unwrap(), b"one");
//!
//! // The empty string is pre-reserved and never touches the tree.
//! assert_eq!(interner.intern("").unwrap(), StrId::EMPTY);
//! ```
//!
//! ## Concurrency
//!
//! The engine runs no threads and takes no locks of its own beyond the
//! injected [`Gate`] capability. The default [`SingleThreaded`] gate is a
//! no-op; pick [`RwLockGate`] to share one interner across threads:
//!
//! ```rust
//! use strid_rs::{Interner, Options, RwLockGate};
//!
//! let interner = Interner::with_options(Options {
//!     hasher: None,
//!     gate: RwLockGate::new(),
//! });
//!
//! std::thread::scope(|scope| {
//!     for _ in 0..4 {
//!         scope.spawn(|| interner.intern("shared").unwrap());
//!     }
//! });
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod gate;
pub mod hash;

mod pool;
mod record;
mod tree;

use core::fmt;
use std::cell::UnsafeCell;

pub use crate::error::Error;
pub use crate::gate::{Gate, RwLockGate, SingleThreaded, SyncGate};
pub use crate::hash::{default_hash, HashFn};

use crate::hash::masked;
use crate::record::RecordArena;
use crate::tree::IndexTree;

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier assigned to one distinct interned string.
///
/// Ids are dense and handed out in first-insertion order starting at 1;
/// [`StrId::EMPTY`] is permanently reserved for the empty string and never
/// reused. Within one interner, equal ids mean byte-identical strings.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrId(u32);

impl StrId {
    /// The reserved identifier of the empty string.
    pub const EMPTY: StrId = StrId(0);

    /// Raw value, e.g. for an external id-indexed side table.
    #[inline]
    pub const fn to_u32(self) -> u32 {
        self.0
    }

    /// Rebuild an id from its raw value.
    ///
    /// The value is not validated here; [`Interner::resolve`] reports
    /// [`Error::UnknownId`] for ids that were never assigned.
    #[inline]
    pub const fn from_u32(raw: u32) -> StrId {
        StrId(raw)
    }
}

impl fmt::Debug for StrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrId({})", self.0)
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Capabilities recognized at construction.
///
/// Every field has a documented default; nothing implicit is consulted
/// afterwards.
pub struct Options<G: Gate = SingleThreaded> {
    /// Replacement hash capability. `None` selects [`default_hash`]. The
    /// closure's captures take the place of a user-data pointer.
    pub hasher: Option<HashFn>,
    /// Lock capability wrapping every public operation. The default no-op
    /// gate leaves the engine single-threaded.
    pub gate: G,
}

impl Default for Options<SingleThreaded> {
    fn default() -> Self {
        Options {
            hasher: None,
            gate: SingleThreaded,
        }
    }
}

/// Usage counters, compiled in behind the `statistics` feature.
#[cfg(feature = "statistics")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Bytes held by the engine state, node blocks and record storage.
    pub memory_bytes: usize,
    /// Distinct hash buckets (tree nodes).
    pub hash_count: usize,
    /// Distinct interned strings; the reserved empty string is not counted.
    pub string_count: usize,
}

// =============================================================================
// Engine state
// =============================================================================

struct State {
    tree: IndexTree,
    records: RecordArena,
    next_id: u32,
}

impl State {
    fn new() -> State {
        State {
            tree: IndexTree::new(),
            records: RecordArena::new(),
            // One past the reserved empty-string id.
            next_id: 1,
        }
    }

    fn get(&self, bytes: &[u8], hash: u32) -> Option<StrId> {
        let node = self.tree.find(hash)?;
        self.records.find(self.tree.node(node).chain, bytes)
    }

    fn intern(&mut self, bytes: &[u8], hash: u32) -> Result<StrId, Error> {
        let node = self.tree.find_or_insert(hash)?;
        let head = self.tree.node(node).chain;
        if let Some(existing) = self.records.find(head, bytes) {
            return Ok(existing);
        }

        if self.next_id == u32::MAX {
            return Err(Error::OutOfMemory);
        }
        // The id is claimed only once the record exists; a failed
        // reservation leaves the counter and the chain untouched.
        let id = StrId(self.next_id);
        let fresh = self.records.push_front(bytes, id, head)?;
        self.tree.node_mut(node).chain = fresh;
        self.next_id += 1;
        Ok(id)
    }

    /// Scan every bucket chain, in block order, for `id`.
    fn resolve(&self, id: StrId) -> Option<&[u8]> {
        for node in self.tree.pool().iter() {
            let mut cursor = node.chain;
            while !cursor.is_none() {
                let record = self.records.get(cursor);
                if record.id == id {
                    return Some(&record.bytes);
                }
                cursor = record.next;
            }
        }
        None
    }
}

// =============================================================================
// Facade
// =============================================================================

/// The interning engine.
///
/// All methods take `&self`; mutation is serialized through the injected
/// [`Gate`]. Dropping the interner frees every node block and record at
/// once — nothing is ever freed earlier, which is what lets lookups hand
/// out borrows for the engine's whole lifetime.
pub struct Interner<G: Gate = SingleThreaded> {
    state: UnsafeCell<State>,
    gate: G,
    hasher: HashFn,
}

// SAFETY: every access to `state` happens between lock/unlock calls on the
// gate, and a `SyncGate` guarantees those sections exclude each other
// across threads.
unsafe impl<G: SyncGate> Sync for Interner<G> {}

impl Interner<SingleThreaded> {
    /// Engine with the built-in hash and the no-op single-threaded gate.
    pub fn new() -> Interner<SingleThreaded> {
        Interner::with_options(Options::default())
    }
}

impl Default for Interner<SingleThreaded> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Gate> Interner<G> {
    /// Engine with explicitly injected capabilities.
    pub fn with_options(options: Options<G>) -> Interner<G> {
        Interner {
            state: UnsafeCell::new(State::new()),
            gate: options.gate,
            hasher: options.hasher.unwrap_or_else(|| Box::new(default_hash)),
        }
    }

    /// Register `bytes`, or return the id it already has.
    ///
    /// The empty string short-circuits to [`StrId::EMPTY`] before the lock
    /// is taken. A failed allocation surfaces as [`Error::OutOfMemory`]
    /// with the engine observably unchanged.
    pub fn intern(&self, bytes: impl AsRef<[u8]>) -> Result<StrId, Error> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Ok(StrId::EMPTY);
        }
        let hash = self.hash(bytes);

        let _gate = self.exclusive();
        // SAFETY: the exclusive section excludes every other state access.
        let state = unsafe { &mut *self.state.get() };
        state.intern(bytes, hash)
    }

    /// Id of an already-registered string.
    ///
    /// The empty string always succeeds with [`StrId::EMPTY`] without ever
    /// touching the tree; any other string that was never interned is
    /// [`Error::NotInterned`].
    pub fn get(&self, bytes: impl AsRef<[u8]>) -> Result<StrId, Error> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Ok(StrId::EMPTY);
        }
        let hash = self.hash(bytes);

        let _gate = self.shared();
        // SAFETY: the shared section excludes exclusive state access.
        let state = unsafe { &*self.state.get() };
        state.get(bytes, hash).ok_or(Error::NotInterned)
    }

    /// The string behind `id`, borrowed for the life of the interner.
    ///
    /// [`StrId::EMPTY`] resolves to `b""` without taking the lock. For any
    /// other id this is a linear scan over every bucket — the engine keeps
    /// no reverse index. Callers for whom id → string is hot should layer
    /// an external array indexed by [`StrId::to_u32`] as ids come back
    /// from [`Interner::intern`].
    pub fn resolve(&self, id: StrId) -> Result<&[u8], Error> {
        if id == StrId::EMPTY {
            return Ok(&[]);
        }

        let _gate = self.shared();
        // SAFETY: the shared section excludes exclusive state access.
        let state = unsafe { &*self.state.get() };
        match state.resolve(id) {
            // SAFETY: the bytes live in a boxed allocation that is never
            // mutated, moved or freed before the interner drops, so the
            // borrow may outlive both the lock and the `state` reference.
            Some(bytes) => {
                Ok(unsafe { core::slice::from_raw_parts(bytes.as_ptr(), bytes.len()) })
            }
            None => Err(Error::UnknownId(id)),
        }
    }

    /// Number of distinct interned strings; the reserved empty string is
    /// not counted.
    pub fn len(&self) -> usize {
        let _gate = self.shared();
        // SAFETY: the shared section excludes exclusive state access.
        let state = unsafe { &*self.state.get() };
        state.records.len() as usize
    }

    /// True when nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usage counters: memory in use, bucket count, string count.
    #[cfg(feature = "statistics")]
    pub fn statistics(&self) -> Statistics {
        let _gate = self.shared();
        // SAFETY: the shared section excludes exclusive state access.
        let state = unsafe { &*self.state.get() };
        Statistics {
            memory_bytes: core::mem::size_of::<Self>()
                + state.tree.pool().heap_bytes()
                + state.records.heap_bytes(),
            hash_count: state.tree.pool().len() as usize,
            string_count: state.records.len() as usize,
        }
    }

    #[inline]
    fn hash(&self, bytes: &[u8]) -> u32 {
        masked((self.hasher)(bytes))
    }

    fn shared(&self) -> SharedGuard<'_, G> {
        self.gate.lock_shared();
        SharedGuard(&self.gate)
    }

    fn exclusive(&self) -> ExclusiveGuard<'_, G> {
        self.gate.lock_exclusive();
        ExclusiveGuard(&self.gate)
    }
}

struct SharedGuard<'a, G: Gate>(&'a G);

impl<G: Gate> Drop for SharedGuard<'_, G> {
    fn drop(&mut self) {
        self.0.unlock_shared();
    }
}

struct ExclusiveGuard<'a, G: Gate>(&'a G);

impl<G: Gate> Drop for ExclusiveGuard<'_, G> {
    fn drop(&mut self) {
        self.0.unlock_exclusive();
    }
}


#[cfg(test)]
mod proptests;
