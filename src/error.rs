//! Result codes surfaced by the interner.

use crate::StrId;
use thiserror::Error;

/// Errors returned by [`Interner`](crate::Interner) operations.
///
/// Errors are plain values and never leave the engine in a partially
/// mutated state: a failed insertion has not advanced the identifier
/// counter and has not published a half-built record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The queried string has never been interned.
    #[error("string has not been interned")]
    NotInterned,

    /// The queried identifier has never been assigned.
    #[error("identifier {0:?} has never been assigned")]
    UnknownId(StrId),

    /// An arena reservation failed, or the identifier space is exhausted.
    #[error("out of memory")]
    OutOfMemory,
}
