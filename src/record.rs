//! Interned string records and their collision chains.
//!
//! Every node in the index tree buckets the strings sharing one masked
//! hash; the bucket is a singly-linked chain of records, newest first,
//! resolved by exact byte comparison. Records live in an append-only arena
//! and are freed only when the arena drops.

use crate::error::Error;
use crate::StrId;

/// Index of a record in the arena. `NONE` terminates a chain.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct RecordRef(u32);

impl RecordRef {
    pub(crate) const NONE: RecordRef = RecordRef(u32::MAX);

    #[inline]
    pub(crate) fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// One distinct interned string.
pub(crate) struct Record {
    /// Owned copy of the string, sized exactly to its byte length. The
    /// boxed buffer never moves, grows or shrinks, which is what makes
    /// borrowed resolution valid for the life of the engine.
    pub(crate) bytes: Box<[u8]>,
    pub(crate) id: StrId,
    /// Next record in the same bucket's chain.
    pub(crate) next: RecordRef,
}

/// Append-only arena owning every record.
pub(crate) struct RecordArena {
    records: Vec<Record>,
}

impl RecordArena {
    pub(crate) fn new() -> RecordArena {
        RecordArena {
            records: Vec::new(),
        }
    }

    /// Number of records, which equals the number of distinct interned
    /// strings (the reserved empty string has no record).
    #[inline]
    pub(crate) fn len(&self) -> u32 {
        self.records.len() as u32
    }

    #[inline]
    pub(crate) fn get(&self, index: RecordRef) -> &Record {
        debug_assert!(!index.is_none());
        &self.records[index.0 as usize]
    }

    /// Walk the chain starting at `head` for an exact (length + bytes)
    /// match.
    pub(crate) fn find(&self, head: RecordRef, bytes: &[u8]) -> Option<StrId> {
        let mut cursor = head;
        while !cursor.is_none() {
            let record = self.get(cursor);
            if record.bytes.as_ref() == bytes {
                return Some(record.id);
            }
            cursor = record.next;
        }
        None
    }

    /// Copy `bytes` into a fresh record linked in front of `head`.
    ///
    /// The caller has already established that no record in the chain
    /// holds these bytes. On reservation failure nothing changes.
    pub(crate) fn push_front(
        &mut self,
        bytes: &[u8],
        id: StrId,
        head: RecordRef,
    ) -> Result<RecordRef, Error> {
        self.records.try_reserve(1).map_err(|_| Error::OutOfMemory)?;
        let mut copy = Vec::new();
        copy.try_reserve_exact(bytes.len())
            .map_err(|_| Error::OutOfMemory)?;
        copy.extend_from_slice(bytes);

        let index = RecordRef(self.records.len() as u32);
        self.records.push(Record {
            bytes: copy.into_boxed_slice(),
            id,
            next: head,
        });
        Ok(index)
    }

    /// Bytes owned by the arena: the record table plus every string copy.
    #[cfg(feature = "statistics")]
    pub(crate) fn heap_bytes(&self) -> usize {
        self.records.capacity() * std::mem::size_of::<Record>()
            + self
                .records
                .iter()
                .map(|record| record.bytes.len())
                .sum::<usize>()
    }
}
