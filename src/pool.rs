//! Append-only node pool.
//!
//! Nodes are carved from fixed-capacity blocks. A full block is never
//! resized; a fresh block is reserved and appended instead, so node storage
//! never moves and a node keeps its index for the life of the pool. There
//! is no way to return a single node — blocks are dropped only with the
//! pool.

use crate::error::Error;
use crate::record::RecordRef;

/// Nodes per block.
pub(crate) const BLOCK_CAPACITY: usize = 16;

/// Index of a node in the pool. `NONE` marks a missing child or an empty
/// root.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct NodeRef(u32);

impl NodeRef {
    pub(crate) const NONE: NodeRef = NodeRef(u32::MAX);

    #[inline]
    pub(crate) fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// One hash bucket: a tree position plus the head of its record chain.
#[derive(Clone, Copy)]
pub(crate) struct Node {
    pub(crate) left: NodeRef,
    pub(crate) right: NodeRef,
    /// Head of the collision chain; the chain owns all records below it.
    pub(crate) chain: RecordRef,
    /// Masked hash, the tree ordering key.
    pub(crate) hash: u32,
    /// Subtree height. A missing child counts as -1.
    pub(crate) height: u8,
}

struct Block {
    nodes: Vec<Node>,
}

impl Block {
    fn new() -> Result<Block, Error> {
        let mut nodes = Vec::new();
        nodes
            .try_reserve_exact(BLOCK_CAPACITY)
            .map_err(|_| Error::OutOfMemory)?;
        Ok(Block { nodes })
    }
}

/// Append-only arena of tree nodes.
pub(crate) struct NodePool {
    blocks: Vec<Block>,
    len: u32,
}

impl NodePool {
    pub(crate) fn new() -> NodePool {
        NodePool {
            blocks: Vec::new(),
            len: 0,
        }
    }

    /// Number of allocated nodes, which equals the number of distinct
    /// masked hashes seen so far.
    #[inline]
    pub(crate) fn len(&self) -> u32 {
        self.len
    }

    /// Carve a fresh node tagged with `hash`: no children, no chain,
    /// height 0. Grows the block chain when the current block is full. On
    /// reservation failure nothing changes.
    pub(crate) fn alloc(&mut self, hash: u32) -> Result<NodeRef, Error> {
        let needs_block = self
            .blocks
            .last()
            .map_or(true, |block| block.nodes.len() == BLOCK_CAPACITY);
        if needs_block {
            self.blocks.try_reserve(1).map_err(|_| Error::OutOfMemory)?;
            self.blocks.push(Block::new()?);
        }

        let index = NodeRef(self.len);
        self.blocks[index.0 as usize / BLOCK_CAPACITY].nodes.push(Node {
            left: NodeRef::NONE,
            right: NodeRef::NONE,
            chain: RecordRef::NONE,
            hash,
            height: 0,
        });
        self.len += 1;
        Ok(index)
    }

    #[inline]
    pub(crate) fn node(&self, index: NodeRef) -> &Node {
        debug_assert!(!index.is_none());
        &self.blocks[index.0 as usize / BLOCK_CAPACITY].nodes[index.0 as usize % BLOCK_CAPACITY]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, index: NodeRef) -> &mut Node {
        debug_assert!(!index.is_none());
        &mut self.blocks[index.0 as usize / BLOCK_CAPACITY].nodes[index.0 as usize % BLOCK_CAPACITY]
    }

    /// Every allocated node, in block order. This is the reverse index
    /// scan: there is no id-keyed structure to consult.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Node> {
        self.blocks.iter().flat_map(|block| block.nodes.iter())
    }

    /// Block memory owned by the pool.
    #[cfg(feature = "statistics")]
    pub(crate) fn heap_bytes(&self) -> usize {
        self.blocks.capacity() * std::mem::size_of::<Block>()
            + self.blocks.len() * BLOCK_CAPACITY * std::mem::size_of::<Node>()
    }

    #[cfg(test)]
    fn block_count(&self) -> usize {
        self.blocks.len()
    }
}
