//! Hash-ordered AVL index tree.
//!
//! Buckets are keyed by masked hash. Insertion descends iteratively with an
//! explicit path stack and rebalances on the way back up; lookup is a plain
//! descent with no mutation. There is no deletion — the tree only grows.

use smallvec::SmallVec;

use crate::error::Error;
use crate::hash::HASH_MASK;
use crate::pool::{Node, NodePool, NodeRef};

/// Worst-case AVL path length over a 32-bit key space (1.45 * 32 + 1).
pub(crate) const MAX_LEVEL: usize = 32 * 145 / 100 + 1;

/// Inline capacity of the insertion path stack; never spilled.
const STACK_CAPACITY: usize = 64;

// The height field and the path stack both have to cover the deepest
// possible tree.
const _: () = assert!(MAX_LEVEL <= u8::MAX as usize);
const _: () = assert!(MAX_LEVEL < STACK_CAPACITY);

pub(crate) struct IndexTree {
    root: NodeRef,
    pool: NodePool,
}

impl IndexTree {
    pub(crate) fn new() -> IndexTree {
        IndexTree {
            root: NodeRef::NONE,
            pool: NodePool::new(),
        }
    }

    #[inline]
    pub(crate) fn pool(&self) -> &NodePool {
        &self.pool
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> NodeRef {
        self.root
    }

    #[inline]
    pub(crate) fn node(&self, index: NodeRef) -> &Node {
        self.pool.node(index)
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, index: NodeRef) -> &mut Node {
        self.pool.node_mut(index)
    }

    /// Locate the bucket for `hash` without mutating anything.
    pub(crate) fn find(&self, hash: u32) -> Option<NodeRef> {
        debug_assert_eq!(hash & HASH_MASK, hash);

        let mut cursor = self.root;
        while !cursor.is_none() {
            let node = self.pool.node(cursor);
            if hash == node.hash {
                return Some(cursor);
            }
            cursor = if hash < node.hash { node.left } else { node.right };
        }
        None
    }

    /// Locate the bucket for `hash`, creating and rebalancing on a miss.
    ///
    /// A node's index survives rotations, so the returned reference stays
    /// valid however the tree re-shapes itself afterwards.
    pub(crate) fn find_or_insert(&mut self, hash: u32) -> Result<NodeRef, Error> {
        debug_assert_eq!(hash & HASH_MASK, hash);

        let mut stack: SmallVec<[NodeRef; STACK_CAPACITY]> = SmallVec::new();
        let mut cursor = self.root;

        let created = loop {
            if cursor.is_none() {
                let fresh = self.pool.alloc(hash)?;
                stack.push(fresh);
                break fresh;
            }
            let node = *self.pool.node(cursor);
            if hash == node.hash {
                return Ok(cursor);
            }
            stack.push(cursor);
            cursor = if hash < node.hash { node.left } else { node.right };
        };
        debug_assert!(stack.len() <= MAX_LEVEL);

        // Unwind: rebalance every ancestor and hang it back under the node
        // above it, or make it the root. The fresh leaf gets linked by the
        // same hash comparison on the first iteration.
        while let Some(index) = stack.pop() {
            let index = self.rebalance(index);
            match stack.last() {
                Some(&parent) => {
                    if self.pool.node(index).hash < self.pool.node(parent).hash {
                        self.pool.node_mut(parent).left = index;
                    } else {
                        self.pool.node_mut(parent).right = index;
                    }
                }
                None => self.root = index,
            }
        }
        Ok(created)
    }

    #[inline]
    fn height(&self, index: NodeRef) -> i32 {
        if index.is_none() {
            -1
        } else {
            i32::from(self.pool.node(index).height)
        }
    }

    /// Balance factor: right height minus left height.
    #[inline]
    fn balance_factor(&self, index: NodeRef) -> i32 {
        let node = *self.pool.node(index);
        self.height(node.right) - self.height(node.left)
    }

    fn fix_height(&mut self, index: NodeRef) {
        let node = *self.pool.node(index);
        let height = self.height(node.left).max(self.height(node.right)) + 1;
        debug_assert!(height <= MAX_LEVEL as i32);
        self.pool.node_mut(index).height = height as u8;
    }

    fn rotate_right(&mut self, index: NodeRef) -> NodeRef {
        let pivot = self.pool.node(index).left;
        let inner = self.pool.node(pivot).right;
        self.pool.node_mut(index).left = inner;
        self.pool.node_mut(pivot).right = index;

        self.fix_height(index);
        self.fix_height(pivot);
        pivot
    }

    fn rotate_left(&mut self, index: NodeRef) -> NodeRef {
        let pivot = self.pool.node(index).right;
        let inner = self.pool.node(pivot).left;
        self.pool.node_mut(index).right = inner;
        self.pool.node_mut(pivot).left = index;

        self.fix_height(index);
        self.fix_height(pivot);
        pivot
    }

    /// Restore the AVL invariant at `index`, returning the subtree's new
    /// root. A double rotation is chosen by the sign of the taller child's
    /// balance factor.
    fn rebalance(&mut self, index: NodeRef) -> NodeRef {
        self.fix_height(index);

        match self.balance_factor(index) {
            2 => {
                let right = self.pool.node(index).right;
                if self.balance_factor(right) < 0 {
                    let new_right = self.rotate_right(right);
                    self.pool.node_mut(index).right = new_right;
                }
                self.rotate_left(index)
            }
            -2 => {
                let left = self.pool.node(index).left;
                if self.balance_factor(left) > 0 {
                    let new_left = self.rotate_left(left);
                    self.pool.node_mut(index).left = new_left;
                }
                self.rotate_right(index)
            }
            _ => index,
        }
    }
}
