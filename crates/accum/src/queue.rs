//! Two-phase accumulator queue.
//!
//! Leaves are buffered and folded into fixed-size subtrees
//! (`merge_sub_roots`), then the subroots are combined into a single root at
//! the full target depth (`merge`). Splitting the work keeps each
//! circuit-side incremental update bounded by the subtree size rather than
//! the full tree.

use maci_crypto::{nothing_up_my_sleeve, Fr, TREE_ARITY};

use crate::tree::{zeros, QuinTree};
use crate::{capacity, AccumError, MAX_TREE_DEPTH};

/// Append-only leaf queue with deferred subtree merging.
///
/// Epoch discipline: `merge_sub_roots` may run repeatedly over the unmerged
/// suffix while leaves keep arriving, but once it pads a partial subtree, or
/// once `merge` produces the full-depth root, the queue is frozen and
/// further inserts fail.
#[derive(Clone, Debug)]
pub struct AccQueue {
    sub_depth: usize,
    max_depth: usize,
    zeros: Vec<Fr>,
    /// Leaves not yet folded into a subroot.
    pending: Vec<Fr>,
    sub_roots: Vec<Fr>,
    num_leaves: u64,
    merged_root: Option<(usize, Fr)>,
    frozen: bool,
}

impl AccQueue {
    pub fn new(sub_depth: usize, max_depth: usize) -> Result<Self, AccumError> {
        if sub_depth == 0 || sub_depth > max_depth {
            return Err(AccumError::BadDepth(sub_depth));
        }
        if max_depth > MAX_TREE_DEPTH {
            return Err(AccumError::BadDepth(max_depth));
        }
        Ok(Self {
            sub_depth,
            max_depth,
            zeros: zeros(max_depth, nothing_up_my_sleeve()),
            pending: Vec::new(),
            sub_roots: Vec::new(),
            num_leaves: 0,
            merged_root: None,
            frozen: false,
        })
    }

    pub fn sub_depth(&self) -> usize {
        self.sub_depth
    }

    pub fn num_leaves(&self) -> u64 {
        self.num_leaves
    }

    /// The level-0 zero every consumer must agree on.
    pub fn zero_value(&self) -> Fr {
        self.zeros[0]
    }

    fn sub_capacity(&self) -> usize {
        capacity(self.sub_depth) as usize
    }

    /// Append a leaf; returns the updated leaf count.
    pub fn insert(&mut self, leaf: Fr) -> Result<u64, AccumError> {
        if self.frozen {
            return Err(AccumError::Frozen);
        }
        let cap = capacity(self.max_depth);
        if self.num_leaves >= cap {
            return Err(AccumError::Full(cap));
        }
        self.pending.push(leaf);
        self.num_leaves += 1;
        Ok(self.num_leaves)
    }

    fn fold_subtree(&mut self, leaves: &[Fr]) -> Result<(), AccumError> {
        let mut tree = QuinTree::with_zero(self.sub_depth, self.zeros[0])?;
        for leaf in leaves {
            tree.insert(*leaf)?;
        }
        self.sub_roots.push(tree.root());
        Ok(())
    }

    /// Fold up to `num_ops` buffered subtrees into subroots (`0` = all).
    ///
    /// A trailing partial subtree is padded with the null leaf and freezes
    /// the queue for further inserts.
    pub fn merge_sub_roots(&mut self, num_ops: usize) -> Result<(), AccumError> {
        let sub_cap = self.sub_capacity();
        let mut ops = if num_ops == 0 { usize::MAX } else { num_ops };
        while ops > 0 && !self.pending.is_empty() {
            let take = self.pending.len().min(sub_cap);
            let chunk: Vec<Fr> = self.pending.drain(..take).collect();
            if chunk.len() < sub_cap {
                self.frozen = true;
            }
            self.fold_subtree(&chunk)?;
            ops -= 1;
        }
        Ok(())
    }

    /// Combine all subroots into the single root at `depth`, padding the
    /// missing subroot slots with the precomputed zero subroot. Freezes the
    /// queue for this epoch.
    pub fn merge(&mut self, depth: usize) -> Result<Fr, AccumError> {
        if !self.pending.is_empty() {
            return Err(AccumError::SubRootsNotMerged);
        }
        if depth > self.max_depth || depth < self.sub_depth {
            return Err(AccumError::BadDepth(depth));
        }
        let slots = capacity(depth - self.sub_depth);
        if (self.sub_roots.len() as u64) > slots {
            let mut needed = self.sub_depth;
            let mut have = 1u64;
            while have < self.sub_roots.len() as u64 {
                have *= TREE_ARITY as u64;
                needed += 1;
            }
            return Err(AccumError::DepthTooSmall {
                requested: depth,
                needed,
            });
        }
        let root = if depth == self.sub_depth {
            // Exactly one subroot slot.
            self.sub_roots
                .first()
                .copied()
                .unwrap_or(self.zeros[self.sub_depth])
        } else {
            let mut top = QuinTree::with_zero(depth - self.sub_depth, self.zeros[self.sub_depth])?;
            for sr in &self.sub_roots {
                top.insert(*sr)?;
            }
            top.root()
        };
        self.merged_root = Some((depth, root));
        self.frozen = true;
        Ok(root)
    }

    /// The cached root for `depth`; fails unless `merge(depth)` has run
    /// since the last insertion.
    pub fn root(&self, depth: usize) -> Result<Fr, AccumError> {
        match self.merged_root {
            Some((d, root)) if d == depth => Ok(root),
            _ => Err(AccumError::NotMerged(depth)),
        }
    }
}
