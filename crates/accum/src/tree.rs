//! Dense-prefix incremental quinary Merkle tree.
//!
//! Leaves are appended left to right; absent nodes read as the per-level
//! zero, so the root over `n` leaves equals the root of a full tree padded
//! with the canonical null leaf. Updates recompute only the touched path.

use ff::Field;
use maci_crypto::{hash5, nothing_up_my_sleeve, Fr, TREE_ARITY};

use crate::{capacity, AccumError, MAX_TREE_DEPTH};

/// Per-level zero hashes: `out[0] = zero`, `out[l + 1] = hash5([out[l]; 5])`.
pub fn zeros(depth: usize, zero: Fr) -> Vec<Fr> {
    let mut out = Vec::with_capacity(depth + 1);
    out.push(zero);
    for l in 0..depth {
        out.push(hash5(&[out[l]; TREE_ARITY]));
    }
    out
}

/// An inclusion path: four siblings per level, leaf position encoded in
/// `index` (base-5 digits, least significant first).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    pub index: u64,
    pub siblings: Vec<[Fr; TREE_ARITY - 1]>,
}

impl MerklePath {
    /// Recompute the root from `leaf` and compare.
    pub fn verify(&self, root: Fr, leaf: Fr) -> bool {
        let mut cur = leaf;
        let mut pos = self.index;
        for sibs in &self.siblings {
            let k = (pos % TREE_ARITY as u64) as usize;
            let mut children = [Fr::ZERO; TREE_ARITY];
            let mut s = 0;
            for (i, child) in children.iter_mut().enumerate() {
                if i == k {
                    *child = cur;
                } else {
                    *child = sibs[s];
                    s += 1;
                }
            }
            cur = hash5(&children);
            pos /= TREE_ARITY as u64;
        }
        cur == root
    }
}

/// Fixed-depth incremental quinary tree.
#[derive(Clone, Debug)]
pub struct QuinTree {
    depth: usize,
    zeros: Vec<Fr>,
    /// levels[0] holds leaves; levels[depth] holds the root when occupied.
    levels: Vec<Vec<Fr>>,
    num_leaves: u64,
}

impl QuinTree {
    /// A tree whose empty leaves read as the canonical null leaf.
    pub fn new(depth: usize) -> Result<Self, AccumError> {
        Self::with_zero(depth, nothing_up_my_sleeve())
    }

    /// A tree with a caller-chosen level-0 zero (used by the accumulator
    /// queue, whose subroot tree has zero subroots as empty leaves).
    pub fn with_zero(depth: usize, zero: Fr) -> Result<Self, AccumError> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(AccumError::BadDepth(depth));
        }
        Ok(Self {
            depth,
            zeros: zeros(depth, zero),
            levels: vec![Vec::new(); depth + 1],
            num_leaves: 0,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn num_leaves(&self) -> u64 {
        self.num_leaves
    }

    fn node(&self, level: usize, idx: u64) -> Fr {
        self.levels[level]
            .get(idx as usize)
            .copied()
            .unwrap_or(self.zeros[level])
    }

    fn set_node(&mut self, level: usize, idx: u64, value: Fr) {
        let row = &mut self.levels[level];
        let idx = idx as usize;
        if idx >= row.len() {
            let zero = self.zeros[level];
            row.resize(idx + 1, zero);
        }
        row[idx] = value;
    }

    fn recompute_path(&mut self, mut idx: u64) {
        for level in 0..self.depth {
            let parent = idx / TREE_ARITY as u64;
            let base = parent * TREE_ARITY as u64;
            let mut children = [Fr::ZERO; TREE_ARITY];
            for (i, child) in children.iter_mut().enumerate() {
                *child = self.node(level, base + i as u64);
            }
            self.set_node(level + 1, parent, hash5(&children));
            idx = parent;
        }
    }

    /// Append a leaf; returns the new leaf count.
    pub fn insert(&mut self, leaf: Fr) -> Result<u64, AccumError> {
        let cap = capacity(self.depth);
        if self.num_leaves >= cap {
            return Err(AccumError::Full(cap));
        }
        let idx = self.num_leaves;
        self.set_node(0, idx, leaf);
        self.num_leaves += 1;
        self.recompute_path(idx);
        Ok(self.num_leaves)
    }

    /// Replace an existing leaf in place.
    pub fn update(&mut self, index: u64, leaf: Fr) -> Result<(), AccumError> {
        if index >= self.num_leaves {
            return Err(AccumError::LeafOutOfRange(index));
        }
        self.set_node(0, index, leaf);
        self.recompute_path(index);
        Ok(())
    }

    pub fn leaf(&self, index: u64) -> Fr {
        self.node(0, index)
    }

    pub fn root(&self) -> Fr {
        self.node(self.depth, 0)
    }

    /// Inclusion path for a populated or zero-padded leaf slot.
    pub fn path(&self, index: u64) -> Result<MerklePath, AccumError> {
        if index >= capacity(self.depth) {
            return Err(AccumError::LeafOutOfRange(index));
        }
        let mut siblings = Vec::with_capacity(self.depth);
        let mut idx = index;
        for level in 0..self.depth {
            let parent = idx / TREE_ARITY as u64;
            let base = parent * TREE_ARITY as u64;
            let k = (idx % TREE_ARITY as u64) as usize;
            let mut sibs = [Fr::ZERO; TREE_ARITY - 1];
            let mut s = 0;
            for i in 0..TREE_ARITY {
                if i != k {
                    sibs[s] = self.node(level, base + i as u64);
                    s += 1;
                }
            }
            siblings.push(sibs);
            idx = parent;
        }
        Ok(MerklePath { index, siblings })
    }
}
