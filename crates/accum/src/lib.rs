//! Incremental quinary Merkle structures for MACI.
//!
//! This crate provides a canonical API for accumulator roots, inclusion
//! proofs, and the two-phase accumulator queue whose subtree batching bounds
//! the incremental-update cost inside circuits.

pub mod queue;
pub mod tree;

pub use queue::AccQueue;
pub use tree::{zeros, MerklePath, QuinTree};

use maci_crypto::TREE_ARITY;

/// Number of leaves in a quinary tree of the given depth.
///
/// Depths above 27 would overflow a `u64` leaf count and are rejected by the
/// constructors, so the multiplication here cannot wrap.
pub fn capacity(depth: usize) -> u64 {
    (TREE_ARITY as u64).pow(depth as u32)
}

/// Deepest tree any accumulator will accept.
pub const MAX_TREE_DEPTH: usize = 27;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccumError {
    /// Insert beyond the configured capacity.
    #[error("accumulator is full (capacity {0})")]
    Full(u64),
    /// Insert after the epoch was frozen by `merge` or a padded subtree.
    #[error("accumulator is frozen for this epoch")]
    Frozen,
    /// `merge` called while buffered leaves have not been folded into
    /// subroots.
    #[error("merge_sub_roots must consume all buffered leaves first")]
    SubRootsNotMerged,
    /// `root(depth)` called before `merge(depth)`.
    #[error("no merged root at depth {0}")]
    NotMerged(usize),
    /// Requested depth cannot hold the accumulated leaves or subroots.
    #[error("depth {requested} too small, need at least {needed}")]
    DepthTooSmall { requested: usize, needed: usize },
    /// Tree depth outside the supported range.
    #[error("unsupported tree depth {0}")]
    BadDepth(usize),
    /// Leaf index outside the populated range.
    #[error("leaf index {0} out of range")]
    LeafOutOfRange(u64),
}
