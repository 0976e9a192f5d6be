//! Per-voter ballots.

use ff::Field;
use maci_accum::QuinTree;
use maci_crypto::{hash2, Fr};

use crate::DomainError;

/// One ballot per state-tree leaf: the last applied nonce and the per-option
/// vote weights. Mutated only by successful command application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ballot {
    pub nonce: u64,
    pub votes: Vec<u64>,
}

impl Ballot {
    /// A blank ballot over `num_options` options.
    pub fn new(num_options: usize) -> Self {
        Ballot {
            nonce: 0,
            votes: vec![0; num_options],
        }
    }

    /// Ballot commitment: `hash2(nonce, votes_root)` where `votes_root` is
    /// the quinary tree over the weights at `vote_option_tree_depth`. The
    /// vote tree's empty leaves are zero weights, not the null leaf.
    ///
    /// Fails if the weight vector does not fit a tree of that depth.
    pub fn hash(&self, vote_option_tree_depth: usize) -> Result<Fr, DomainError> {
        let mut tree = QuinTree::with_zero(vote_option_tree_depth, Fr::ZERO)
            .map_err(|_| DomainError::BallotTooWide(vote_option_tree_depth))?;
        for w in &self.votes {
            tree.insert(Fr::from(*w))
                .map_err(|_| DomainError::BallotTooWide(vote_option_tree_depth))?;
        }
        Ok(hash2(Fr::from(self.nonce), tree.root()))
    }
}
