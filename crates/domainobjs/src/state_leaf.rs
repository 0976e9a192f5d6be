//! State-tree leaves: voter identity commitments.

use group::{Curve, Group};
use maci_crypto::{hash_fields, point_coordinates, Fr, Point};

use crate::PubKey;

/// Commitment to a voter's public key, voice-credit balance, and sign-up
/// timestamp. Immutable once inserted except through key-change commands
/// applied during message processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateLeaf {
    pub pub_key: PubKey,
    pub voice_credit_balance: u64,
    pub timestamp: u64,
}

impl StateLeaf {
    pub fn new(pub_key: PubKey, voice_credit_balance: u64, timestamp: u64) -> Self {
        StateLeaf {
            pub_key,
            voice_credit_balance,
            timestamp,
        }
    }

    /// The reserved padding leaf at state index 0. Its public key is the
    /// identity point, which no honest keypair can produce.
    pub fn blank() -> Self {
        StateLeaf {
            pub_key: PubKey(Point::identity().to_affine()),
            voice_credit_balance: 0,
            timestamp: 0,
        }
    }

    /// Identity commitment: hash(pub key, balance, timestamp).
    pub fn hash(&self) -> Fr {
        let (x, y) = point_coordinates(&self.pub_key.0);
        hash_fields(&[
            x,
            y,
            Fr::from(self.voice_credit_balance),
            Fr::from(self.timestamp),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Keypair;

    #[test]
    fn blank_leaf_is_stable() {
        assert_eq!(StateLeaf::blank(), StateLeaf::blank());
        assert_eq!(StateLeaf::blank().hash(), StateLeaf::blank().hash());
    }

    #[test]
    fn hash_commits_to_all_fields() {
        let kp = Keypair::from_seed("leaf");
        let leaf = StateLeaf::new(kp.pub_key, 100, 1_700_000_000);
        let mut poorer = leaf;
        poorer.voice_credit_balance = 99;
        let mut older = leaf;
        older.timestamp += 1;
        assert_ne!(leaf.hash(), poorer.hash());
        assert_ne!(leaf.hash(), older.hash());
        assert_ne!(leaf.hash(), StateLeaf::blank().hash());
    }
}
