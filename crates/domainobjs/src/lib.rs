//! Typed records of the MACI voting protocol: keypairs, commands, messages,
//! ballots, state leaves, and the opaque verifying-key records.

pub mod ballot;
pub mod command;
pub mod keys;
pub mod state_leaf;
pub mod vk;

pub use ballot::*;
pub use command::*;
pub use keys::*;
pub use state_leaf::*;
pub use vk::*;

pub use maci_crypto::{SharedKey, Signature};

use maci_crypto::Fr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomainError {
    /// Serialized key did not carry the expected `macipk.`/`macisk.` tag.
    #[error("unrecognized key prefix in {0:?}")]
    BadKeyPrefix(String),
    /// Serialized key payload was not valid hex of the right width.
    #[error("malformed key hex")]
    BadKeyHex,
    /// Bytes did not decode to a field element or curve point.
    #[error("invalid key encoding")]
    BadKeyEncoding,
    /// A decrypted plaintext did not have the command wire shape.
    #[error("malformed command plaintext")]
    BadPlaintext,
    /// Ballot weight vector does not fit the vote option tree.
    #[error("ballot does not fit a depth-{0} vote option tree")]
    BallotTooWide(usize),
    /// Decryption failed outright (MAC mismatch).
    #[error("message decryption failed")]
    DecryptionFailed,
}

/// Read a `u64` back out of a field element; `None` if it does not fit.
pub(crate) fn fr_to_u64(x: &Fr) -> Option<u64> {
    use ff::PrimeField;
    let repr = x.to_repr();
    let bytes = repr.as_ref();
    if bytes[8..].iter().any(|&b| b != 0) {
        return None;
    }
    let mut le = [0u8; 8];
    le.copy_from_slice(&bytes[..8]);
    Some(u64::from_le_bytes(le))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;

    #[test]
    fn u64_embedding_roundtrips() {
        assert_eq!(fr_to_u64(&Fr::from(0u64)), Some(0));
        assert_eq!(fr_to_u64(&Fr::from(u64::MAX)), Some(u64::MAX));
        assert_eq!(fr_to_u64(&(Fr::from(u64::MAX) + Fr::ONE)), None);
    }
}
