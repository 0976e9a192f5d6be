//! Domain-separated hashing into the Pallas fields.
//!
//! Every derivation is BLAKE2b with a 16-byte personalization tag and a
//! 64-byte output reduced into the target field, so independent verifiers
//! (and circuits re-deriving the same values) agree bit-for-bit.

use blake2b_simd::Params as Blake2bParams;
use ff::{FromUniformBytes, PrimeField};

use crate::{Fr, Scalar};

/// Number of children per internal tree node.
pub const TREE_ARITY: usize = 5;

// Personalization tags, all exactly 16 bytes.
const DOM_TREE_NODE: &[u8; 16] = b"maci.tree.node.5";
const DOM_FIELDS: &[u8; 16] = b"maci.hash.fields";
const DOM_NUMS: &[u8; 16] = b"maci.nums.leaf.1";
const DOM_TO_SCALAR: &[u8; 16] = b"maci.to.scalar.1";

/// Tag bytes hashed to produce the canonical null-leaf value.
const NUMS_PREIMAGE: &[u8] = b"nothing-up-my-sleeve";

pub(crate) fn hash_repr_bytes(personal: &[u8; 16], buf: &[u8]) -> Fr {
    let hash = Blake2bParams::new()
        .hash_length(64)
        .personal(personal)
        .hash(buf);
    let mut wide = [0u8; 64];
    wide.copy_from_slice(hash.as_bytes());
    <Fr as FromUniformBytes<64>>::from_uniform_bytes(&wide)
}

pub(crate) fn concat_reprs(inputs: &[Fr]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(inputs.len() * 32);
    for x in inputs {
        buf.extend_from_slice(x.to_repr().as_ref());
    }
    buf
}

/// Hash a slice of field elements into one field element.
///
/// The input length is part of the image (the canonical reprs are fixed
/// width), so `hash_fields(&[a])` and `hash_fields(&[a, ZERO])` differ.
pub fn hash_fields(inputs: &[Fr]) -> Fr {
    hash_repr_bytes(DOM_FIELDS, &concat_reprs(inputs))
}

/// Compress five children into a parent node (quinary tree step).
pub fn hash5(children: &[Fr; TREE_ARITY]) -> Fr {
    hash_repr_bytes(DOM_TREE_NODE, &concat_reprs(children))
}

/// Two-input convenience wrapper over [`hash_fields`].
pub fn hash2(a: Fr, b: Fr) -> Fr {
    hash_fields(&[a, b])
}

/// Hash arbitrary bytes into the scalar (private-key) field.
pub fn hash_to_scalar(personal: &[u8; 16], buf: &[u8]) -> Scalar {
    let hash = Blake2bParams::new()
        .hash_length(64)
        .personal(personal)
        .hash(buf);
    let mut wide = [0u8; 64];
    wide.copy_from_slice(hash.as_bytes());
    <Scalar as FromUniformBytes<64>>::from_uniform_bytes(&wide)
}

/// Derive a private-key scalar from a passphrase. Stable across invocations.
pub fn passphrase_to_scalar(passphrase: &str) -> Scalar {
    hash_to_scalar(DOM_TO_SCALAR, passphrase.as_bytes())
}

/// The canonical null-leaf value ("nothing up my sleeve"): the hash of a
/// fixed ASCII tag, used as the level-0 zero of every protocol tree.
pub fn nothing_up_my_sleeve() -> Fr {
    hash_repr_bytes(DOM_NUMS, NUMS_PREIMAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;

    #[test]
    fn hash_is_deterministic_and_input_sensitive() {
        let a = Fr::from(7u64);
        let b = Fr::from(11u64);
        assert_eq!(hash2(a, b), hash2(a, b));
        assert_ne!(hash2(a, b), hash2(b, a));
        assert_ne!(hash_fields(&[a]), hash_fields(&[a, Fr::ZERO]));
    }

    #[test]
    fn tree_node_domain_is_separated_from_generic_hash() {
        let xs = [Fr::from(1u64); TREE_ARITY];
        assert_ne!(hash5(&xs), hash_fields(&xs));
    }

    #[test]
    fn null_leaf_is_stable_and_nonzero() {
        let z = nothing_up_my_sleeve();
        assert_eq!(z, nothing_up_my_sleeve());
        assert_ne!(z, Fr::ZERO);
    }

    #[test]
    fn passphrase_derivation_is_deterministic() {
        let a = passphrase_to_scalar("correct horse battery staple");
        let b = passphrase_to_scalar("correct horse battery staple");
        let c = passphrase_to_scalar("correct horse battery stapl3");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
