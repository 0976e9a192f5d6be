//! Cryptographic primitives for the MACI state machine.
//!
//! Everything operates over the Pallas curve: the protocol field `Fr` is the
//! Pallas base field (the domain of all tree leaves and circuit signals),
//! private keys live in the Pallas scalar field, and public keys are Pallas
//! points. Hashing is BLAKE2b with 16-byte personalization tags and wide
//! reduction into the target field.

pub mod encrypt;
pub mod hash;
pub mod sign;

pub use encrypt::*;
pub use hash::*;
pub use sign::*;

use ff::Field;
use pasta_curves::arithmetic::CurveAffine;
use pasta_curves::pallas;

/// The protocol field: Pallas base field. Leaves, roots, commitments and
/// circuit signals are all `Fr` values.
pub type Fr = pallas::Base;

/// The key field: Pallas scalar field.
pub type Scalar = pallas::Scalar;

/// A curve point in projective form.
pub type Point = pallas::Point;

/// A curve point in affine form (the wire/commitment representation).
pub type Affine = pallas::Affine;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Ciphertext MAC did not verify under the provided shared key.
    #[error("ciphertext authentication failed")]
    MacMismatch,
    /// Bytes did not decode to a valid curve point or field element.
    #[error("malformed point or field encoding")]
    InvalidEncoding,
}

/// Affine coordinates of a point, with the identity mapped to (0, 0).
///
/// The identity never appears as an honest public key; the (0, 0) mapping
/// exists so padding objects (e.g. the blank state leaf) hash uniformly.
pub fn point_coordinates(p: &Affine) -> (Fr, Fr) {
    match Option::from(p.coordinates()) {
        Some(c) => {
            let c: pasta_curves::arithmetic::Coordinates<_> = c;
            (*c.x(), *c.y())
        }
        None => (Fr::ZERO, Fr::ZERO),
    }
}
