//! Deterministic Schnorr signatures over Pallas.
//!
//! Commands are signed over their canonical field hash. The nonce is derived
//! from the private key and the message (no signing RNG), so the same command
//! signed twice yields the same signature, which keeps message processing
//! replayable.

use ff::PrimeField;
use group::prime::PrimeCurveAffine;
use group::{Curve, Group};

use crate::{hash_to_scalar, Affine, Fr, Point, Scalar};

const DOM_SIG_NONCE: &[u8; 16] = b"maci.sig.nonce.1";
const DOM_SIG_CHAL: &[u8; 16] = b"maci.sig.chal..1";

/// A Schnorr signature: commitment point `r` and response scalar `s`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    pub r: Affine,
    pub s: Scalar,
}

/// Public key derivation: `[sk]G`.
pub fn derive_pub_key(sk: &Scalar) -> Affine {
    (Point::generator() * sk).to_affine()
}

fn challenge(r: &Affine, pk: &Affine, msg: &Fr) -> Scalar {
    let mut buf = Vec::with_capacity(96);
    buf.extend_from_slice(&point_bytes(r));
    buf.extend_from_slice(&point_bytes(pk));
    buf.extend_from_slice(msg.to_repr().as_ref());
    hash_to_scalar(DOM_SIG_CHAL, &buf)
}

fn point_bytes(p: &Affine) -> [u8; 32] {
    use group::GroupEncoding;
    let bytes = p.to_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(bytes.as_ref());
    out
}

/// Sign a message hash with the private scalar.
pub fn sign(sk: &Scalar, msg: &Fr) -> Signature {
    let pk = derive_pub_key(sk);
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(sk.to_repr().as_ref());
    seed.extend_from_slice(msg.to_repr().as_ref());
    let k = hash_to_scalar(DOM_SIG_NONCE, &seed);
    let r = (Point::generator() * k).to_affine();
    let e = challenge(&r, &pk, msg);
    Signature { r, s: k + e * sk }
}

/// Verify `[s]G == R + [e]P`. Returns `false` on any mismatch; never panics.
pub fn verify(pk: &Affine, msg: &Fr, sig: &Signature) -> bool {
    let e = challenge(&sig.r, pk, msg);
    let lhs = Point::generator() * sig.s;
    let rhs = sig.r.to_curve() + pk.to_curve() * e;
    lhs.to_affine() == rhs.to_affine()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn sign_verify_roundtrip() {
        let mut rng = StdRng::seed_from_u64(1);
        let sk = Scalar::random(&mut rng);
        let pk = derive_pub_key(&sk);
        let msg = Fr::from(123u64);
        let sig = sign(&sk, &msg);
        assert!(verify(&pk, &msg, &sig));
    }

    #[test]
    fn signing_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(2);
        let sk = Scalar::random(&mut rng);
        let msg = Fr::from(99u64);
        assert_eq!(sign(&sk, &msg), sign(&sk, &msg));
    }

    #[test]
    fn rejects_wrong_key_and_wrong_message() {
        let mut rng = StdRng::seed_from_u64(3);
        let sk = Scalar::random(&mut rng);
        let other = Scalar::random(&mut rng);
        let msg = Fr::from(5u64);
        let sig = sign(&sk, &msg);
        assert!(!verify(&derive_pub_key(&other), &msg, &sig));
        assert!(!verify(&derive_pub_key(&sk), &Fr::from(6u64), &sig));
    }

    #[test]
    fn rejects_tampered_signature() {
        let mut rng = StdRng::seed_from_u64(4);
        let sk = Scalar::random(&mut rng);
        let pk = derive_pub_key(&sk);
        let msg = Fr::from(77u64);
        let mut sig = sign(&sk, &msg);
        sig.s += Scalar::ONE;
        assert!(!verify(&pk, &msg, &sig));
    }
}
