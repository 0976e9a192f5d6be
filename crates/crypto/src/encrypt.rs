//! ECDH shared keys and field-element stream encryption.
//!
//! A voter encrypts a signed command to the coordinator under the shared
//! secret of an ephemeral keypair and the coordinator's public key. The
//! cipher is an additive keystream over `Fr` with a keyed MAC element, so a
//! circuit can re-derive the keystream from the coordinator's private key
//! and check the same decryption the state machine performed.

use group::prime::PrimeCurveAffine;
use group::Curve;

use crate::hash::{concat_reprs, hash_repr_bytes};
use crate::{point_coordinates, Affine, CryptoError, Fr, Scalar};

const DOM_ENC_STREAM: &[u8; 16] = b"maci.enc.stream1";
const DOM_ENC_MAC: &[u8; 16] = b"maci.enc.mac...1";

/// An ECDH-derived shared secret point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedKey(pub Affine);

/// Ciphertext elements plus an authentication element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    pub data: Vec<Fr>,
    pub mac: Fr,
}

/// Derive the shared secret `[sk]P`. Symmetric in the two keypairs:
/// `ecdh(a, B) == ecdh(b, A)`.
pub fn ecdh(sk: &Scalar, pk: &Affine) -> SharedKey {
    SharedKey((pk.to_curve() * sk).to_affine())
}

fn keystream(key: &SharedKey, index: u64, len: usize) -> Fr {
    let (x, y) = point_coordinates(&key.0);
    let mut buf = concat_reprs(&[x, y]);
    buf.extend_from_slice(&index.to_le_bytes());
    buf.extend_from_slice(&(len as u64).to_le_bytes());
    hash_repr_bytes(DOM_ENC_STREAM, &buf)
}

fn mac(key: &SharedKey, data: &[Fr]) -> Fr {
    let (x, y) = point_coordinates(&key.0);
    let mut buf = concat_reprs(&[x, y]);
    buf.extend_from_slice(&concat_reprs(data));
    hash_repr_bytes(DOM_ENC_MAC, &buf)
}

/// Encrypt a fixed-width plaintext. Deterministic for a given key/plaintext.
pub fn encrypt(plaintext: &[Fr], key: &SharedKey) -> Ciphertext {
    let len = plaintext.len();
    let data: Vec<Fr> = plaintext
        .iter()
        .enumerate()
        .map(|(i, p)| *p + keystream(key, i as u64, len))
        .collect();
    let mac = mac(key, &data);
    Ciphertext { data, mac }
}

/// Decrypt and authenticate. Fails without yielding a partial plaintext.
pub fn decrypt(ct: &Ciphertext, key: &SharedKey) -> Result<Vec<Fr>, CryptoError> {
    if mac(key, &ct.data) != ct.mac {
        return Err(CryptoError::MacMismatch);
    }
    let len = ct.data.len();
    Ok(ct
        .data
        .iter()
        .enumerate()
        .map(|(i, c)| *c - keystream(key, i as u64, len))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive_pub_key;
    use ff::Field;
    use rand::{rngs::StdRng, SeedableRng};

    fn keys(seed: u64) -> (Scalar, Affine) {
        let mut rng = StdRng::seed_from_u64(seed);
        let sk = Scalar::random(&mut rng);
        let pk = derive_pub_key(&sk);
        (sk, pk)
    }

    #[test]
    fn ecdh_is_symmetric() {
        let (a_sk, a_pk) = keys(10);
        let (b_sk, b_pk) = keys(11);
        assert_eq!(ecdh(&a_sk, &b_pk), ecdh(&b_sk, &a_pk));
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let (a_sk, _) = keys(12);
        let (_, b_pk) = keys(13);
        let key = ecdh(&a_sk, &b_pk);
        let pt: Vec<Fr> = (0..12u64).map(Fr::from).collect();
        let ct = encrypt(&pt, &key);
        assert_eq!(decrypt(&ct, &key).unwrap(), pt);
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let (a_sk, _) = keys(14);
        let (_, b_pk) = keys(15);
        let key = ecdh(&a_sk, &b_pk);
        let pt = vec![Fr::from(3u64), Fr::from(4u64)];
        let mut ct = encrypt(&pt, &key);
        ct.data[0] += Fr::ONE;
        assert_eq!(decrypt(&ct, &key), Err(CryptoError::MacMismatch));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let (a_sk, _) = keys(16);
        let (b_sk, b_pk) = keys(17);
        let (c_sk, _) = keys(18);
        let key = ecdh(&a_sk, &b_pk);
        let ct = encrypt(&[Fr::from(9u64)], &key);
        let wrong = ecdh(&c_sk, &derive_pub_key(&b_sk));
        assert!(decrypt(&ct, &wrong).is_err());
    }
}
