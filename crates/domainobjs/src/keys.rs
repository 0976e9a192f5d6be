//! Keypairs and their serialized forms.
//!
//! Serialized keys are type-tagged strings, `macisk.<hex>` for private keys
//! and `macipk.<hex>` for public keys, so a value reconstructed by
//! `unserialize` is unambiguously one or the other.

use ff::PrimeField;
use group::GroupEncoding;
use maci_crypto::{derive_pub_key, ecdh, passphrase_to_scalar, Affine, Scalar, SharedKey};
use rand_core::RngCore;

use crate::DomainError;

pub const PRIV_KEY_PREFIX: &str = "macisk.";
pub const PUB_KEY_PREFIX: &str = "macipk.";

/// A private key: a scalar in the prime-order key field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrivKey(pub Scalar);

/// A public key: the curve point `[sk]G`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PubKey(pub Affine);

impl PrivKey {
    pub fn serialize(&self) -> String {
        format!("{}{}", PRIV_KEY_PREFIX, hex::encode(self.0.to_repr()))
    }

    pub fn unserialize(s: &str) -> Result<Self, DomainError> {
        let body = s
            .strip_prefix(PRIV_KEY_PREFIX)
            .ok_or_else(|| DomainError::BadKeyPrefix(s.to_owned()))?;
        let bytes: [u8; 32] = hex::decode(body)
            .map_err(|_| DomainError::BadKeyHex)?
            .try_into()
            .map_err(|_| DomainError::BadKeyHex)?;
        let scalar = Option::<Scalar>::from(Scalar::from_repr(bytes))
            .ok_or(DomainError::BadKeyEncoding)?;
        Ok(PrivKey(scalar))
    }

    pub fn pub_key(&self) -> PubKey {
        PubKey(derive_pub_key(&self.0))
    }
}

impl PubKey {
    pub fn serialize(&self) -> String {
        format!("{}{}", PUB_KEY_PREFIX, hex::encode(self.0.to_bytes()))
    }

    pub fn unserialize(s: &str) -> Result<Self, DomainError> {
        let body = s
            .strip_prefix(PUB_KEY_PREFIX)
            .ok_or_else(|| DomainError::BadKeyPrefix(s.to_owned()))?;
        let bytes: [u8; 32] = hex::decode(body)
            .map_err(|_| DomainError::BadKeyHex)?
            .try_into()
            .map_err(|_| DomainError::BadKeyHex)?;
        let point = Option::<Affine>::from(Affine::from_bytes(&bytes))
            .ok_or(DomainError::BadKeyEncoding)?;
        Ok(PubKey(point))
    }
}

macro_rules! string_serde {
    ($ty:ident, $expecting:expr) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.serialize())
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct V;
                impl<'de> serde::de::Visitor<'de> for V {
                    type Value = $ty;
                    fn expecting(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                        write!(f, $expecting)
                    }
                    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                        $ty::unserialize(v).map_err(E::custom)
                    }
                }
                deserializer.deserialize_str(V)
            }
        }
    };
}

string_serde!(PrivKey, "a macisk.-prefixed private key string");
string_serde!(PubKey, "a macipk.-prefixed public key string");

/// A private scalar together with its derived public point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keypair {
    pub priv_key: PrivKey,
    pub pub_key: PubKey,
}

impl Keypair {
    /// Fresh keypair from an external randomness source.
    pub fn random(rng: &mut impl RngCore) -> Self {
        use ff::Field;
        Self::from_priv_key(PrivKey(Scalar::random(rng)))
    }

    /// Deterministic keypair from a passphrase. Same passphrase, same keys.
    pub fn from_seed(passphrase: &str) -> Self {
        Self::from_priv_key(PrivKey(passphrase_to_scalar(passphrase)))
    }

    pub fn from_priv_key(priv_key: PrivKey) -> Self {
        let pub_key = priv_key.pub_key();
        Keypair { priv_key, pub_key }
    }

    /// ECDH between one party's private key and the other's public key.
    pub fn gen_ecdh_shared_key(sk: &PrivKey, pk: &PubKey) -> SharedKey {
        ecdh(&sk.0, &pk.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn key_serialization_roundtrips() {
        let mut rng = StdRng::seed_from_u64(21);
        let kp = Keypair::random(&mut rng);
        let sk = PrivKey::unserialize(&kp.priv_key.serialize()).unwrap();
        let pk = PubKey::unserialize(&kp.pub_key.serialize()).unwrap();
        assert_eq!(sk, kp.priv_key);
        assert_eq!(pk, kp.pub_key);
    }

    #[test]
    fn unserialize_rejects_wrong_tag_and_bad_payloads() {
        let mut rng = StdRng::seed_from_u64(22);
        let kp = Keypair::random(&mut rng);
        // A public key string is not a private key.
        assert!(matches!(
            PrivKey::unserialize(&kp.pub_key.serialize()),
            Err(DomainError::BadKeyPrefix(_))
        ));
        assert_eq!(
            PrivKey::unserialize("macisk.zzzz"),
            Err(DomainError::BadKeyHex)
        );
        assert_eq!(
            PubKey::unserialize(&format!("{}{}", PUB_KEY_PREFIX, "ab".repeat(8))),
            Err(DomainError::BadKeyHex)
        );
    }

    #[test]
    fn seeded_keypairs_are_deterministic() {
        let a = Keypair::from_seed("01234567890123456789012345678901");
        let b = Keypair::from_seed("01234567890123456789012345678901");
        let c = Keypair::from_seed("01234567890123456789012345678902");
        assert_eq!(a, b);
        assert_ne!(a.priv_key, c.priv_key);
    }

    #[test]
    fn pub_key_is_a_function_of_the_private_scalar() {
        let kp = Keypair::from_seed("x");
        assert_eq!(kp.pub_key, kp.priv_key.pub_key());
    }

    #[test]
    fn ecdh_shared_key_is_symmetric() {
        let a = Keypair::from_seed("a");
        let b = Keypair::from_seed("b");
        assert_eq!(
            Keypair::gen_ecdh_shared_key(&a.priv_key, &b.pub_key),
            Keypair::gen_ecdh_shared_key(&b.priv_key, &a.pub_key)
        );
    }

    #[test]
    fn serde_roundtrips_through_tagged_strings() {
        let kp = Keypair::from_seed("serde");
        let pk_json = serde_json::to_string(&kp.pub_key).unwrap();
        assert!(pk_json.contains(PUB_KEY_PREFIX));
        let back: PubKey = serde_json::from_str(&pk_json).unwrap();
        assert_eq!(back, kp.pub_key);
    }
}
