//! Commands and their encrypted on-tree form, messages.
//!
//! A command is the voter's plaintext intent. Signing it and encrypting the
//! command + signature under an ECDH shared key yields a message; the leaf
//! inserted into the poll's message accumulator is the hash of the
//! ciphertext together with the ephemeral public key, so insertion order is
//! committed.

use ff::PrimeField;
use maci_crypto::{
    decrypt, encrypt, hash_fields, point_coordinates, sign, verify, Ciphertext, Fr, Scalar,
    SharedKey, Signature,
};
use pasta_curves::arithmetic::CurveAffine;

use crate::{fr_to_u64, DomainError, PrivKey, PubKey};

/// Field elements in a packed command plaintext: seven command fields (the
/// public key takes two coordinates), the salt, and the signature (R takes
/// two coordinates, s two 128-bit limbs).
pub const CMD_PLAINTEXT_LEN: usize = 12;

/// Ciphertext elements in a message: the plaintext plus the MAC element.
pub const MSG_LEN: usize = CMD_PLAINTEXT_LEN + 1;

/// Unsigned voter intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    /// Index of the voter's leaf in the poll's state tree.
    pub state_index: u64,
    /// Replacement public key; equal to the current one when no rotation is
    /// intended.
    pub new_pub_key: PubKey,
    pub vote_option_index: u64,
    pub new_vote_weight: u64,
    /// Must equal the ballot nonce + 1 to apply.
    pub nonce: u64,
    pub poll_id: u64,
    /// Blinds the command hash; chosen by the voter.
    pub salt: Fr,
}

impl Command {
    /// Canonical hash of all command fields; the value that gets signed.
    pub fn hash(&self) -> Fr {
        let (x, y) = point_coordinates(&self.new_pub_key.0);
        hash_fields(&[
            Fr::from(self.state_index),
            x,
            y,
            Fr::from(self.vote_option_index),
            Fr::from(self.new_vote_weight),
            Fr::from(self.nonce),
            Fr::from(self.poll_id),
            self.salt,
        ])
    }

    pub fn sign(&self, sk: &PrivKey) -> Signature {
        sign(&sk.0, &self.hash())
    }

    pub fn verify_signature(&self, pk: &PubKey, sig: &Signature) -> bool {
        verify(&pk.0, &self.hash(), sig)
    }

    fn pack(&self, sig: &Signature) -> [Fr; CMD_PLAINTEXT_LEN] {
        let (px, py) = point_coordinates(&self.new_pub_key.0);
        let (rx, ry) = point_coordinates(&sig.r);
        let (s_lo, s_hi) = split_scalar(&sig.s);
        [
            Fr::from(self.state_index),
            px,
            py,
            Fr::from(self.vote_option_index),
            Fr::from(self.new_vote_weight),
            Fr::from(self.nonce),
            Fr::from(self.poll_id),
            self.salt,
            rx,
            ry,
            s_lo,
            s_hi,
        ]
    }

    fn unpack(pt: &[Fr]) -> Result<(Command, Signature), DomainError> {
        if pt.len() != CMD_PLAINTEXT_LEN {
            return Err(DomainError::BadPlaintext);
        }
        let new_pub_key = point_from_coordinates(&pt[1], &pt[2])?;
        let r = point_from_coordinates(&pt[8], &pt[9])?;
        let s = join_scalar(&pt[10], &pt[11]).ok_or(DomainError::BadPlaintext)?;
        let cmd = Command {
            state_index: fr_to_u64(&pt[0]).ok_or(DomainError::BadPlaintext)?,
            new_pub_key,
            vote_option_index: fr_to_u64(&pt[3]).ok_or(DomainError::BadPlaintext)?,
            new_vote_weight: fr_to_u64(&pt[4]).ok_or(DomainError::BadPlaintext)?,
            nonce: fr_to_u64(&pt[5]).ok_or(DomainError::BadPlaintext)?,
            poll_id: fr_to_u64(&pt[6]).ok_or(DomainError::BadPlaintext)?,
            salt: pt[7],
        };
        Ok((cmd, Signature { r: r.0, s }))
    }

    /// Encrypt the signed command under an ECDH shared key.
    pub fn encrypt(&self, sig: &Signature, shared: &SharedKey) -> Message {
        let ct = encrypt(&self.pack(sig), shared);
        let mut data = ct.data;
        data.push(ct.mac);
        Message { data }
    }
}

/// Encrypted, committed form of a signed command. The ephemeral public key
/// travels alongside (in the clear) so the coordinator can decrypt later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Ciphertext elements; the last element is the MAC.
    pub data: Vec<Fr>,
}

impl Message {
    /// Leaf commitment inserted into the message accumulator.
    pub fn hash(&self, enc_pub_key: &PubKey) -> Fr {
        let (x, y) = point_coordinates(&enc_pub_key.0);
        let mut inputs = self.data.clone();
        inputs.push(x);
        inputs.push(y);
        hash_fields(&inputs)
    }

    /// Decrypt and authenticate, reconstructing the command and signature.
    pub fn decrypt(&self, shared: &SharedKey) -> Result<(Command, Signature), DomainError> {
        if self.data.len() != MSG_LEN {
            return Err(DomainError::BadPlaintext);
        }
        let ct = Ciphertext {
            data: self.data[..CMD_PLAINTEXT_LEN].to_vec(),
            mac: self.data[CMD_PLAINTEXT_LEN],
        };
        let pt = decrypt(&ct, shared).map_err(|_| DomainError::DecryptionFailed)?;
        Command::unpack(&pt)
    }
}

fn point_from_coordinates(x: &Fr, y: &Fr) -> Result<PubKey, DomainError> {
    use ff::Field;
    use group::{Curve, Group};
    if *x == Fr::ZERO && *y == Fr::ZERO {
        // The identity encoding used for padding objects.
        return Ok(PubKey(maci_crypto::Point::identity().to_affine()));
    }
    let p = maci_crypto::Affine::from_xy(*x, *y);
    Option::<maci_crypto::Affine>::from(p)
        .map(PubKey)
        .ok_or(DomainError::BadPlaintext)
}

/// Split a key-field scalar into two 128-bit limbs embedded in `Fr`.
fn split_scalar(s: &Scalar) -> (Fr, Fr) {
    let repr = s.to_repr();
    let bytes = repr.as_ref();
    let mut lo = [0u8; 16];
    let mut hi = [0u8; 16];
    lo.copy_from_slice(&bytes[..16]);
    hi.copy_from_slice(&bytes[16..]);
    (
        Fr::from_u128(u128::from_le_bytes(lo)),
        Fr::from_u128(u128::from_le_bytes(hi)),
    )
}

fn join_scalar(lo: &Fr, hi: &Fr) -> Option<Scalar> {
    let lo_repr = lo.to_repr();
    let hi_repr = hi.to_repr();
    let (lo_bytes, hi_bytes) = (lo_repr.as_ref(), hi_repr.as_ref());
    // Each limb must actually fit in 128 bits.
    if lo_bytes[16..].iter().any(|&b| b != 0) || hi_bytes[16..].iter().any(|&b| b != 0) {
        return None;
    }
    let mut repr = [0u8; 32];
    repr[..16].copy_from_slice(&lo_bytes[..16]);
    repr[16..].copy_from_slice(&hi_bytes[..16]);
    Option::<Scalar>::from(Scalar::from_repr(repr))
}
