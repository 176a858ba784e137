//! Transaction authorization: spending conditions and the sighash chain.
//!
//! Signing is linear in the number of signers. Instead of re-serializing the
//! whole transaction for every signer, each signer commits to a rolling
//! sighash: the previous hash, the auth flag and their fee/nonce go into the
//! presign hash that is actually signed, and the resulting signature plus
//! key-encoding byte are folded back into the hash the next signer (the
//! sponsor, if any) must commit to.

use crate::{
    codec::{Codec, DecodeError, Reader},
    types::{Hash160, MessageSignature, StacksAddress, Txid},
};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use thiserror::Error;

/// An error involving key material or the signature chain. Invalid keys are
/// fatal argument errors, never retryable conditions.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The underlying ECDSA operation rejected its input.
    #[error(transparent)]
    Ecdsa(#[from] k256::ecdsa::Error),
    /// A signature's leading recovery byte is out of range.
    #[error("invalid signature recovery byte {0:#04x}")]
    InvalidRecoveryId(u8),
    /// A recovered public key does not hash to the condition's signer.
    #[error("signature does not match the spending condition's signer hash")]
    SignerMismatch,
    /// Sponsor operations on a standard (non-sponsored) authorization.
    #[error("transaction authorization has no sponsor")]
    NotSponsored,
}

/// Auth flag bytes, committed to by every signature.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionAuthFlags {
    AuthStandard = 0x04,
    AuthSponsored = 0x05,
}

impl TransactionAuthFlags {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x04 => Some(TransactionAuthFlags::AuthStandard),
            0x05 => Some(TransactionAuthFlags::AuthSponsored),
            _ => None,
        }
    }
}

/// How the signer's public key is encoded when hashed and when committed to
/// in the postsign hash.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionPublicKeyEncoding {
    Compressed = 0x00,
    Uncompressed = 0x01,
}

impl TransactionPublicKeyEncoding {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(TransactionPublicKeyEncoding::Compressed),
            0x01 => Some(TransactionPublicKeyEncoding::Uncompressed),
            _ => None,
        }
    }

    pub fn is_compressed(self) -> bool {
        self == TransactionPublicKeyEncoding::Compressed
    }
}

/// Hash modes for single-signature spending conditions.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinglesigHashMode {
    P2PKH = 0x00,
    P2WPKH = 0x02,
}

impl SinglesigHashMode {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(SinglesigHashMode::P2PKH),
            0x02 => Some(SinglesigHashMode::P2WPKH),
            _ => None,
        }
    }
}

/// A single-signer spending condition: who authorizes the spend, at which
/// nonce, paying which fee, and (once signed) the signature itself.
///
/// Serialization of an unsigned and a signed condition differ only in the
/// 65-byte signature field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendingCondition {
    pub hash_mode: SinglesigHashMode,
    pub signer: Hash160,
    pub nonce: u64,
    pub tx_fee: u64,
    pub key_encoding: TransactionPublicKeyEncoding,
    pub signature: MessageSignature,
}

impl SpendingCondition {
    /// An unsigned P2PKH condition for the given public key.
    pub fn new_p2pkh(pubkey: &VerifyingKey, compressed: bool) -> Self {
        let key_encoding = if compressed {
            TransactionPublicKeyEncoding::Compressed
        } else {
            TransactionPublicKeyEncoding::Uncompressed
        };
        SpendingCondition {
            hash_mode: SinglesigHashMode::P2PKH,
            signer: Hash160::from_public_key(pubkey, compressed),
            nonce: 0,
            tx_fee: 0,
            key_encoding,
            signature: MessageSignature::empty(),
        }
    }

    /// The all-zero sentinel a sponsored origin commits to before the
    /// sponsor is known. It is intractable to produce a key for this hash.
    pub fn sentinel() -> Self {
        SpendingCondition {
            hash_mode: SinglesigHashMode::P2PKH,
            signer: Hash160::zero(),
            nonce: 0,
            tx_fee: 0,
            key_encoding: TransactionPublicKeyEncoding::Compressed,
            signature: MessageSignature::empty(),
        }
    }

    /// Resets fee, nonce and signature for the initial sighash. Fee and
    /// nonce re-enter the chain through the presign hash of each signer.
    pub fn clear(&mut self) {
        self.tx_fee = 0;
        self.nonce = 0;
        self.signature = MessageSignature::empty();
    }

    /// The account address of this condition on the given network version.
    pub fn address(&self, version: u8) -> StacksAddress {
        StacksAddress::new(version, self.signer)
    }

    /// Verifies this condition's signature against the running sighash,
    /// returning the next sighash in the chain.
    pub fn verify(
        &self,
        cur_sighash: &Txid,
        auth_flag: TransactionAuthFlags,
    ) -> Result<Txid, SigningError> {
        let (pubkey, next_sighash) = next_verification(
            cur_sighash,
            auth_flag,
            self.tx_fee,
            self.nonce,
            self.key_encoding,
            &self.signature,
        )?;
        let expected = Hash160::from_public_key(&pubkey, self.key_encoding.is_compressed());
        if expected != self.signer {
            return Err(SigningError::SignerMismatch)
        }
        Ok(next_sighash)
    }
}

impl Codec for SpendingCondition {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.hash_mode as u8);
        out.extend_from_slice(self.signer.as_bytes());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&self.tx_fee.to_be_bytes());
        out.push(self.key_encoding as u8);
        out.extend_from_slice(self.signature.as_bytes());
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let hash_mode_byte = r.read_u8()?;
        let hash_mode = SinglesigHashMode::from_u8(hash_mode_byte)
            .ok_or(DecodeError::UnknownVariant { kind: "hash mode", value: hash_mode_byte })?;
        let signer = Hash160(r.take_array()?);
        let nonce = r.read_u64()?;
        let tx_fee = r.read_u64()?;
        let key_encoding_byte = r.read_u8()?;
        let key_encoding = TransactionPublicKeyEncoding::from_u8(key_encoding_byte).ok_or(
            DecodeError::UnknownVariant { kind: "public key encoding", value: key_encoding_byte },
        )?;
        let signature = MessageSignature(r.take_array()?);
        Ok(SpendingCondition { hash_mode, signer, nonce, tx_fee, key_encoding, signature })
    }
}

/// A transaction's authorization: one standard signer, optionally sponsored
/// by a second fee-paying signer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionAuth {
    Standard(SpendingCondition),
    Sponsored(SpendingCondition, SpendingCondition),
}

impl TransactionAuth {
    pub fn origin(&self) -> &SpendingCondition {
        match self {
            TransactionAuth::Standard(origin) => origin,
            TransactionAuth::Sponsored(origin, _) => origin,
        }
    }

    pub fn origin_mut(&mut self) -> &mut SpendingCondition {
        match self {
            TransactionAuth::Standard(origin) => origin,
            TransactionAuth::Sponsored(origin, _) => origin,
        }
    }

    pub fn sponsor(&self) -> Option<&SpendingCondition> {
        match self {
            TransactionAuth::Standard(_) => None,
            TransactionAuth::Sponsored(_, sponsor) => Some(sponsor),
        }
    }

    pub fn is_sponsored(&self) -> bool {
        matches!(self, TransactionAuth::Sponsored(..))
    }

    /// The condition that pays the transaction fee: the sponsor if present,
    /// the origin otherwise.
    pub fn payer(&self) -> &SpendingCondition {
        match self {
            TransactionAuth::Standard(origin) => origin,
            TransactionAuth::Sponsored(_, sponsor) => sponsor,
        }
    }

    pub fn payer_mut(&mut self) -> &mut SpendingCondition {
        match self {
            TransactionAuth::Standard(origin) => origin,
            TransactionAuth::Sponsored(_, sponsor) => sponsor,
        }
    }

    /// Replaces the sponsor condition, e.g. once the sponsor's key is known.
    pub fn set_sponsor(&mut self, condition: SpendingCondition) -> Result<(), SigningError> {
        match self {
            TransactionAuth::Standard(_) => Err(SigningError::NotSponsored),
            TransactionAuth::Sponsored(_, sponsor) => {
                *sponsor = condition;
                Ok(())
            }
        }
    }

    /// The sentinel authorization whose txid seeds the sighash chain:
    /// the origin cleared, and any sponsor replaced by the zero sentinel.
    pub fn into_initial_sighash_auth(self) -> TransactionAuth {
        match self {
            TransactionAuth::Standard(mut origin) => {
                origin.clear();
                TransactionAuth::Standard(origin)
            }
            TransactionAuth::Sponsored(mut origin, _) => {
                origin.clear();
                TransactionAuth::Sponsored(origin, SpendingCondition::sentinel())
            }
        }
    }

    /// Verifies every signature in the chain starting from the initial
    /// sighash, returning the final sighash.
    pub fn verify(&self, initial_sighash: &Txid) -> Result<Txid, SigningError> {
        match self {
            TransactionAuth::Standard(origin) => {
                origin.verify(initial_sighash, TransactionAuthFlags::AuthStandard)
            }
            TransactionAuth::Sponsored(origin, sponsor) => {
                let next = origin.verify(initial_sighash, TransactionAuthFlags::AuthStandard)?;
                sponsor.verify(&next, TransactionAuthFlags::AuthSponsored)
            }
        }
    }

    /// Verifies only the origin's signature; the returned sighash is what a
    /// sponsor must sign next.
    pub fn verify_origin(&self, initial_sighash: &Txid) -> Result<Txid, SigningError> {
        self.origin().verify(initial_sighash, TransactionAuthFlags::AuthStandard)
    }
}

impl Codec for TransactionAuth {
    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            TransactionAuth::Standard(origin) => {
                out.push(TransactionAuthFlags::AuthStandard as u8);
                origin.write_to(out);
            }
            TransactionAuth::Sponsored(origin, sponsor) => {
                out.push(TransactionAuthFlags::AuthSponsored as u8);
                origin.write_to(out);
                sponsor.write_to(out);
            }
        }
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let flag = r.read_u8()?;
        match TransactionAuthFlags::from_u8(flag) {
            Some(TransactionAuthFlags::AuthStandard) => {
                Ok(TransactionAuth::Standard(SpendingCondition::read_from(r)?))
            }
            Some(TransactionAuthFlags::AuthSponsored) => Ok(TransactionAuth::Sponsored(
                SpendingCondition::read_from(r)?,
                SpendingCondition::read_from(r)?,
            )),
            None => Err(DecodeError::UnknownVariant { kind: "auth type", value: flag }),
        }
    }
}

/// `sha512_256(cur_sighash || auth_flag || fee_8be || nonce_8be)` — the
/// bytes a signer actually signs.
pub fn make_sighash_presign(
    cur_sighash: &Txid,
    auth_flag: TransactionAuthFlags,
    tx_fee: u64,
    nonce: u64,
) -> Txid {
    let mut preimage = Vec::with_capacity(32 + 1 + 8 + 8);
    preimage.extend_from_slice(cur_sighash.as_bytes());
    preimage.push(auth_flag as u8);
    preimage.extend_from_slice(&tx_fee.to_be_bytes());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    Txid::from_sighash_bytes(&preimage)
}

/// `sha512_256(presign || key_encoding || signature_65)` — the running
/// sighash after a signature is attached.
pub fn make_sighash_postsign(
    presign_sighash: &Txid,
    key_encoding: TransactionPublicKeyEncoding,
    signature: &MessageSignature,
) -> Txid {
    let mut preimage = Vec::with_capacity(32 + 1 + 65);
    preimage.extend_from_slice(presign_sighash.as_bytes());
    preimage.push(key_encoding as u8);
    preimage.extend_from_slice(signature.as_bytes());
    Txid::from_sighash_bytes(&preimage)
}

/// Produces the next signature in the chain with the given private key, and
/// the sighash the subsequent signer must commit to.
pub fn next_signature(
    cur_sighash: &Txid,
    auth_flag: TransactionAuthFlags,
    tx_fee: u64,
    nonce: u64,
    key_encoding: TransactionPublicKeyEncoding,
    private_key: &SigningKey,
) -> Result<(MessageSignature, Txid), SigningError> {
    let presign = make_sighash_presign(cur_sighash, auth_flag, tx_fee, nonce);

    let (signature, recovery_id) = private_key.sign_prehash_recoverable(presign.as_bytes())?;
    let mut bytes = [0u8; 65];
    bytes[0] = recovery_id.to_byte();
    bytes[1..].copy_from_slice(&signature.to_bytes());
    let signature = MessageSignature(bytes);

    let next_sighash = make_sighash_postsign(&presign, key_encoding, &signature);
    Ok((signature, next_sighash))
}

/// Recovers the public key that produced a chained signature, and computes
/// the sighash the next verifier must check against.
pub fn next_verification(
    cur_sighash: &Txid,
    auth_flag: TransactionAuthFlags,
    tx_fee: u64,
    nonce: u64,
    key_encoding: TransactionPublicKeyEncoding,
    signature: &MessageSignature,
) -> Result<(VerifyingKey, Txid), SigningError> {
    let presign = make_sighash_presign(cur_sighash, auth_flag, tx_fee, nonce);

    let recovery_id = RecoveryId::from_byte(signature.0[0])
        .ok_or(SigningError::InvalidRecoveryId(signature.0[0]))?;
    let ecdsa_sig = EcdsaSignature::from_slice(&signature.0[1..])?;
    let pubkey = VerifyingKey::recover_from_prehash(presign.as_bytes(), &ecdsa_sig, recovery_id)?;

    let next_sighash = make_sighash_postsign(&presign, key_encoding, signature);
    Ok((pubkey, next_sighash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn unsigned_condition_regression_vector() {
        let condition = SpendingCondition {
            hash_mode: SinglesigHashMode::P2PKH,
            signer: Hash160(hex!("df0ba3e79792be7be5e50a370289accfc8c9e032")),
            nonce: 300,
            tx_fee: 66_100_500,
            key_encoding: TransactionPublicKeyEncoding::Compressed,
            signature: MessageSignature::empty(),
        };

        let mut expected = String::new();
        expected.push_str("00"); // P2PKH hash mode
        expected.push_str("df0ba3e79792be7be5e50a370289accfc8c9e032");
        expected.push_str("000000000000012c"); // nonce 300
        expected.push_str("0000000003f09d14"); // fee 66100500
        expected.push_str("00"); // compressed key
        expected.push_str(&"00".repeat(65)); // placeholder signature
        assert_eq!(hex::encode(condition.encode()), expected);

        // fee and nonce each perturb the serialization deterministically
        let mut bumped = condition.clone();
        bumped.tx_fee += 1;
        assert_ne!(bumped.encode(), condition.encode());
        let mut bumped = condition.clone();
        bumped.nonce += 1;
        assert_ne!(bumped.encode(), condition.encode());

        let (decoded, used) = SpendingCondition::decode(&condition.encode()).unwrap();
        assert_eq!(used, 103);
        assert_eq!(decoded, condition);
    }

    #[test]
    fn auth_round_trip_and_rejects_unknown_bytes() {
        let origin = SpendingCondition::sentinel();
        let standard = TransactionAuth::Standard(origin.clone());
        let bytes = standard.encode();
        assert_eq!(bytes[0], 0x04);
        assert_eq!(TransactionAuth::decode(&bytes).unwrap().0, standard);

        let sponsored = TransactionAuth::Sponsored(origin, SpendingCondition::sentinel());
        let bytes = sponsored.encode();
        assert_eq!(bytes[0], 0x05);
        assert_eq!(bytes.len(), 1 + 103 * 2);
        assert_eq!(TransactionAuth::decode(&bytes).unwrap().0, sponsored);

        assert_eq!(
            TransactionAuth::decode(&[0x06]),
            Err(DecodeError::UnknownVariant { kind: "auth type", value: 0x06 })
        );
    }

    #[test]
    fn initial_sighash_auth_clears_fee_nonce_and_signature() {
        let mut origin = SpendingCondition::new_p2pkh(
            &SigningKey::from_slice(&[0x11; 32]).unwrap().verifying_key().clone(),
            true,
        );
        origin.nonce = 300;
        origin.tx_fee = 66_100_500;
        origin.signature = MessageSignature([0xaa; 65]);
        let signer = origin.signer;

        let cleared = TransactionAuth::Standard(origin).into_initial_sighash_auth();
        let cleared_origin = cleared.origin();
        assert_eq!(cleared_origin.nonce, 0);
        assert_eq!(cleared_origin.tx_fee, 0);
        assert_eq!(cleared_origin.signature, MessageSignature::empty());
        // the origin's signer hash is kept; only the sponsor sentinel zeroes it
        assert_eq!(cleared_origin.signer, signer);
    }

    #[test]
    fn signature_chain_is_deterministic_and_verifiable() {
        let key = SigningKey::from_slice(&hex!(
            "edf9aee84d9b7abc145504dde6726c64f369d37ee34ded868fabd876c26570bc"
        ))
        .unwrap();
        let cur = Txid([0x5a; 32]);

        let (sig_a, hash_a) = next_signature(
            &cur,
            TransactionAuthFlags::AuthStandard,
            66_100_500,
            300,
            TransactionPublicKeyEncoding::Compressed,
            &key,
        )
        .unwrap();
        let (sig_b, hash_b) = next_signature(
            &cur,
            TransactionAuthFlags::AuthStandard,
            66_100_500,
            300,
            TransactionPublicKeyEncoding::Compressed,
            &key,
        )
        .unwrap();
        // RFC 6979 deterministic nonces: same inputs, same signature
        assert_eq!(sig_a, sig_b);
        assert_eq!(hash_a, hash_b);

        // a different fee changes both the signature and the next sighash
        let (sig_c, hash_c) = next_signature(
            &cur,
            TransactionAuthFlags::AuthStandard,
            66_100_501,
            300,
            TransactionPublicKeyEncoding::Compressed,
            &key,
        )
        .unwrap();
        assert_ne!(sig_a, sig_c);
        assert_ne!(hash_a, hash_c);

        // verification recovers the same key and the same next sighash
        let (pubkey, verified_hash) = next_verification(
            &cur,
            TransactionAuthFlags::AuthStandard,
            66_100_500,
            300,
            TransactionPublicKeyEncoding::Compressed,
            &sig_a,
        )
        .unwrap();
        assert_eq!(&pubkey, key.verifying_key());
        assert_eq!(verified_hash, hash_a);
    }
}
