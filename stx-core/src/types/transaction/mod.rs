//! The Stacks transaction wire format and the sighash-chained signing flow.
//!
//! A transaction serializes as version, chain id, authorization, anchor
//! mode, post-condition mode, post-conditions, then payload. Every field is
//! covered by the signature chain, so mutating a signed transaction
//! invalidates it.

pub mod auth;
pub mod builder;
pub mod payload;
pub mod post_condition;

pub use auth::{
    SigningError, SinglesigHashMode, SpendingCondition, TransactionAuth, TransactionAuthFlags,
    TransactionPublicKeyEncoding,
};
pub use builder::TransactionBuilder;
pub use payload::{
    TokenTransferMemo, TransactionContractCall, TransactionPayload, TransactionSmartContract,
};
pub use post_condition::{
    AssetInfo, FungibleConditionCode, NonfungibleConditionCode, PostConditionPrincipal,
    TransactionPostCondition,
};

use k256::ecdsa::SigningKey;

use crate::{
    codec::{Codec, DecodeError, Reader},
    types::{StacksAddress, Txid},
};

pub const CHAIN_ID_MAINNET: u32 = 0x00000001;
pub const CHAIN_ID_TESTNET: u32 = 0x80000000;

/// Address versions for single-signature accounts on each network.
pub const ADDRESS_VERSION_MAINNET_SINGLESIG: u8 = 22;
pub const ADDRESS_VERSION_TESTNET_SINGLESIG: u8 = 26;

/// Which network a transaction targets. The version byte leads the wire
/// encoding and also selects the address version for derived addresses.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionVersion {
    Mainnet = 0x00,
    Testnet = 0x80,
}

impl TransactionVersion {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(TransactionVersion::Mainnet),
            0x80 => Some(TransactionVersion::Testnet),
            _ => None,
        }
    }

    pub fn chain_id(self) -> u32 {
        match self {
            TransactionVersion::Mainnet => CHAIN_ID_MAINNET,
            TransactionVersion::Testnet => CHAIN_ID_TESTNET,
        }
    }

    pub fn address_version(self) -> u8 {
        match self {
            TransactionVersion::Mainnet => ADDRESS_VERSION_MAINNET_SINGLESIG,
            TransactionVersion::Testnet => ADDRESS_VERSION_TESTNET_SINGLESIG,
        }
    }
}

/// Where a transaction may be mined relative to a burnchain block.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionAnchorMode {
    OnChainOnly = 1,
    OffChainOnly = 2,
    Any = 3,
}

impl TransactionAnchorMode {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            1 => Some(TransactionAnchorMode::OnChainOnly),
            2 => Some(TransactionAnchorMode::OffChainOnly),
            3 => Some(TransactionAnchorMode::Any),
            _ => None,
        }
    }
}

/// Whether asset transfers outside the declared post-conditions abort the
/// transaction (`Deny`) or are allowed through (`Allow`).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionPostConditionMode {
    Allow = 1,
    Deny = 2,
}

impl TransactionPostConditionMode {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            1 => Some(TransactionPostConditionMode::Allow),
            2 => Some(TransactionPostConditionMode::Deny),
            _ => None,
        }
    }
}

/// A fully-formed Stacks transaction.
///
/// Construct one with [`TransactionBuilder`], then drive the signature chain
/// with [`sign_begin`](Self::sign_begin) and
/// [`sign_next_origin`](Self::sign_next_origin) /
/// [`sign_next_sponsor`](Self::sign_next_sponsor), or hand it to a signer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StacksTransaction {
    pub version: TransactionVersion,
    pub chain_id: u32,
    pub auth: TransactionAuth,
    pub anchor_mode: TransactionAnchorMode,
    pub post_condition_mode: TransactionPostConditionMode,
    pub post_conditions: Vec<TransactionPostCondition>,
    pub payload: TransactionPayload,
}

impl StacksTransaction {
    pub fn new(
        version: TransactionVersion,
        auth: TransactionAuth,
        payload: TransactionPayload,
    ) -> StacksTransaction {
        StacksTransaction {
            version,
            chain_id: version.chain_id(),
            auth,
            anchor_mode: TransactionAnchorMode::Any,
            post_condition_mode: TransactionPostConditionMode::Deny,
            post_conditions: vec![],
            payload,
        }
    }

    /// The transaction id: `sha512_256` of the serialized bytes.
    pub fn txid(&self) -> Txid {
        Txid::from_serialized_tx(&self.encode())
    }

    /// The fee paid for this transaction, read from whichever condition
    /// actually pays it (the sponsor's, if sponsored).
    pub fn tx_fee(&self) -> u64 {
        self.auth.payer().tx_fee
    }

    pub fn set_tx_fee(&mut self, fee: u64) {
        self.auth.payer_mut().tx_fee = fee;
    }

    pub fn origin_nonce(&self) -> u64 {
        self.auth.origin().nonce
    }

    pub fn set_origin_nonce(&mut self, nonce: u64) {
        self.auth.origin_mut().nonce = nonce;
    }

    /// Sets the sponsor's nonce.
    ///
    /// Returns an error if the transaction is not sponsored.
    pub fn set_sponsor_nonce(&mut self, nonce: u64) -> Result<(), SigningError> {
        match &mut self.auth {
            TransactionAuth::Standard(_) => Err(SigningError::NotSponsored),
            TransactionAuth::Sponsored(_, sponsor) => {
                sponsor.nonce = nonce;
                Ok(())
            }
        }
    }

    pub fn origin_address(&self) -> StacksAddress {
        self.auth.origin().address(self.version.address_version())
    }

    pub fn sponsor_address(&self) -> Option<StacksAddress> {
        self.auth.sponsor().map(|s| s.address(self.version.address_version()))
    }

    /// The sighash that seeds the signature chain: the txid of this
    /// transaction with its authorization reset to the initial state.
    pub fn sign_begin(&self) -> Txid {
        let mut cleared = self.clone();
        cleared.auth = cleared.auth.into_initial_sighash_auth();
        cleared.txid()
    }

    /// Signs as the origin, advancing the chain. `cur_sighash` is the value
    /// from [`sign_begin`](Self::sign_begin).
    pub fn sign_next_origin(
        &mut self,
        cur_sighash: &Txid,
        private_key: &SigningKey,
    ) -> Result<Txid, SigningError> {
        let origin = self.auth.origin();
        let (signature, next_sighash) = auth::next_signature(
            cur_sighash,
            TransactionAuthFlags::AuthStandard,
            origin.tx_fee,
            origin.nonce,
            origin.key_encoding,
            private_key,
        )?;
        self.auth.origin_mut().signature = signature;
        Ok(next_sighash)
    }

    /// Signs as the sponsor. `cur_sighash` is the sighash returned by the
    /// origin's signature step (or by [`verify_origin`](Self::verify_origin)).
    pub fn sign_next_sponsor(
        &mut self,
        cur_sighash: &Txid,
        private_key: &SigningKey,
    ) -> Result<Txid, SigningError> {
        match &mut self.auth {
            TransactionAuth::Standard(_) => Err(SigningError::NotSponsored),
            TransactionAuth::Sponsored(_, sponsor) => {
                let (signature, next_sighash) = auth::next_signature(
                    cur_sighash,
                    TransactionAuthFlags::AuthSponsored,
                    sponsor.tx_fee,
                    sponsor.nonce,
                    sponsor.key_encoding,
                    private_key,
                )?;
                sponsor.signature = signature;
                Ok(next_sighash)
            }
        }
    }

    /// Verifies the whole signature chain against the declared signer
    /// hashes.
    pub fn verify(&self) -> Result<(), SigningError> {
        self.auth.verify(&self.sign_begin()).map(|_| ())
    }

    /// Verifies only the origin's signature, returning the sighash a
    /// sponsor must sign.
    pub fn verify_origin(&self) -> Result<Txid, SigningError> {
        self.auth.verify_origin(&self.sign_begin())
    }
}

impl Codec for StacksTransaction {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.version as u8);
        out.extend_from_slice(&self.chain_id.to_be_bytes());
        self.auth.write_to(out);
        out.push(self.anchor_mode as u8);
        out.push(self.post_condition_mode as u8);
        out.extend_from_slice(&(self.post_conditions.len() as u32).to_be_bytes());
        for pc in &self.post_conditions {
            pc.write_to(out);
        }
        self.payload.write_to(out);
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let version_byte = r.read_u8()?;
        let version = TransactionVersion::from_u8(version_byte)
            .ok_or(DecodeError::UnknownVariant { kind: "transaction version", value: version_byte })?;
        let chain_id = r.read_u32()?;
        let auth = TransactionAuth::read_from(r)?;
        let anchor_byte = r.read_u8()?;
        let anchor_mode = TransactionAnchorMode::from_u8(anchor_byte)
            .ok_or(DecodeError::UnknownVariant { kind: "anchor mode", value: anchor_byte })?;
        let pc_mode_byte = r.read_u8()?;
        let post_condition_mode = TransactionPostConditionMode::from_u8(pc_mode_byte)
            .ok_or(DecodeError::UnknownVariant { kind: "post-condition mode", value: pc_mode_byte })?;
        let count = r.read_u32()?;
        let mut post_conditions = Vec::with_capacity(count.min(64) as usize);
        for _ in 0..count {
            post_conditions.push(TransactionPostCondition::read_from(r)?);
        }
        let payload = TransactionPayload::read_from(r)?;
        Ok(StacksTransaction {
            version,
            chain_id,
            auth,
            anchor_mode,
            post_condition_mode,
            post_conditions,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrincipalData;
    use k256::ecdsa::SigningKey;
    use rand::thread_rng;

    fn transfer_tx(key: &SigningKey) -> StacksTransaction {
        let recipient: PrincipalData =
            "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159".parse().unwrap();
        let origin = SpendingCondition::new_p2pkh(key.verifying_key(), true);
        let mut tx = StacksTransaction::new(
            TransactionVersion::Mainnet,
            TransactionAuth::Standard(origin),
            TransactionPayload::TokenTransfer(recipient, 12_345, TokenTransferMemo::from("hi")),
        );
        tx.set_tx_fee(180);
        tx.set_origin_nonce(3);
        tx
    }

    #[test]
    fn serialization_round_trip() {
        let key = SigningKey::random(&mut thread_rng());
        let mut tx = transfer_tx(&key);
        tx.post_conditions.push(TransactionPostCondition::Stx(
            PostConditionPrincipal::Origin,
            FungibleConditionCode::SentLe,
            12_345,
        ));

        let bytes = tx.encode();
        assert_eq!(bytes[0], 0x00);
        assert_eq!(&bytes[1..5], &CHAIN_ID_MAINNET.to_be_bytes());
        assert_eq!(StacksTransaction::decode_exact(&bytes).unwrap(), tx);
    }

    #[test]
    fn standard_sign_and_verify() {
        let key = SigningKey::random(&mut thread_rng());
        let mut tx = transfer_tx(&key);

        let initial = tx.sign_begin();
        tx.sign_next_origin(&initial, &key).unwrap();
        tx.verify().unwrap();
    }

    #[test]
    fn signature_commits_to_fee_and_nonce() {
        let key = SigningKey::random(&mut thread_rng());
        let mut tx = transfer_tx(&key);

        let initial = tx.sign_begin();
        tx.sign_next_origin(&initial, &key).unwrap();

        tx.set_tx_fee(181);
        assert!(tx.verify().is_err());
    }

    #[test]
    fn sign_begin_is_independent_of_fee_nonce_and_signature() {
        let key = SigningKey::random(&mut thread_rng());
        let mut tx = transfer_tx(&key);
        let before = tx.sign_begin();

        tx.set_tx_fee(999_999);
        tx.set_origin_nonce(77);
        tx.sign_next_origin(&before, &key).unwrap();

        assert_eq!(tx.sign_begin(), before);
    }

    #[test]
    fn sponsored_sign_and_verify() {
        let origin_key = SigningKey::random(&mut thread_rng());
        let sponsor_key = SigningKey::random(&mut thread_rng());

        let mut tx = transfer_tx(&origin_key);
        tx.auth = TransactionAuth::Sponsored(
            SpendingCondition::new_p2pkh(origin_key.verifying_key(), true),
            SpendingCondition::new_p2pkh(sponsor_key.verifying_key(), true),
        );
        tx.set_origin_nonce(3);
        tx.set_sponsor_nonce(9).unwrap();
        tx.set_tx_fee(400);

        let initial = tx.sign_begin();
        let after_origin = tx.sign_next_origin(&initial, &origin_key).unwrap();
        assert_eq!(tx.verify_origin().unwrap(), after_origin);
        tx.sign_next_sponsor(&after_origin, &sponsor_key).unwrap();
        tx.verify().unwrap();
    }

    #[test]
    fn sponsor_operations_fail_on_standard_auth() {
        let key = SigningKey::random(&mut thread_rng());
        let mut tx = transfer_tx(&key);
        assert!(matches!(tx.set_sponsor_nonce(1), Err(SigningError::NotSponsored)));

        let initial = tx.sign_begin();
        assert!(matches!(
            tx.sign_next_sponsor(&initial, &key),
            Err(SigningError::NotSponsored)
        ));
    }

    #[test]
    fn txid_changes_with_signature() {
        let key = SigningKey::random(&mut thread_rng());
        let mut tx = transfer_tx(&key);

        let unsigned = tx.txid();
        let initial = tx.sign_begin();
        tx.sign_next_origin(&initial, &key).unwrap();
        assert_ne!(tx.txid(), unsigned);
    }
}
