use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use std::{fmt, str::FromStr};
use stx_core::types::{
    transaction::{SigningError, SpendingCondition, StacksTransaction, TransactionVersion},
    StacksAddress, Txid,
};
use thiserror::Error;

/// A Stacks private-public key pair which can be used for signing
/// transactions.
///
/// # Examples
///
/// ```
/// use stx_signers::{LocalWallet, Signer};
///
/// let wallet = LocalWallet::new(&mut rand::thread_rng());
/// let testnet_wallet = LocalWallet::new(&mut rand::thread_rng()).with_testnet();
/// assert_ne!(wallet.address().version, testnet_wallet.address().version);
/// ```
#[derive(Clone)]
pub struct Wallet {
    /// The wallet's private key
    pub(crate) signer: SigningKey,
    /// Whether signatures commit to the compressed public key encoding
    pub(crate) compressed: bool,
    /// The network this wallet derives addresses for
    pub(crate) version: TransactionVersion,
}

#[derive(Debug, Error)]
pub enum WalletError {
    /// The private key string was not valid hex.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    /// The private key was neither 32 bytes nor 33 bytes with a
    /// compression marker.
    #[error("invalid private key length: {0} bytes")]
    InvalidKeyLength(usize),
    #[error(transparent)]
    Ecdsa(#[from] k256::ecdsa::Error),
    #[error(transparent)]
    Signing(#[from] SigningError),
}

impl Wallet {
    /// Creates a new random mainnet wallet.
    pub fn new<R: rand::CryptoRng + rand::RngCore>(rng: &mut R) -> Self {
        Wallet {
            signer: SigningKey::random(rng),
            compressed: true,
            version: TransactionVersion::Mainnet,
        }
    }

    /// Switches the wallet to testnet, changing the addresses it derives.
    #[must_use]
    pub fn with_testnet(mut self) -> Self {
        self.version = TransactionVersion::Testnet;
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: TransactionVersion) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> TransactionVersion {
        self.version
    }

    /// Signs the transaction in place as its origin and returns the
    /// sighash a sponsor would sign next.
    pub fn sign(&self, tx: &mut StacksTransaction) -> Result<Txid, WalletError> {
        let initial = tx.sign_begin();
        Ok(tx.sign_next_origin(&initial, &self.signer)?)
    }

    /// Sponsors a transaction already signed by its origin: verifies the
    /// origin's signature, then appends this wallet's.
    pub fn sponsor(&self, tx: &mut StacksTransaction) -> Result<(), WalletError> {
        let origin_sighash = tx.verify_origin()?;
        tx.sign_next_sponsor(&origin_sighash, &self.signer)?;
        Ok(())
    }
}

#[async_trait]
impl crate::Signer for Wallet {
    type Error = WalletError;

    async fn sign_transaction(
        &self,
        tx: &StacksTransaction,
    ) -> Result<StacksTransaction, Self::Error> {
        let mut tx = tx.clone();
        self.sign(&mut tx)?;
        Ok(tx)
    }

    fn address(&self) -> StacksAddress {
        self.spending_condition().address(self.version.address_version())
    }

    fn spending_condition(&self) -> SpendingCondition {
        SpendingCondition::new_p2pkh(self.signer.verifying_key(), self.compressed)
    }
}

impl From<SigningKey> for Wallet {
    fn from(signer: SigningKey) -> Self {
        Wallet { signer, compressed: true, version: TransactionVersion::Mainnet }
    }
}

impl FromStr for Wallet {
    type Err = WalletError;

    /// Parses a hex private key. A 33-byte key whose trailing byte is
    /// `0x01` marks the compressed public key encoding; a bare 32-byte key
    /// defaults to compressed as well.
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let src = src.strip_prefix("0x").unwrap_or(src);
        let bytes = hex::decode(src)?;
        let key_bytes = match bytes.len() {
            32 => &bytes[..],
            33 if bytes[32] == 0x01 => &bytes[..32],
            n => return Err(WalletError::InvalidKeyLength(n)),
        };
        Ok(Wallet {
            signer: SigningKey::from_slice(key_bytes)?,
            compressed: true,
            version: TransactionVersion::Mainnet,
        })
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &crate::Signer::address(self))
            .field("version", &self.version)
            .finish()
    }
}
