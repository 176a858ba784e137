//! Provides a unified interface for locally signing Stacks transactions.
//!
//! You can implement the [`Signer`] trait to extend functionality to other
//! signers such as Hardware Security Modules, KMS etc.
//!
//! ```no_run
//! use stx_core::types::transaction::TransactionBuilder;
//! use stx_signers::{LocalWallet, Signer};
//!
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! // instantiate the wallet
//! let wallet = "dcf2cbdd171a21c480aa7f53d77f31bb102282b3ff099c78e3118b37348c72f7"
//!     .parse::<LocalWallet>()?;
//!
//! // build a transfer paid by the wallet
//! let tx = TransactionBuilder::token_transfer(
//!     "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159".parse()?,
//!     10_000,
//!     "",
//! )
//! .fee(180)
//! .nonce(0)
//! .build(wallet.spending_condition());
//!
//! // sign it
//! let signed = wallet.sign_transaction(&tx).await?;
//! signed.verify()?;
//! # Ok(())
//! # }
//! ```

mod wallet;
pub use wallet::{Wallet, WalletError};

/// A wallet instantiated with a locally stored private key
pub type LocalWallet = Wallet;

use async_trait::async_trait;
use std::error::Error;
use stx_core::types::{
    transaction::{SpendingCondition, StacksTransaction},
    StacksAddress,
};

/// Trait for signing transactions. Implemented by [`Wallet`], and intended
/// to be implemented by remote signers that roundtrip over the network.
#[async_trait]
pub trait Signer: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    /// Signs the transaction as its origin, returning the signed copy.
    async fn sign_transaction(
        &self,
        tx: &StacksTransaction,
    ) -> Result<StacksTransaction, Self::Error>;

    /// The signer's address on its configured network.
    fn address(&self) -> StacksAddress;

    /// An unsigned spending condition committing to this signer's key, for
    /// use when building transactions this signer will pay for.
    fn spending_condition(&self) -> SpendingCondition;
}
