//! stx-rs
//!
//! A complete Stacks transaction library: Clarity value codecs, c32check
//! addresses, consensus transaction serialization, local wallets and an
//! async transaction lifecycle manager.
//!
//! Each concern lives in its own crate and is re-exported here:
//! - [`core`]: types, codecs and signing primitives
//! - [`signers`]: the [`Signer`](signers::Signer) trait and [`LocalWallet`](signers::LocalWallet)
//! - [`providers`]: the [`NodeClient`](providers::NodeClient) trait and
//!   [`TransactionManager`](providers::TransactionManager)

pub use stx_core as core;
pub use stx_providers as providers;
pub use stx_signers as signers;

/// Easy imports of the frequently used types and traits.
pub mod prelude {
    pub use stx_core::{
        c32,
        clarity::Value,
        codec::Codec,
        types::{
            transaction::{
                SpendingCondition, StacksTransaction, TransactionBuilder, TransactionVersion,
            },
            ClarityName, ContractName, PrincipalData, StacksAddress, Txid,
        },
    };
    pub use stx_providers::{NodeClient, NodeEvent, TransactionManager, TransactionStatus};
    pub use stx_signers::{LocalWallet, Signer, Wallet};
}
