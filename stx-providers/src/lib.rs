//! Clients for driving transactions through a Stacks node.
//!
//! The [`NodeClient`] trait abstracts over the node endpoints the
//! lifecycle needs; the [`TransactionManager`] drives a transaction from
//! a [`TransactionBuilder`](stx_core::types::transaction::TransactionBuilder)
//! to a terminal status: it fills in fee and nonce, signs with its
//! [`Signer`](stx_signers::Signer), broadcasts with bounded retry on
//! mempool nonce conflicts, and tracks statuses as blocks and drop
//! events arrive.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use stx_core::types::transaction::TransactionBuilder;
//! # use stx_providers::TransactionManager;
//! # use stx_signers::LocalWallet;
//! # async fn foo<N: stx_providers::NodeClient>(node: Arc<N>) -> Result<(), Box<dyn std::error::Error>> {
//! let wallet = LocalWallet::new(&mut rand::thread_rng());
//! let manager = TransactionManager::new(node, wallet);
//!
//! let info = manager
//!     .run(TransactionBuilder::token_transfer(
//!         "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159".parse()?,
//!         1_000_000,
//!         "",
//!     ))
//!     .await?;
//! println!("broadcast as {} with nonce {}", info.txid, info.nonce);
//! # Ok(())
//! # }
//! ```

mod events;
mod manager;
mod node;

pub use events::NodeEvent;
pub use manager::{
    SubmitError, TransactionInfo, TransactionManager, DEFAULT_TX_FEE, MAX_NONCE_BUMPS,
};
pub use node::{
    decode_read_only_result, NodeClient, NodeError, RejectionReason, TransactionStatus,
    TransactionUpdate,
};
