//! Stacks types, consensus serialization and cryptography.
//!
//! This crate provides the data types shared across the workspace: Clarity
//! values, c32check addresses, the transaction wire format and the
//! sighash-chained signing primitives.
//!
//! ## Encoding a Clarity value
//!
//! ```rust
//! use stx_core::{clarity::Value, codec::Codec};
//!
//! let value = Value::UInt(24124124);
//! assert_eq!(hex::encode(value.encode()), "0100000000000000000000000001701adc");
//! ```
//!
//! ## Building and signing a transaction
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use stx_core::types::transaction::{SpendingCondition, TransactionBuilder};
//! use k256::ecdsa::SigningKey;
//!
//! let key = SigningKey::random(&mut rand::thread_rng());
//! let origin = SpendingCondition::new_p2pkh(key.verifying_key(), true);
//!
//! let mut tx = TransactionBuilder::token_transfer(
//!     "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159".parse()?,
//!     1_000_000,
//!     "invoice 42",
//! )
//! .fee(180)
//! .nonce(0)
//! .build(origin);
//!
//! let sighash = tx.sign_begin();
//! tx.sign_next_origin(&sighash, &key)?;
//! tx.verify()?;
//! # Ok(())
//! # }
//! ```

/// The c32check address encoding.
pub mod c32;

/// Clarity typed values and their consensus encoding.
pub mod clarity;

/// The byte-reader and the [`Codec`](codec::Codec) trait every wire type
/// implements.
pub mod codec;

/// Addresses, names, transactions and authorization structures.
pub mod types;

/// Hashing helpers.
pub mod utils;
