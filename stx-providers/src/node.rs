//! The node RPC abstraction: the handful of endpoints the transaction
//! lifecycle needs, plus the status and rejection vocabulary they speak.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stx_core::{
    clarity::Value,
    codec::DecodeError,
    types::{transaction::StacksTransaction, StacksAddress, Txid},
};
use thiserror::Error;

/// The lifecycle status a node reports for a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// In the mempool, not yet mined.
    Pending,
    /// Mined and executed successfully.
    Success,
    /// Mined, but the contract call returned an error.
    AbortByResponse,
    /// Mined, but a post-condition aborted it.
    AbortByPostCondition,
    /// Evicted from the mempool by a higher-fee replacement.
    #[serde(rename = "dropped_replace_by_fee")]
    DroppedReplaceByFee,
    /// Evicted because a conflicting transaction was mined on another fork.
    #[serde(rename = "dropped_replace_across_fork")]
    DroppedReplaceAcrossFork,
    /// Evicted because its fee fell below the mempool minimum.
    DroppedTooExpensive,
    /// Evicted after sitting unmined past the garbage-collection horizon.
    #[serde(rename = "dropped_stale_garbage_collect")]
    DroppedStaleGarbageCollect,
}

impl TransactionStatus {
    /// Whether the status can still change. Only pending transactions can.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    /// Whether the transaction left the mempool without being mined.
    pub fn is_dropped(self) -> bool {
        matches!(
            self,
            TransactionStatus::DroppedReplaceByFee
                | TransactionStatus::DroppedReplaceAcrossFork
                | TransactionStatus::DroppedTooExpensive
                | TransactionStatus::DroppedStaleGarbageCollect
        )
    }
}

/// A point-in-time view of a transaction as reported by the node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub txid: Txid,
    pub status: TransactionStatus,
    /// Whether the transaction is in an anchored (burnchain-confirmed)
    /// block rather than a microblock.
    #[serde(default)]
    pub anchored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<StacksAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u64>,
}

/// Why a node refused to admit a transaction to its mempool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    Serialization,
    Deserialization,
    SignatureValidation,
    BadNonce,
    FeeTooLow,
    NotEnoughFunds,
    NoSuchContract,
    NoSuchPublicFunction,
    BadFunctionArgument,
    ContractAlreadyExists,
    /// Another transaction with the same sender and nonce is already in
    /// the mempool with an equal or higher fee.
    ConflictingNonceInMempool,
    TooMuchChaining,
    ServerFailure,
}

#[derive(Debug, Error)]
pub enum NodeError {
    /// Transport-level failure talking to the node.
    #[error("network error: {0}")]
    Network(String),
    /// The node refused the transaction at broadcast.
    #[error("transaction rejected: {reason:?}: {message}")]
    Rejected { reason: RejectionReason, message: String },
    /// The node has never seen this transaction.
    #[error("transaction not found: {0}")]
    NotFound(Txid),
    /// The node's response could not be decoded.
    #[error("bad response from node: {0}")]
    BadResponse(String),
}

impl NodeError {
    /// Whether this is the mempool nonce-conflict rejection, the one
    /// failure the lifecycle manager retries with a bumped nonce.
    pub fn is_nonce_conflict(&self) -> bool {
        matches!(
            self,
            NodeError::Rejected { reason: RejectionReason::ConflictingNonceInMempool, .. }
        )
    }
}

impl From<DecodeError> for NodeError {
    fn from(e: DecodeError) -> Self {
        NodeError::BadResponse(e.to_string())
    }
}

/// The node endpoints the transaction lifecycle depends on. Implemented
/// over HTTP in production and by in-memory mocks in tests.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// The next unused nonce for an account, as the node sees it.
    async fn next_nonce(&self, address: &StacksAddress) -> Result<u64, NodeError>;

    /// A fee estimate in micro-STX for a transaction of `tx_len` serialized
    /// bytes.
    async fn estimate_fee(&self, tx_len: u64) -> Result<u64, NodeError>;

    /// Submits a signed transaction to the mempool.
    async fn broadcast(&self, tx: &StacksTransaction) -> Result<Txid, NodeError>;

    /// Fetches the current status of a transaction.
    async fn transaction(&self, txid: &Txid) -> Result<TransactionUpdate, NodeError>;

    /// Calls a read-only contract function, returning the hex-encoded
    /// Clarity result.
    async fn call_read_only(
        &self,
        contract: &StacksAddress,
        contract_name: &str,
        function_name: &str,
        sender: &StacksAddress,
        args: &[Value],
    ) -> Result<String, NodeError>;
}

/// Decodes the hex string a read-only call returns into a Clarity value.
pub fn decode_read_only_result(hex_result: &str) -> Result<Value, NodeError> {
    Value::from_hex(hex_result).map_err(NodeError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_match_the_node_api() {
        let json = serde_json::to_string(&TransactionStatus::DroppedReplaceByFee).unwrap();
        assert_eq!(json, "\"dropped_replace_by_fee\"");
        let status: TransactionStatus =
            serde_json::from_str("\"dropped_stale_garbage_collect\"").unwrap();
        assert_eq!(status, TransactionStatus::DroppedStaleGarbageCollect);
        assert_eq!(
            serde_json::to_string(&TransactionStatus::AbortByResponse).unwrap(),
            "\"abort_by_response\""
        );
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Success.is_terminal());
        assert!(TransactionStatus::DroppedReplaceAcrossFork.is_terminal());
        assert!(TransactionStatus::DroppedReplaceAcrossFork.is_dropped());
        assert!(!TransactionStatus::Success.is_dropped());
    }

    #[test]
    fn nonce_conflict_detection() {
        let conflict = NodeError::Rejected {
            reason: RejectionReason::ConflictingNonceInMempool,
            message: "ConflictingNonceInMempool".into(),
        };
        assert!(conflict.is_nonce_conflict());
        let other = NodeError::Rejected {
            reason: RejectionReason::FeeTooLow,
            message: "fee too low".into(),
        };
        assert!(!other.is_nonce_conflict());
    }

    #[test]
    fn decodes_read_only_results() {
        let value = decode_read_only_result("0x0100000000000000000000000001701adc").unwrap();
        assert_eq!(value, Value::UInt(24124124));
        assert!(decode_read_only_result("0x01").is_err());
    }
}
