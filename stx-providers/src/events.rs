use stx_core::types::{StacksAddress, Txid};

use crate::node::{TransactionStatus, TransactionUpdate};

/// Push notifications from a node, typically sourced from its event
/// stream. The manager consumes these to keep tracked statuses fresh
/// without polling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeEvent {
    /// A fresh status report for a single transaction, applied as-is.
    TransactionUpdated(TransactionUpdate),
    /// A new anchored block was processed containing these transactions.
    BlockAnchored { transactions: Vec<Txid> },
    /// A microblock was streamed containing these transactions. Inclusion
    /// here precedes anchoring, so a tracked transaction moves to
    /// `Success` while still reporting `anchored == false`.
    MicroblockProcessed { transactions: Vec<Txid> },
    /// An address was touched by a transaction, e.g. as sender or
    /// recipient of a transfer.
    AddressActivity { address: StacksAddress, txid: Txid },
    /// The mempool evicted a transaction without mining it.
    TransactionDropped { txid: Txid, status: TransactionStatus },
}
