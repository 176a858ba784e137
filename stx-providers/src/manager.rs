//! The transaction lifecycle manager: fee and nonce assignment, broadcast
//! with bounded nonce-conflict retry, and status tracking.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use stx_core::{
    codec::Codec,
    types::{
        transaction::{StacksTransaction, TransactionBuilder},
        Txid,
    },
};
use stx_signers::Signer;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    events::NodeEvent,
    node::{NodeClient, NodeError, TransactionStatus},
};

/// Fee in micro-STX used when the node's fee estimator is unavailable.
pub const DEFAULT_TX_FEE: u64 = 3_000;

/// How many times a nonce-conflict rejection is retried with an
/// incremented nonce before giving up.
pub const MAX_NONCE_BUMPS: u32 = 3;

#[derive(Debug, Error)]
pub enum SubmitError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error("signer error: {0}")]
    Signer(#[source] E),
    /// The exact signed transaction is already tracked; re-broadcasting it
    /// would be a no-op at best.
    #[error("transaction {0} was already broadcast")]
    AlreadyBroadcast(Txid),
    #[error("gave up after {0} nonce bumps")]
    NonceRetriesExhausted(u32),
    #[error("transaction {0} is not tracked by this manager")]
    NotTracked(Txid),
    #[error("transaction {0} is no longer pending")]
    NotPending(Txid),
}

/// A tracked transaction's public view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInfo {
    pub txid: Txid,
    pub status: TransactionStatus,
    pub anchored: bool,
    pub nonce: u64,
    pub fee: u64,
}

struct TrackedTransaction {
    tx: StacksTransaction,
    status: TransactionStatus,
    anchored: bool,
}

impl TrackedTransaction {
    fn info(&self, txid: Txid) -> TransactionInfo {
        TransactionInfo {
            txid,
            status: self.status,
            anchored: self.anchored,
            nonce: self.tx.origin_nonce(),
            fee: self.tx.tx_fee(),
        }
    }
}

/// The highest nonce this manager has successfully broadcast. Guarded by
/// the submission gate so concurrent submissions see each other's nonces.
#[derive(Default)]
struct Watermark {
    last_successful_nonce: Option<u64>,
}

/// Drives transactions from intent to terminal status against a single
/// node, on behalf of a single signing account.
///
/// Submissions are serialized through an async gate so that two concurrent
/// [`run`](Self::run) calls never race each other to the same nonce.
pub struct TransactionManager<N, S> {
    node: Arc<N>,
    signer: S,
    gate: tokio::sync::Mutex<Watermark>,
    tracked: Mutex<HashMap<Txid, TrackedTransaction>>,
}

impl<N, S> TransactionManager<N, S>
where
    N: NodeClient,
    S: Signer,
{
    pub fn new(node: Arc<N>, signer: S) -> Self {
        TransactionManager {
            node,
            signer,
            gate: tokio::sync::Mutex::new(Watermark::default()),
            tracked: Mutex::new(HashMap::new()),
        }
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Finalizes, signs and broadcasts a transaction.
    ///
    /// A missing fee is filled from the node's estimator, with
    /// [`DEFAULT_TX_FEE`] standing in for a zero or unavailable estimate;
    /// a missing nonce comes from the node's account view,
    /// raised to the manager's own watermark if the node lags behind. A
    /// `ConflictingNonceInMempool` rejection bumps the nonce and retries,
    /// at most [`MAX_NONCE_BUMPS`] times. Any other rejection aborts.
    pub async fn run(
        &self,
        builder: TransactionBuilder,
    ) -> Result<TransactionInfo, SubmitError<S::Error>> {
        let mut gate = self.gate.lock().await;

        let mut nonce = match builder.get_nonce() {
            Some(n) => n,
            None => self.node.next_nonce(&self.signer.address()).await?,
        };
        if let Some(watermark) = gate.last_successful_nonce {
            if nonce < watermark {
                debug!(nonce, watermark, "raising stale nonce to watermark");
                nonce = watermark;
            }
        }

        let fee = match builder.get_fee() {
            Some(f) => f,
            None => {
                let draft = builder
                    .clone()
                    .nonce(nonce)
                    .build(self.signer.spending_condition());
                match self.node.estimate_fee(draft.encode().len() as u64).await {
                    // a zero estimate would be rejected at broadcast
                    Ok(0) => {
                        warn!(fallback = DEFAULT_TX_FEE, "node estimated a zero fee");
                        DEFAULT_TX_FEE
                    }
                    Ok(f) => f,
                    Err(e) => {
                        warn!(error = %e, fallback = DEFAULT_TX_FEE, "fee estimation failed");
                        DEFAULT_TX_FEE
                    }
                }
            }
        };

        let mut bumps = 0u32;
        loop {
            let mut attempt = builder.clone();
            attempt.set_fee(fee);
            attempt.set_nonce(nonce);
            let unsigned = attempt.build(self.signer.spending_condition());
            let signed = self
                .signer
                .sign_transaction(&unsigned)
                .await
                .map_err(SubmitError::Signer)?;
            let txid = signed.txid();

            if self.tracked().contains_key(&txid) {
                return Err(SubmitError::AlreadyBroadcast(txid));
            }

            match self.node.broadcast(&signed).await {
                Ok(_) => {
                    debug!(%txid, nonce, fee, "transaction broadcast");
                    gate.last_successful_nonce = Some(nonce);
                    let entry = TrackedTransaction {
                        tx: signed,
                        status: TransactionStatus::Pending,
                        anchored: false,
                    };
                    let info = entry.info(txid);
                    self.tracked().insert(txid, entry);
                    return Ok(info);
                }
                Err(e) if e.is_nonce_conflict() => {
                    if bumps == MAX_NONCE_BUMPS {
                        warn!(nonce, bumps, "nonce conflict retries exhausted");
                        return Err(SubmitError::NonceRetriesExhausted(bumps));
                    }
                    bumps += 1;
                    nonce += 1;
                    debug!(nonce, bumps, "nonce conflict in mempool, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Replaces a still-pending transaction with a copy carrying a new fee
    /// and the same nonce, re-signed and re-broadcast.
    pub async fn resend(
        &self,
        txid: &Txid,
        fee: u64,
    ) -> Result<TransactionInfo, SubmitError<S::Error>> {
        let _gate = self.gate.lock().await;

        let mut replacement = {
            let tracked = self.tracked();
            let entry = tracked.get(txid).ok_or(SubmitError::NotTracked(*txid))?;
            if entry.status != TransactionStatus::Pending {
                return Err(SubmitError::NotPending(*txid));
            }
            entry.tx.clone()
        };

        replacement.set_tx_fee(fee);
        let signed = self
            .signer
            .sign_transaction(&replacement)
            .await
            .map_err(SubmitError::Signer)?;
        let new_txid = signed.txid();
        self.node.broadcast(&signed).await?;
        debug!(old = %txid, new = %new_txid, fee, "replaced transaction by fee");

        let mut tracked = self.tracked();
        if let Some(old) = tracked.get_mut(txid) {
            old.status = TransactionStatus::DroppedReplaceByFee;
        }
        let entry = TrackedTransaction {
            tx: signed,
            status: TransactionStatus::Pending,
            anchored: false,
        };
        let info = entry.info(new_txid);
        tracked.insert(new_txid, entry);
        Ok(info)
    }

    /// The last known status of a tracked transaction.
    pub fn status(&self, txid: &Txid) -> Option<TransactionStatus> {
        self.tracked().get(txid).map(|t| t.status)
    }

    pub fn info(&self, txid: &Txid) -> Option<TransactionInfo> {
        self.tracked().get(txid).map(|t| t.info(*txid))
    }

    /// All transactions this manager is tracking.
    pub fn tracked_transactions(&self) -> Vec<TransactionInfo> {
        self.tracked().iter().map(|(txid, t)| t.info(*txid)).collect()
    }

    /// Re-queries the node for one tracked transaction and stores the
    /// fresh status.
    pub async fn refresh(&self, txid: &Txid) -> Result<TransactionInfo, SubmitError<S::Error>> {
        if !self.tracked().contains_key(txid) {
            return Err(SubmitError::NotTracked(*txid));
        }
        let update = self.node.transaction(txid).await?;
        let mut tracked = self.tracked();
        let entry = tracked.get_mut(txid).ok_or(SubmitError::NotTracked(*txid))?;
        entry.status = update.status;
        entry.anchored = update.anchored;
        Ok(entry.info(*txid))
    }

    /// Refreshes every non-terminal tracked transaction.
    pub async fn refresh_all(&self) -> Result<(), SubmitError<S::Error>> {
        let pending: Vec<Txid> = self
            .tracked()
            .iter()
            .filter(|(_, t)| !t.status.is_terminal())
            .map(|(txid, _)| *txid)
            .collect();
        for txid in pending {
            self.refresh(&txid).await?;
        }
        Ok(())
    }

    /// Applies one node event to the tracked set. Events naming unknown
    /// transactions are ignored.
    pub async fn handle_event(&self, event: NodeEvent) {
        match event {
            NodeEvent::TransactionUpdated(update) => {
                let mut tracked = self.tracked();
                if let Some(entry) = tracked.get_mut(&update.txid) {
                    debug!(txid = %update.txid, status = ?update.status, "transaction update");
                    entry.status = update.status;
                    entry.anchored = update.anchored;
                }
            }
            NodeEvent::BlockAnchored { transactions }
            | NodeEvent::MicroblockProcessed { transactions } => {
                self.refresh_mined(transactions).await;
            }
            NodeEvent::AddressActivity { address: _, txid } => {
                self.refresh_mined(vec![txid]).await;
            }
            NodeEvent::TransactionDropped { txid, status } => {
                let mut tracked = self.tracked();
                if let Some(entry) = tracked.get_mut(&txid) {
                    if entry.status == TransactionStatus::Pending {
                        debug!(%txid, ?status, "transaction dropped from mempool");
                        entry.status = status;
                    }
                }
            }
        }
    }

    /// Refreshes the tracked members of a mined transaction set.
    async fn refresh_mined(&self, transactions: Vec<Txid>) {
        let ours: Vec<Txid> = transactions
            .into_iter()
            .filter(|txid| self.tracked().contains_key(txid))
            .collect();
        for txid in ours {
            if let Err(e) = self.refresh(&txid).await {
                warn!(%txid, error = %e, "failed to refresh mined transaction");
            }
        }
    }

    /// Consumes events from a channel until the sender hangs up.
    pub async fn watch(&self, mut events: mpsc::Receiver<NodeEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
    }

    /// Drops tracked transactions that can no longer change: anchored
    /// terminal outcomes and mempool drops.
    pub fn prune(&self) {
        self.tracked()
            .retain(|_, t| !(t.status.is_terminal() && (t.anchored || t.status.is_dropped())));
    }

    fn tracked(&self) -> MutexGuard<'_, HashMap<Txid, TrackedTransaction>> {
        match self.tracked.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
