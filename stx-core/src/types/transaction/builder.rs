//! A request-style builder for [`StacksTransaction`].
//!
//! Fee and nonce are optional here; anything left unset is filled in by
//! whoever finalizes the request (typically a transaction manager querying
//! the node) before signing.

use crate::{
    clarity::Value,
    types::{
        transaction::{
            SpendingCondition, StacksTransaction, TokenTransferMemo, TransactionAnchorMode,
            TransactionAuth, TransactionContractCall, TransactionPayload,
            TransactionPostCondition, TransactionPostConditionMode, TransactionSmartContract,
            TransactionVersion,
        },
        ClarityName, ContractName, PrincipalData, StacksAddress,
    },
};

/// Builder for a transaction whose fee and nonce may still be undecided.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    payload: TransactionPayload,
    version: TransactionVersion,
    fee: Option<u64>,
    nonce: Option<u64>,
    anchor_mode: TransactionAnchorMode,
    post_condition_mode: TransactionPostConditionMode,
    post_conditions: Vec<TransactionPostCondition>,
}

impl TransactionBuilder {
    fn new(payload: TransactionPayload) -> Self {
        TransactionBuilder {
            payload,
            version: TransactionVersion::Mainnet,
            fee: None,
            nonce: None,
            anchor_mode: TransactionAnchorMode::Any,
            post_condition_mode: TransactionPostConditionMode::Deny,
            post_conditions: vec![],
        }
    }

    /// A STX transfer to `recipient`. The memo is padded or truncated to
    /// the fixed wire size.
    pub fn token_transfer(recipient: PrincipalData, amount: u64, memo: &str) -> Self {
        Self::new(TransactionPayload::TokenTransfer(
            recipient,
            amount,
            TokenTransferMemo::from(memo),
        ))
    }

    /// A call to a public function of a deployed contract.
    pub fn contract_call(
        address: StacksAddress,
        contract_name: ContractName,
        function_name: ClarityName,
        function_args: Vec<Value>,
    ) -> Self {
        Self::new(TransactionPayload::ContractCall(TransactionContractCall {
            address,
            contract_name,
            function_name,
            function_args,
        }))
    }

    /// A contract deployment.
    pub fn contract_deploy(name: ContractName, code_body: impl Into<String>) -> Self {
        Self::new(TransactionPayload::SmartContract(TransactionSmartContract {
            name,
            code_body: code_body.into(),
        }))
    }

    #[must_use]
    pub fn version(mut self, version: TransactionVersion) -> Self {
        self.version = version;
        self
    }

    /// Shorthand for `.version(TransactionVersion::Testnet)`.
    #[must_use]
    pub fn testnet(self) -> Self {
        self.version(TransactionVersion::Testnet)
    }

    #[must_use]
    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = Some(fee);
        self
    }

    #[must_use]
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    #[must_use]
    pub fn anchor_mode(mut self, mode: TransactionAnchorMode) -> Self {
        self.anchor_mode = mode;
        self
    }

    #[must_use]
    pub fn post_condition_mode(mut self, mode: TransactionPostConditionMode) -> Self {
        self.post_condition_mode = mode;
        self
    }

    #[must_use]
    pub fn post_condition(mut self, pc: TransactionPostCondition) -> Self {
        self.post_conditions.push(pc);
        self
    }

    pub fn get_version(&self) -> TransactionVersion {
        self.version
    }

    pub fn get_fee(&self) -> Option<u64> {
        self.fee
    }

    pub fn get_nonce(&self) -> Option<u64> {
        self.nonce
    }

    pub fn set_fee(&mut self, fee: u64) {
        self.fee = Some(fee);
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = Some(nonce);
    }

    pub fn payload(&self) -> &TransactionPayload {
        &self.payload
    }

    /// Finalizes into an unsigned transaction paid by `origin`. Unset fee
    /// and nonce default to zero.
    pub fn build(self, mut origin: SpendingCondition) -> StacksTransaction {
        origin.tx_fee = self.fee.unwrap_or(0);
        origin.nonce = self.nonce.unwrap_or(0);
        let mut tx = StacksTransaction::new(
            self.version,
            TransactionAuth::Standard(origin),
            self.payload,
        );
        tx.anchor_mode = self.anchor_mode;
        tx.post_condition_mode = self.post_condition_mode;
        tx.post_conditions = self.post_conditions;
        tx
    }

    /// Finalizes into an unsigned sponsored transaction. The fee lands on
    /// the sponsor's condition, the nonce on the origin's.
    pub fn build_sponsored(
        self,
        origin: SpendingCondition,
        mut sponsor: SpendingCondition,
    ) -> StacksTransaction {
        let mut origin = origin;
        origin.tx_fee = 0;
        origin.nonce = self.nonce.unwrap_or(0);
        sponsor.tx_fee = self.fee.unwrap_or(0);
        let mut tx = StacksTransaction::new(
            self.version,
            TransactionAuth::Sponsored(origin, sponsor),
            self.payload,
        );
        tx.anchor_mode = self.anchor_mode;
        tx.post_condition_mode = self.post_condition_mode;
        tx.post_conditions = self.post_conditions;
        tx
    }
}
