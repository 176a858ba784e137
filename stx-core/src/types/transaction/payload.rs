//! Transaction payloads: what a transaction actually does.

use crate::{
    clarity::Value,
    codec::{Codec, DecodeError, Reader},
    types::{ClarityName, ContractName, PrincipalData, StacksAddress},
};
use std::fmt;

const PAYLOAD_TOKEN_TRANSFER: u8 = 0x00;
const PAYLOAD_SMART_CONTRACT: u8 = 0x01;
const PAYLOAD_CONTRACT_CALL: u8 = 0x02;

/// The memo attached to a token transfer. Always exactly 34 bytes on the
/// wire: shorter input is zero-padded, longer input is truncated.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TokenTransferMemo(pub [u8; 34]);

impl TokenTransferMemo {
    pub fn empty() -> Self {
        TokenTransferMemo([0u8; 34])
    }
}

impl From<&str> for TokenTransferMemo {
    fn from(s: &str) -> Self {
        let mut memo = [0u8; 34];
        let bytes = s.as_bytes();
        let len = bytes.len().min(34);
        memo[..len].copy_from_slice(&bytes[..len]);
        TokenTransferMemo(memo)
    }
}

impl fmt::Debug for TokenTransferMemo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenTransferMemo({})", hex::encode(self.0))
    }
}

impl Codec for TokenTransferMemo {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(TokenTransferMemo(r.take_array()?))
    }
}

/// A contract deployment: the contract's name and its Clarity source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionSmartContract {
    pub name: ContractName,
    pub code_body: String,
}

impl Codec for TransactionSmartContract {
    fn write_to(&self, out: &mut Vec<u8>) {
        self.name.write_to(out);
        out.extend_from_slice(&(self.code_body.len() as u32).to_be_bytes());
        out.extend_from_slice(self.code_body.as_bytes());
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let name = ContractName::read_from(r)?;
        let len = r.read_u32()? as usize;
        let body = std::str::from_utf8(r.take(len)?)
            .map_err(|_| DecodeError::InvalidString("contract source is not UTF-8"))?;
        Ok(TransactionSmartContract { name, code_body: body.to_string() })
    }
}

/// A public function call on a deployed contract, with its ordered Clarity
/// arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionContractCall {
    pub address: StacksAddress,
    pub contract_name: ContractName,
    pub function_name: ClarityName,
    pub function_args: Vec<Value>,
}

impl Codec for TransactionContractCall {
    fn write_to(&self, out: &mut Vec<u8>) {
        self.address.write_to(out);
        self.contract_name.write_to(out);
        self.function_name.write_to(out);
        out.extend_from_slice(&(self.function_args.len() as u32).to_be_bytes());
        for arg in &self.function_args {
            arg.write_to(out);
        }
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let address = StacksAddress::read_from(r)?;
        let contract_name = ContractName::read_from(r)?;
        let function_name = ClarityName::read_from(r)?;
        let count = r.read_u32()? as usize;
        let mut function_args = Vec::with_capacity(count.min(r.remaining()));
        for _ in 0..count {
            function_args.push(Value::read_from(r)?);
        }
        Ok(TransactionContractCall { address, contract_name, function_name, function_args })
    }
}

/// The three payload kinds a client can build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionPayload {
    /// Send `amount` micro-STX to a principal, with a fixed-size memo.
    TokenTransfer(PrincipalData, u64, TokenTransferMemo),
    /// Deploy a new contract.
    SmartContract(TransactionSmartContract),
    /// Call a public function on a deployed contract.
    ContractCall(TransactionContractCall),
}

impl Codec for TransactionPayload {
    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            TransactionPayload::TokenTransfer(recipient, amount, memo) => {
                out.push(PAYLOAD_TOKEN_TRANSFER);
                recipient.write_to(out);
                out.extend_from_slice(&amount.to_be_bytes());
                memo.write_to(out);
            }
            TransactionPayload::SmartContract(contract) => {
                out.push(PAYLOAD_SMART_CONTRACT);
                contract.write_to(out);
            }
            TransactionPayload::ContractCall(call) => {
                out.push(PAYLOAD_CONTRACT_CALL);
                call.write_to(out);
            }
        }
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let tag = r.read_u8()?;
        match tag {
            PAYLOAD_TOKEN_TRANSFER => {
                let recipient = PrincipalData::read_from(r)?;
                let amount = r.read_u64()?;
                let memo = TokenTransferMemo::read_from(r)?;
                Ok(TransactionPayload::TokenTransfer(recipient, amount, memo))
            }
            PAYLOAD_SMART_CONTRACT => {
                Ok(TransactionPayload::SmartContract(TransactionSmartContract::read_from(r)?))
            }
            PAYLOAD_CONTRACT_CALL => {
                Ok(TransactionPayload::ContractCall(TransactionContractCall::read_from(r)?))
            }
            other => Err(DecodeError::UnknownVariant { kind: "payload", value: other }),
        }
    }
}
