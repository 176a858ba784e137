//! Post-conditions: declarative balance and ownership assertions the network
//! enforces at execution time. The client only encodes them.

use crate::{
    clarity::Value,
    codec::{Codec, DecodeError, Reader},
    types::{ClarityName, ContractName, StacksAddress},
};

const POST_CONDITION_STX: u8 = 0x00;
const POST_CONDITION_FUNGIBLE: u8 = 0x01;
const POST_CONDITION_NONFUNGIBLE: u8 = 0x02;

const PRINCIPAL_ORIGIN: u8 = 0x01;
const PRINCIPAL_STANDARD: u8 = 0x02;
const PRINCIPAL_CONTRACT: u8 = 0x03;

/// Which principal a post-condition constrains. `Origin` is shorthand for
/// the transaction's origin account, carrying no address bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostConditionPrincipal {
    Origin,
    Standard(StacksAddress),
    Contract(StacksAddress, ContractName),
}

impl Codec for PostConditionPrincipal {
    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            PostConditionPrincipal::Origin => out.push(PRINCIPAL_ORIGIN),
            PostConditionPrincipal::Standard(addr) => {
                out.push(PRINCIPAL_STANDARD);
                addr.write_to(out);
            }
            PostConditionPrincipal::Contract(addr, name) => {
                out.push(PRINCIPAL_CONTRACT);
                addr.write_to(out);
                name.write_to(out);
            }
        }
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        match r.read_u8()? {
            PRINCIPAL_ORIGIN => Ok(PostConditionPrincipal::Origin),
            PRINCIPAL_STANDARD => Ok(PostConditionPrincipal::Standard(StacksAddress::read_from(r)?)),
            PRINCIPAL_CONTRACT => Ok(PostConditionPrincipal::Contract(
                StacksAddress::read_from(r)?,
                ContractName::read_from(r)?,
            )),
            other => {
                Err(DecodeError::UnknownVariant { kind: "post-condition principal", value: other })
            }
        }
    }
}

/// Identifies an on-chain asset: the contract that defines it plus the
/// asset's Clarity name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetInfo {
    pub contract_address: StacksAddress,
    pub contract_name: ContractName,
    pub asset_name: ClarityName,
}

impl Codec for AssetInfo {
    fn write_to(&self, out: &mut Vec<u8>) {
        self.contract_address.write_to(out);
        self.contract_name.write_to(out);
        self.asset_name.write_to(out);
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(AssetInfo {
            contract_address: StacksAddress::read_from(r)?,
            contract_name: ContractName::read_from(r)?,
            asset_name: ClarityName::read_from(r)?,
        })
    }
}

/// Comparison codes for STX and fungible-token conditions.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FungibleConditionCode {
    SentEq = 0x01,
    SentGt = 0x02,
    SentGe = 0x03,
    SentLt = 0x04,
    SentLe = 0x05,
}

impl FungibleConditionCode {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(FungibleConditionCode::SentEq),
            0x02 => Some(FungibleConditionCode::SentGt),
            0x03 => Some(FungibleConditionCode::SentGe),
            0x04 => Some(FungibleConditionCode::SentLt),
            0x05 => Some(FungibleConditionCode::SentLe),
            _ => None,
        }
    }
}

/// Ownership codes for non-fungible-token conditions.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NonfungibleConditionCode {
    Sent = 0x10,
    NotSent = 0x11,
}

impl NonfungibleConditionCode {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x10 => Some(NonfungibleConditionCode::Sent),
            0x11 => Some(NonfungibleConditionCode::NotSent),
            _ => None,
        }
    }
}

/// A single post-condition. Field order on the wire follows the consensus
/// encoding: non-fungible conditions carry the asset id before the code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionPostCondition {
    Stx(PostConditionPrincipal, FungibleConditionCode, u64),
    Fungible(PostConditionPrincipal, AssetInfo, FungibleConditionCode, u64),
    Nonfungible(PostConditionPrincipal, AssetInfo, Value, NonfungibleConditionCode),
}

impl Codec for TransactionPostCondition {
    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            TransactionPostCondition::Stx(principal, code, amount) => {
                out.push(POST_CONDITION_STX);
                principal.write_to(out);
                out.push(*code as u8);
                out.extend_from_slice(&amount.to_be_bytes());
            }
            TransactionPostCondition::Fungible(principal, asset, code, amount) => {
                out.push(POST_CONDITION_FUNGIBLE);
                principal.write_to(out);
                asset.write_to(out);
                out.push(*code as u8);
                out.extend_from_slice(&amount.to_be_bytes());
            }
            TransactionPostCondition::Nonfungible(principal, asset, asset_id, code) => {
                out.push(POST_CONDITION_NONFUNGIBLE);
                principal.write_to(out);
                asset.write_to(out);
                asset_id.write_to(out);
                out.push(*code as u8);
            }
        }
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let tag = r.read_u8()?;
        match tag {
            POST_CONDITION_STX => {
                let principal = PostConditionPrincipal::read_from(r)?;
                let code_byte = r.read_u8()?;
                let code = FungibleConditionCode::from_u8(code_byte).ok_or(
                    DecodeError::UnknownVariant { kind: "fungible code", value: code_byte },
                )?;
                let amount = r.read_u64()?;
                Ok(TransactionPostCondition::Stx(principal, code, amount))
            }
            POST_CONDITION_FUNGIBLE => {
                let principal = PostConditionPrincipal::read_from(r)?;
                let asset = AssetInfo::read_from(r)?;
                let code_byte = r.read_u8()?;
                let code = FungibleConditionCode::from_u8(code_byte).ok_or(
                    DecodeError::UnknownVariant { kind: "fungible code", value: code_byte },
                )?;
                let amount = r.read_u64()?;
                Ok(TransactionPostCondition::Fungible(principal, asset, code, amount))
            }
            POST_CONDITION_NONFUNGIBLE => {
                let principal = PostConditionPrincipal::read_from(r)?;
                let asset = AssetInfo::read_from(r)?;
                let asset_id = Value::read_from(r)?;
                let code_byte = r.read_u8()?;
                let code = NonfungibleConditionCode::from_u8(code_byte).ok_or(
                    DecodeError::UnknownVariant { kind: "non-fungible code", value: code_byte },
                )?;
                Ok(TransactionPostCondition::Nonfungible(principal, asset, asset_id, code))
            }
            other => Err(DecodeError::UnknownVariant { kind: "post-condition", value: other }),
        }
    }
}
