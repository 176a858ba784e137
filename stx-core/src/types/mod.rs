//! Stacks protocol types shared by the codecs, the transaction model and the
//! higher-level crates.

pub mod transaction;

use crate::{
    c32,
    codec::{Codec, DecodeError, Reader},
    utils::{hash160, sha512_256},
};
use k256::ecdsa::VerifyingKey;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// An error involving the textual form of an address or principal.
///
/// Most address failures are signalled as `None` by the [`c32`] module, since
/// malformed addresses are expected input; this error only exists for the
/// `FromStr` boundary where a `Result` is the idiomatic shape.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The c32check string failed to parse or verify.
    #[error("malformed or mis-checksummed c32 address")]
    InvalidC32,
    /// The contract-name part of a principal failed validation.
    #[error("invalid contract name in principal")]
    InvalidContractName,
}

/// A RIPEMD160-over-SHA256 public key hash; the body of an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Hash160(pub [u8; 20]);

impl Hash160 {
    /// The all-zero hash, used for the not-yet-keyed sponsor sentinel.
    pub fn zero() -> Self {
        Hash160([0u8; 20])
    }

    /// Hashes a public key in its chosen SEC1 encoding.
    pub fn from_public_key(key: &VerifyingKey, compressed: bool) -> Self {
        let point = key.to_encoded_point(compressed);
        Hash160(hash160(point.as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A transaction id: the SHA-512/256 digest of the serialized transaction.
/// Also the type of the running sighash in the signing chain, which is
/// seeded from a txid and evolved with the same digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    /// The txid of a fully serialized transaction.
    pub fn from_serialized_tx(tx_bytes: &[u8]) -> Self {
        Txid(sha512_256(tx_bytes))
    }

    /// Digest an intermediate sighash preimage.
    pub fn from_sighash_bytes(bytes: &[u8]) -> Self {
        Txid(sha512_256(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Txid {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| DecodeError::InvalidHex)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| DecodeError::InvalidHex)?;
        Ok(Txid(bytes))
    }
}

impl Serialize for Txid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Txid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A 65-byte recoverable ECDSA signature: `recovery_id || r || s`.
/// All zeroes until the spending condition is actually signed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MessageSignature(pub [u8; 65]);

impl MessageSignature {
    /// The zero-filled pre-sign placeholder.
    pub fn empty() -> Self {
        MessageSignature([0u8; 65])
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }
}

impl fmt::Debug for MessageSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageSignature({})", hex::encode(self.0))
    }
}

impl fmt::Display for MessageSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

const CONTRACT_NAME_MAX_LEN: usize = 40;
const CLARITY_NAME_MAX_LEN: usize = 128;

fn valid_contract_name(name: &str) -> bool {
    if name.is_empty() || name.len() > CONTRACT_NAME_MAX_LEN {
        return false
    }
    let mut chars = name.chars();
    let leading_ok = chars.next().map_or(false, |c| c.is_ascii_alphabetic());
    leading_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn valid_clarity_name(name: &str) -> bool {
    if name.is_empty() || name.len() > CLARITY_NAME_MAX_LEN {
        return false
    }
    // operator-style names are legal Clarity identifiers
    if matches!(name, "+" | "-" | "*" | "/" | "=" | "<" | ">" | "<=" | ">=") {
        return true
    }
    let mut chars = name.chars();
    let leading_ok = chars.next().map_or(false, |c| c.is_ascii_alphabetic());
    leading_ok &&
        chars.all(|c| {
            c.is_ascii_alphanumeric() ||
                matches!(c, '-' | '_' | '!' | '?' | '+' | '<' | '>' | '=' | '/' | '*')
        })
}

macro_rules! wire_name {
    ($(#[$doc:meta])* $name:ident, $validator:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl TryFrom<&str> for $name {
            type Error = DecodeError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                if !$validator(value) {
                    return Err(DecodeError::InvalidName(value.to_string()))
                }
                Ok($name(value.to_string()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = DecodeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                $name::try_from(value.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Codec for $name {
            fn write_to(&self, out: &mut Vec<u8>) {
                // constructor bounds the length to fit one byte
                out.push(self.0.len() as u8);
                out.extend_from_slice(self.0.as_bytes());
            }

            fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
                let len = r.read_u8()? as usize;
                let bytes = r.take(len)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|_| DecodeError::InvalidString("name is not UTF-8"))?;
                $name::try_from(s)
            }
        }
    };
}

wire_name!(
    /// The on-chain name of a deployed contract. ASCII, starts with a letter,
    /// at most 40 characters of letters, digits, `-` and `_`.
    ContractName,
    valid_contract_name
);

wire_name!(
    /// A Clarity identifier: a function name, tuple key or asset name.
    /// Same shape as a contract name but longer (128) and with the Clarity
    /// operator characters allowed.
    ClarityName,
    valid_clarity_name
);

/// An account address: a c32 version byte plus a public key hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StacksAddress {
    pub version: u8,
    pub hash: Hash160,
}

impl StacksAddress {
    pub fn new(version: u8, hash: Hash160) -> Self {
        StacksAddress { version, hash }
    }

    /// The single-signature address of a public key on the given network
    /// version.
    pub fn from_public_key(version: u8, key: &VerifyingKey, compressed: bool) -> Self {
        StacksAddress { version, hash: Hash160::from_public_key(key, compressed) }
    }

    /// The all-zero address placeholder used before a key is attached.
    pub fn burn(version: u8) -> Self {
        StacksAddress { version, hash: Hash160::zero() }
    }
}

impl fmt::Display for StacksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&c32::c32_address(self.version, self.hash.as_bytes()))
    }
}

impl FromStr for StacksAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (version, hash) = c32::c32_address_decode(s).ok_or(AddressError::InvalidC32)?;
        Ok(StacksAddress { version, hash: Hash160(hash) })
    }
}

impl Serialize for StacksAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StacksAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl Codec for StacksAddress {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.version);
        out.extend_from_slice(self.hash.as_bytes());
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let version = r.read_u8()?;
        let hash = Hash160(r.take_array()?);
        Ok(StacksAddress { version, hash })
    }
}

/// An on-chain principal: either an account or a deployed contract.
///
/// The wire form carries its own Clarity type prefix (`0x05` standard,
/// `0x06` contract), which is shared between the value codec and the
/// token-transfer payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrincipalData {
    Standard(StacksAddress),
    Contract(StacksAddress, ContractName),
}

impl PrincipalData {
    pub fn address(&self) -> &StacksAddress {
        match self {
            PrincipalData::Standard(addr) => addr,
            PrincipalData::Contract(addr, _) => addr,
        }
    }
}

impl From<StacksAddress> for PrincipalData {
    fn from(addr: StacksAddress) -> Self {
        PrincipalData::Standard(addr)
    }
}

impl fmt::Display for PrincipalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalData::Standard(addr) => write!(f, "{addr}"),
            PrincipalData::Contract(addr, name) => write!(f, "{addr}.{name}"),
        }
    }
}

impl FromStr for PrincipalData {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            None => Ok(PrincipalData::Standard(s.parse()?)),
            Some((addr, name)) => {
                let name =
                    ContractName::try_from(name).map_err(|_| AddressError::InvalidContractName)?;
                Ok(PrincipalData::Contract(addr.parse()?, name))
            }
        }
    }
}

pub(crate) const PRINCIPAL_STANDARD_PREFIX: u8 = 0x05;
pub(crate) const PRINCIPAL_CONTRACT_PREFIX: u8 = 0x06;

impl Codec for PrincipalData {
    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            PrincipalData::Standard(addr) => {
                out.push(PRINCIPAL_STANDARD_PREFIX);
                addr.write_to(out);
            }
            PrincipalData::Contract(addr, name) => {
                out.push(PRINCIPAL_CONTRACT_PREFIX);
                addr.write_to(out);
                name.write_to(out);
            }
        }
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        match r.read_u8()? {
            PRINCIPAL_STANDARD_PREFIX => Ok(PrincipalData::Standard(StacksAddress::read_from(r)?)),
            PRINCIPAL_CONTRACT_PREFIX => Ok(PrincipalData::Contract(
                StacksAddress::read_from(r)?,
                ContractName::read_from(r)?,
            )),
            other => Err(DecodeError::UnknownTypePrefix(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn address_text_round_trip() {
        let addr = StacksAddress::new(22, Hash160(hex!("df0ba3e79792be7be5e50a370289accfc8c9e032")));
        let text = addr.to_string();
        assert_eq!(text, "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159");
        assert_eq!(text.parse::<StacksAddress>().unwrap(), addr);
        assert!("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ158".parse::<StacksAddress>().is_err());
    }

    #[test]
    fn principal_text_and_wire_round_trip() {
        let contract: PrincipalData =
            "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159.my-token".parse().unwrap();
        assert_eq!(contract.to_string(), "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159.my-token");

        let bytes = contract.encode();
        assert_eq!(bytes[0], PRINCIPAL_CONTRACT_PREFIX);
        let (decoded, used) = PrincipalData::decode(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(decoded, contract);

        assert!("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159.9bad".parse::<PrincipalData>().is_err());
    }

    #[test]
    fn name_validation() {
        assert!(ContractName::try_from("my-contract_v2").is_ok());
        assert!(ContractName::try_from("2fast").is_err());
        assert!(ContractName::try_from("").is_err());
        assert!(ContractName::try_from("x".repeat(41).as_str()).is_err());

        assert!(ClarityName::try_from("transfer!").is_ok());
        assert!(ClarityName::try_from("<=").is_ok());
        assert!(ClarityName::try_from("has spaces").is_err());
    }

    #[test]
    fn json_forms_are_plain_strings() {
        let addr =
            StacksAddress::new(22, Hash160(hex!("df0ba3e79792be7be5e50a370289accfc8c9e032")));
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159\"");
        assert_eq!(serde_json::from_str::<StacksAddress>(&json).unwrap(), addr);
        // a bad checksum fails at deserialization, not later
        assert!(serde_json::from_str::<StacksAddress>(
            "\"SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ158\""
        )
        .is_err());

        let txid =
            Txid(hex!("c672b8d1ef56ed28ab87c3622c5114069bdd3ad7b8f9737498d0c01ecef0967a"));
        let json = serde_json::to_string(&txid).unwrap();
        assert_eq!(
            json,
            "\"c672b8d1ef56ed28ab87c3622c5114069bdd3ad7b8f9737498d0c01ecef0967a\""
        );
        assert_eq!(serde_json::from_str::<Txid>(&json).unwrap(), txid);
        assert!(serde_json::from_str::<Txid>("\"c672\"").is_err());
    }

    #[test]
    fn txid_formatting() {
        let txid = Txid(hex!(
            "c672b8d1ef56ed28ab87c3622c5114069bdd3ad7b8f9737498d0c01ecef0967a"
        ));
        let text = txid.to_string();
        assert_eq!(text.parse::<Txid>().unwrap(), txid);
        assert_eq!(format!("0x{text}").parse::<Txid>().unwrap(), txid);
    }
}
