//! The Clarity value codec.
//!
//! A [`Value`] is the typed unit of data exchanged with the contract
//! language: function arguments, read-only call results and post-condition
//! asset ids all travel in this encoding. The set of types is closed; the
//! leading type prefix byte uniquely determines the decoder branch, and an
//! unrecognized prefix is a fatal [`DecodeError`], never a best-effort value.
//!
//! Tuples are the one place where encode and decode are deliberately not
//! inverse on bytes: encoding always emits keys in ascending lexicographic
//! order (the keys are signature-relevant), while decoding preserves whatever
//! order the wire carried without re-sorting. Equality on the tuple variant
//! is therefore key-based rather than positional.

use crate::{
    codec::{Codec, DecodeError, Reader},
    types::{ClarityName, PrincipalData},
};
use std::fmt;
use thiserror::Error;

// Clarity wire type prefixes.
const PREFIX_INT: u8 = 0x00;
const PREFIX_UINT: u8 = 0x01;
const PREFIX_BUFFER: u8 = 0x02;
const PREFIX_BOOL_TRUE: u8 = 0x03;
const PREFIX_BOOL_FALSE: u8 = 0x04;
const PREFIX_PRINCIPAL_STANDARD: u8 = 0x05;
const PREFIX_PRINCIPAL_CONTRACT: u8 = 0x06;
const PREFIX_RESPONSE_OK: u8 = 0x07;
const PREFIX_RESPONSE_ERR: u8 = 0x08;
const PREFIX_OPTIONAL_NONE: u8 = 0x09;
const PREFIX_OPTIONAL_SOME: u8 = 0x0a;
const PREFIX_LIST: u8 = 0x0b;
const PREFIX_TUPLE: u8 = 0x0c;
const PREFIX_STRING_ASCII: u8 = 0x0d;
const PREFIX_STRING_UTF8: u8 = 0x0e;

/// An error constructing a [`Value`] from caller input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("ASCII string contains a non-ASCII character")]
    NotAscii,
    #[error("duplicate tuple key \"{0}\"")]
    DuplicateKey(ClarityName),
}

/// A typed Clarity value in its structured form.
///
/// Integers are exactly 128 bits wide on the wire; the native `i128`/`u128`
/// carry them losslessly. Values are immutable once built: constructors
/// validate, the codec round-trips.
#[derive(Clone, Debug)]
pub enum Value {
    Int(i128),
    UInt(u128),
    Buffer(Vec<u8>),
    Bool(bool),
    Principal(PrincipalData),
    ResponseOk(Box<Value>),
    ResponseErr(Box<Value>),
    OptionalNone,
    OptionalSome(Box<Value>),
    List(Vec<Value>),
    /// Key/value entries in decoded (or caller-supplied) order. Keys are
    /// unique; ordering does not participate in equality.
    Tuple(Vec<(ClarityName, Value)>),
    StringAscii(String),
    StringUtf8(String),
}

impl Value {
    /// Wraps a value in `(ok ...)`.
    pub fn okay(value: Value) -> Self {
        Value::ResponseOk(Box::new(value))
    }

    /// Wraps a value in `(err ...)`.
    pub fn error(value: Value) -> Self {
        Value::ResponseErr(Box::new(value))
    }

    /// Wraps a value in `(some ...)`.
    pub fn some(value: Value) -> Self {
        Value::OptionalSome(Box::new(value))
    }

    pub fn none() -> Self {
        Value::OptionalNone
    }

    pub fn buff(data: Vec<u8>) -> Self {
        Value::Buffer(data)
    }

    pub fn list(values: Vec<Value>) -> Self {
        Value::List(values)
    }

    /// Builds an ASCII string value, rejecting non-ASCII input.
    pub fn string_ascii<S: Into<String>>(s: S) -> Result<Self, ValueError> {
        let s = s.into();
        if !s.is_ascii() {
            return Err(ValueError::NotAscii)
        }
        Ok(Value::StringAscii(s))
    }

    pub fn string_utf8<S: Into<String>>(s: S) -> Self {
        Value::StringUtf8(s.into())
    }

    /// Builds a tuple value, rejecting duplicate keys. Entry order is kept
    /// as given; the codec sorts on encode.
    pub fn tuple(entries: Vec<(ClarityName, Value)>) -> Result<Self, ValueError> {
        for (i, (key, _)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(prev, _)| prev == key) {
                return Err(ValueError::DuplicateKey(key.clone()))
            }
        }
        Ok(Value::Tuple(entries))
    }

    /// Parses a value from an optionally `0x`-prefixed hex string, the form
    /// node read-only endpoints return. The whole string must be consumed.
    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| DecodeError::InvalidHex)?;
        Value::decode_exact(&bytes)
    }

    /// Renders the canonical encoding as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (UInt(a), UInt(b)) => a == b,
            (Buffer(a), Buffer(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (Principal(a), Principal(b)) => a == b,
            (ResponseOk(a), ResponseOk(b)) => a == b,
            (ResponseErr(a), ResponseErr(b)) => a == b,
            (OptionalNone, OptionalNone) => true,
            (OptionalSome(a), OptionalSome(b)) => a == b,
            (List(a), List(b)) => a == b,
            // tuples compare as maps: same keys, same values, any order
            (Tuple(a), Tuple(b)) => {
                a.len() == b.len() &&
                    a.iter().all(|(key, value)| {
                        b.iter().any(|(other_key, other_value)| {
                            key == other_key && value == other_value
                        })
                    })
            }
            (StringAscii(a), StringAscii(b)) => a == b,
            (StringUtf8(a), StringUtf8(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "u{u}"),
            Value::Buffer(data) => write!(f, "0x{}", hex::encode(data)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Principal(p) => write!(f, "'{p}"),
            Value::ResponseOk(v) => write!(f, "(ok {v})"),
            Value::ResponseErr(v) => write!(f, "(err {v})"),
            Value::OptionalNone => write!(f, "none"),
            Value::OptionalSome(v) => write!(f, "(some {v})"),
            Value::List(values) => {
                write!(f, "(list")?;
                for v in values {
                    write!(f, " {v}")?;
                }
                write!(f, ")")
            }
            Value::Tuple(entries) => {
                write!(f, "(tuple")?;
                for (key, value) in entries {
                    write!(f, " ({key} {value})")?;
                }
                write!(f, ")")
            }
            Value::StringAscii(s) => write!(f, "\"{s}\""),
            Value::StringUtf8(s) => write!(f, "u\"{s}\""),
        }
    }
}

impl Codec for Value {
    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Value::Int(i) => {
                out.push(PREFIX_INT);
                // two's complement over exactly 128 bits: value mod 2^128
                out.extend_from_slice(&(*i as u128).to_be_bytes());
            }
            Value::UInt(u) => {
                out.push(PREFIX_UINT);
                out.extend_from_slice(&u.to_be_bytes());
            }
            Value::Buffer(data) => {
                out.push(PREFIX_BUFFER);
                out.extend_from_slice(&(data.len() as u32).to_be_bytes());
                out.extend_from_slice(data);
            }
            Value::Bool(true) => out.push(PREFIX_BOOL_TRUE),
            Value::Bool(false) => out.push(PREFIX_BOOL_FALSE),
            // PrincipalData writes its own 0x05/0x06 prefix
            Value::Principal(p) => p.write_to(out),
            Value::ResponseOk(v) => {
                out.push(PREFIX_RESPONSE_OK);
                v.write_to(out);
            }
            Value::ResponseErr(v) => {
                out.push(PREFIX_RESPONSE_ERR);
                v.write_to(out);
            }
            Value::OptionalNone => out.push(PREFIX_OPTIONAL_NONE),
            Value::OptionalSome(v) => {
                out.push(PREFIX_OPTIONAL_SOME);
                v.write_to(out);
            }
            Value::List(values) => {
                out.push(PREFIX_LIST);
                out.extend_from_slice(&(values.len() as u32).to_be_bytes());
                for v in values {
                    v.write_to(out);
                }
            }
            Value::Tuple(entries) => {
                out.push(PREFIX_TUPLE);
                out.extend_from_slice(&(entries.len() as u32).to_be_bytes());
                // canonical order: ascending lexicographic keys
                let mut sorted: Vec<&(ClarityName, Value)> = entries.iter().collect();
                sorted.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));
                for (key, value) in sorted {
                    key.write_to(out);
                    value.write_to(out);
                }
            }
            Value::StringAscii(s) => {
                out.push(PREFIX_STRING_ASCII);
                out.extend_from_slice(&(s.len() as u32).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Value::StringUtf8(s) => {
                out.push(PREFIX_STRING_UTF8);
                let bytes = s.as_bytes();
                out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                out.extend_from_slice(bytes);
            }
        }
    }

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        // principals own their prefix byte, so dispatch on a peek
        if matches!(r.peek_u8()?, PREFIX_PRINCIPAL_STANDARD | PREFIX_PRINCIPAL_CONTRACT) {
            return Ok(Value::Principal(PrincipalData::read_from(r)?))
        }
        let prefix = r.read_u8()?;
        match prefix {
            PREFIX_INT => Ok(Value::Int(r.read_u128()? as i128)),
            PREFIX_UINT => Ok(Value::UInt(r.read_u128()?)),
            PREFIX_BUFFER => {
                let len = r.read_u32()? as usize;
                Ok(Value::Buffer(r.take(len)?.to_vec()))
            }
            PREFIX_BOOL_TRUE => Ok(Value::Bool(true)),
            PREFIX_BOOL_FALSE => Ok(Value::Bool(false)),
            PREFIX_RESPONSE_OK => Ok(Value::okay(Value::read_from(r)?)),
            PREFIX_RESPONSE_ERR => Ok(Value::error(Value::read_from(r)?)),
            PREFIX_OPTIONAL_NONE => Ok(Value::OptionalNone),
            PREFIX_OPTIONAL_SOME => Ok(Value::some(Value::read_from(r)?)),
            PREFIX_LIST => {
                let count = r.read_u32()? as usize;
                let mut values = Vec::with_capacity(count.min(r.remaining()));
                for _ in 0..count {
                    values.push(Value::read_from(r)?);
                }
                Ok(Value::List(values))
            }
            PREFIX_TUPLE => {
                let count = r.read_u32()? as usize;
                let mut entries: Vec<(ClarityName, Value)> =
                    Vec::with_capacity(count.min(r.remaining()));
                for _ in 0..count {
                    let key = ClarityName::read_from(r)?;
                    if entries.iter().any(|(prev, _)| prev == &key) {
                        return Err(DecodeError::DuplicateTupleKey(key.to_string()))
                    }
                    let value = Value::read_from(r)?;
                    entries.push((key, value));
                }
                Ok(Value::Tuple(entries))
            }
            PREFIX_STRING_ASCII => {
                let len = r.read_u32()? as usize;
                let bytes = r.take(len)?;
                if !bytes.is_ascii() {
                    return Err(DecodeError::InvalidString("non-ASCII byte in ASCII string"))
                }
                // checked above
                Ok(Value::StringAscii(String::from_utf8_lossy(bytes).into_owned()))
            }
            PREFIX_STRING_UTF8 => {
                let len = r.read_u32()? as usize;
                let bytes = r.take(len)?.to_vec();
                let s = String::from_utf8(bytes)
                    .map_err(|_| DecodeError::InvalidString("invalid UTF-8"))?;
                Ok(Value::StringUtf8(s))
            }
            other => Err(DecodeError::UnknownTypePrefix(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Hash160, StacksAddress};
    use hex_literal::hex;

    fn name(s: &str) -> ClarityName {
        ClarityName::try_from(s).unwrap()
    }

    fn round_trip(value: &Value) -> Vec<u8> {
        let bytes = value.encode();
        let (decoded, used) = Value::decode(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(&decoded, value);
        // canonical bytes re-encode identically
        assert_eq!(decoded.encode(), bytes);
        bytes
    }

    #[test]
    fn uint_wire_vector() {
        let bytes = hex!("0100000000000000000000000001701adc");
        let (value, used) = Value::decode(&bytes).unwrap();
        assert_eq!(used, 17);
        assert_eq!(value, Value::UInt(24_124_124));
        assert_eq!(value.encode(), bytes);
    }

    #[test]
    fn signed_int_wire_vector() {
        let bytes = hex!("00ffffffffffffffffffffffffffffffff");
        let (value, _) = Value::decode(&bytes).unwrap();
        assert_eq!(value, Value::Int(-1));
        assert_eq!(value.encode(), bytes);

        // negatives are 2^128-complement, not sign-magnitude
        let minus_two = Value::Int(-2).encode();
        assert_eq!(minus_two[0], 0x00);
        assert_eq!(minus_two[1..], hex!("fffffffffffffffffffffffffffffffe"));
        round_trip(&Value::Int(i128::MIN));
        round_trip(&Value::Int(i128::MAX));
        round_trip(&Value::UInt(u128::MAX));
    }

    #[test]
    fn scalar_round_trips() {
        round_trip(&Value::Bool(true));
        round_trip(&Value::Bool(false));
        round_trip(&Value::none());
        round_trip(&Value::some(Value::UInt(7)));
        round_trip(&Value::okay(Value::Bool(true)));
        round_trip(&Value::error(Value::UInt(419)));
        round_trip(&Value::buff(vec![]));
        round_trip(&Value::buff(b"deadbeef".to_vec()));
        round_trip(&Value::string_ascii("hello world").unwrap());
        round_trip(&Value::string_utf8("hello \u{1f600}"));
    }

    #[test]
    fn principal_round_trips() {
        let addr = StacksAddress::new(22, Hash160(hex!("df0ba3e79792be7be5e50a370289accfc8c9e032")));
        let standard = Value::Principal(PrincipalData::Standard(addr));
        let bytes = round_trip(&standard);
        assert_eq!(bytes[0], 0x05);
        assert_eq!(bytes.len(), 22);

        let contract = Value::Principal(PrincipalData::Contract(
            addr,
            "pox".try_into().unwrap(),
        ));
        let bytes = round_trip(&contract);
        assert_eq!(bytes[0], 0x06);
    }

    #[test]
    fn list_round_trip() {
        let list = Value::list(vec![
            Value::UInt(1),
            Value::list(vec![Value::Bool(false)]),
            Value::none(),
        ]);
        let bytes = round_trip(&list);
        assert_eq!(bytes[0], 0x0b);
        assert_eq!(&bytes[1..5], &3u32.to_be_bytes());
    }

    #[test]
    fn tuple_encode_sorts_keys() {
        let unsorted = Value::tuple(vec![
            (name("zebra"), Value::UInt(1)),
            (name("alpha"), Value::UInt(2)),
            (name("mango"), Value::UInt(3)),
        ])
        .unwrap();
        let sorted = Value::tuple(vec![
            (name("alpha"), Value::UInt(2)),
            (name("mango"), Value::UInt(3)),
            (name("zebra"), Value::UInt(1)),
        ])
        .unwrap();

        // same bytes regardless of the caller's entry order
        assert_eq!(unsorted.encode(), sorted.encode());
        let bytes = unsorted.encode();
        // "alpha" is the first key on the wire
        assert_eq!(&bytes[5..11], b"\x05alpha");

        // decode preserves wire order and compares equal either way
        let (decoded, _) = Value::decode(&bytes).unwrap();
        assert_eq!(decoded, unsorted);
        assert_eq!(decoded, sorted);
    }

    #[test]
    fn tuple_decode_does_not_resort() {
        // hand-build a tuple whose wire order is descending
        let mut bytes = vec![0x0c, 0, 0, 0, 2];
        bytes.push(1);
        bytes.extend_from_slice(b"b");
        Value::UInt(2).write_to(&mut bytes);
        bytes.push(1);
        bytes.extend_from_slice(b"a");
        Value::UInt(1).write_to(&mut bytes);

        let (decoded, _) = Value::decode(&bytes).unwrap();
        match &decoded {
            Value::Tuple(entries) => {
                assert_eq!(entries[0].0.as_str(), "b");
                assert_eq!(entries[1].0.as_str(), "a");
            }
            other => panic!("expected tuple, got {other:?}"),
        }
        // the accepted asymmetry: re-encoding canonicalizes the order
        assert_ne!(decoded.encode(), bytes);
        assert_eq!(Value::decode(&decoded.encode()).unwrap().0, decoded);
    }

    #[test]
    fn constructor_validation() {
        assert_eq!(Value::string_ascii("héllo"), Err(ValueError::NotAscii));
        assert_eq!(
            Value::tuple(vec![(name("a"), Value::UInt(1)), (name("a"), Value::UInt(2))]),
            Err(ValueError::DuplicateKey(name("a")))
        );
    }

    #[test]
    fn decode_failures() {
        // unknown prefix
        assert_eq!(Value::decode(&[0x0f]), Err(DecodeError::UnknownTypePrefix(0x0f)));
        // truncated integer body
        assert!(matches!(
            Value::decode(&hex!("01000000")),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        // buffer length runs past the input
        assert!(matches!(
            Value::decode(&hex!("02000000ffaa")),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        // empty input
        assert!(matches!(Value::decode(&[]), Err(DecodeError::UnexpectedEof { .. })));
        // duplicate tuple keys are rejected on decode too
        let mut bytes = vec![0x0c, 0, 0, 0, 2];
        for _ in 0..2 {
            bytes.push(1);
            bytes.extend_from_slice(b"k");
            Value::Bool(true).write_to(&mut bytes);
        }
        assert_eq!(
            Value::decode(&bytes),
            Err(DecodeError::DuplicateTupleKey("k".to_string()))
        );
    }

    #[test]
    fn from_hex_requires_full_consumption() {
        let value = Value::from_hex("0x0100000000000000000000000001701adc").unwrap();
        assert_eq!(value, Value::UInt(24_124_124));
        assert_eq!(value.to_hex(), "0100000000000000000000000001701adc");

        assert_eq!(
            Value::from_hex("0100000000000000000000000001701adc03"),
            Err(DecodeError::TrailingBytes(1))
        );
        assert_eq!(Value::from_hex("zz"), Err(DecodeError::InvalidHex));
    }
}
