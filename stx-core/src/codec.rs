//! Byte-level plumbing for the consensus wire encoding.
//!
//! Every wire type implements [`Codec`]: encoding is total and infallible,
//! decoding returns a typed [`DecodeError`] on malformed or truncated input
//! and never produces a partial value.

use thiserror::Error;

/// An error produced while decoding consensus-encoded bytes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended before the current field was complete.
    #[error("unexpected end of input: needed {needed} more bytes, {remaining} available")]
    UnexpectedEof {
        /// How many bytes the current field still required
        needed: usize,
        /// How many bytes were left in the input
        remaining: usize,
    },
    /// The leading type prefix of a Clarity value is not one of the known tags.
    #[error("unknown type prefix {0:#04x}")]
    UnknownTypePrefix(u8),
    /// A fixed-enumeration byte (anchor mode, auth type, condition code, ...)
    /// holds a value outside its enumeration.
    #[error("unknown {kind} byte {value:#04x}")]
    UnknownVariant {
        /// Which enumeration was being decoded
        kind: &'static str,
        /// The offending byte
        value: u8,
    },
    /// A Clarity or contract name failed charset/length validation.
    #[error("invalid name: {0}")]
    InvalidName(String),
    /// A string payload held bytes outside its declared encoding.
    #[error("invalid string payload: {0}")]
    InvalidString(&'static str),
    /// A tuple carried the same key twice.
    #[error("duplicate tuple key \"{0}\"")]
    DuplicateTupleKey(String),
    /// Hex text could not be parsed into bytes.
    #[error("invalid hex string")]
    InvalidHex,
    /// Bytes were left over after the value was fully decoded, in a context
    /// that requires the input to be consumed exactly.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}

/// A cursor over an input buffer, tracking how many bytes have been consumed.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Number of bytes left in the input.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Takes the next `n` bytes, failing on truncated input.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof { needed: n, remaining: self.remaining() })
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Takes the next `N` bytes as a fixed-size array.
    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Looks at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof { needed: 1, remaining: 0 })
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub fn read_u128(&mut self) -> Result<u128, DecodeError> {
        Ok(u128::from_be_bytes(self.take_array()?))
    }
}

/// Canonical (consensus) byte encoding of a wire type.
pub trait Codec: Sized {
    /// Appends the canonical encoding of `self` to `out`.
    fn write_to(&self, out: &mut Vec<u8>);

    /// Decodes a value from the front of the reader.
    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError>;

    /// Serializes `self` into a fresh buffer.
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    /// Decodes a value from the start of `buf`, returning it together with
    /// the number of bytes consumed.
    fn decode(buf: &[u8]) -> Result<(Self, usize), DecodeError> {
        let mut r = Reader::new(buf);
        let value = Self::read_from(&mut r)?;
        Ok((value, r.consumed()))
    }

    /// Decodes a value that must span the entire buffer.
    fn decode_exact(buf: &[u8]) -> Result<Self, DecodeError> {
        let (value, consumed) = Self::decode(buf)?;
        if consumed != buf.len() {
            return Err(DecodeError::TrailingBytes(buf.len() - consumed))
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_tracks_consumption() {
        let mut r = Reader::new(&[0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u32().unwrap(), 0x0203_0405);
        assert_eq!(r.consumed(), 5);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn reader_rejects_truncated_input() {
        let mut r = Reader::new(&[0x01, 0x02]);
        assert_eq!(
            r.read_u32(),
            Err(DecodeError::UnexpectedEof { needed: 4, remaining: 2 })
        );
        // a failed read consumes nothing
        assert_eq!(r.consumed(), 0);
    }
}
