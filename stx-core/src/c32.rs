//! The c32check address encoding.
//!
//! Stacks addresses are a version byte plus a 20-byte public key hash,
//! rendered as a base-32 string (Crockford alphabet, no `I`, `L`, `O` or `U`)
//! with a 4-byte double-SHA256 checksum and a leading `S`.
//!
//! Decoding is forgiving about case and the visually ambiguous glyphs
//! (`O` reads as `0`, `I` and `L` as `1`) but strict about the checksum:
//! anything that does not verify comes back as `None`, since malformed
//! addresses are expected input rather than an exceptional condition.

use crate::utils::double_sha256;

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Mainnet single-signature address version (`SP...`).
pub const C32_ADDRESS_VERSION_MAINNET_SINGLESIG: u8 = 22;
/// Mainnet multi-signature address version (`SM...`).
pub const C32_ADDRESS_VERSION_MAINNET_MULTISIG: u8 = 20;
/// Testnet single-signature address version (`ST...`).
pub const C32_ADDRESS_VERSION_TESTNET_SINGLESIG: u8 = 26;
/// Testnet multi-signature address version (`SN...`).
pub const C32_ADDRESS_VERSION_TESTNET_MULTISIG: u8 = 21;

fn is_known_version(version: u8) -> bool {
    matches!(
        version,
        C32_ADDRESS_VERSION_MAINNET_SINGLESIG |
            C32_ADDRESS_VERSION_MAINNET_MULTISIG |
            C32_ADDRESS_VERSION_TESTNET_SINGLESIG |
            C32_ADDRESS_VERSION_TESTNET_MULTISIG
    )
}

/// Maps a (normalized) c32 symbol back to its 5-bit value.
fn c32_value(symbol: u8) -> Option<u8> {
    C32_ALPHABET.iter().position(|&c| c == symbol).map(|v| v as u8)
}

/// Uppercases and folds the ambiguous glyphs `O -> 0`, `L -> 1`, `I -> 1`.
/// Returns `None` if the input is not ASCII.
fn normalize(input: &str) -> Option<String> {
    if !input.is_ascii() {
        return None
    }
    let folded = input
        .to_ascii_uppercase()
        .chars()
        .map(|c| match c {
            'O' => '0',
            'L' | 'I' => '1',
            other => other,
        })
        .collect();
    Some(folded)
}

/// Base-32 encode `input` with big-endian bit packing, preserving leading
/// zero bytes as leading `0` symbols.
pub fn c32_encode(input: &[u8]) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(input.len() * 8 / 5 + 2);
    let mut carry: u32 = 0;
    let mut carry_bits: u32 = 0;

    // walk the input from the least significant byte, emitting 5-bit groups
    for byte in input.iter().rev() {
        carry |= (*byte as u32) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
    }

    // drop the padding zeros, then mirror the input's leading zero bytes
    while out.last() == Some(&b'0') {
        out.pop();
    }
    for byte in input {
        if *byte == 0 {
            out.push(b'0');
        } else {
            break
        }
    }

    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Inverse of [`c32_encode`]. Accepts any glyph the normalization rules fold
/// into the alphabet; returns `None` on any symbol outside it.
pub fn c32_decode(input: &str) -> Option<Vec<u8>> {
    let normalized = normalize(input)?;
    let symbols = normalized.as_bytes();

    let mut out: Vec<u8> = Vec::with_capacity(symbols.len() * 5 / 8 + 1);
    let mut carry: u32 = 0;
    let mut carry_bits: u32 = 0;

    for symbol in symbols.iter().rev() {
        let value = c32_value(*symbol)?;
        carry |= (value as u32) << carry_bits;
        carry_bits += 5;
        while carry_bits >= 8 {
            out.push((carry & 0xff) as u8);
            carry >>= 8;
            carry_bits -= 8;
        }
    }
    if carry_bits > 0 {
        out.push(carry as u8);
    }

    while out.last() == Some(&0) {
        out.pop();
    }
    for symbol in symbols {
        if *symbol == b'0' {
            out.push(0);
        } else {
            break
        }
    }

    out.reverse();
    Some(out)
}

/// The 4-byte c32check checksum: the first four bytes of
/// `sha256(sha256(version || payload))`.
fn checksum(version: u8, payload: &[u8]) -> [u8; 4] {
    let mut preimage = Vec::with_capacity(1 + payload.len());
    preimage.push(version);
    preimage.extend_from_slice(payload);
    let digest = double_sha256(&preimage);
    let mut sum = [0u8; 4];
    sum.copy_from_slice(&digest[..4]);
    sum
}

/// Renders a (version, hash160) pair as a c32check address string.
///
/// # Panics
///
/// Panics if `version` is not representable as a single c32 symbol
/// (i.e. `version >= 32`).
pub fn c32_address(version: u8, hash: &[u8; 20]) -> String {
    assert!(version < 32, "address version must fit in one c32 symbol");

    let mut payload = Vec::with_capacity(24);
    payload.extend_from_slice(hash);
    payload.extend_from_slice(&checksum(version, hash));

    format!("S{}{}", char::from(C32_ALPHABET[version as usize]), c32_encode(&payload))
}

/// Parses a c32check address string back into its (version, hash160) pair.
///
/// Returns `None` on a missing prefix, an unrecognized version, a payload of
/// the wrong size or a checksum mismatch.
pub fn c32_address_decode(input: &str) -> Option<(u8, [u8; 20])> {
    let normalized = normalize(input)?;
    let rest = normalized.strip_prefix('S')?;
    if rest.len() < 2 {
        return None
    }

    let (version_symbol, payload_symbols) = rest.split_at(1);
    let version = c32_value(version_symbol.as_bytes()[0])?;
    if !is_known_version(version) {
        return None
    }

    let payload = c32_decode(payload_symbols)?;
    if payload.len() != 24 {
        return None
    }
    let (hash_bytes, expected_sum) = payload.split_at(20);
    if checksum(version, hash_bytes) != expected_sum {
        return None
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(hash_bytes);
    Some((version, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn address_regression_vector() {
        let hash = hex!("df0ba3e79792be7be5e50a370289accfc8c9e032");
        let encoded = c32_address(C32_ADDRESS_VERSION_MAINNET_SINGLESIG, &hash);
        assert_eq!(encoded, "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159");

        let (version, decoded) =
            c32_address_decode("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159").unwrap();
        assert_eq!(version, 22);
        assert_eq!(decoded, hash);
    }

    #[test]
    fn round_trips_all_versions() {
        let hash = hex!("0000000000000000000000000000000000000000");
        let other = hex!("ffffffffffffffffffffffffffffffffffffffff");
        for version in [
            C32_ADDRESS_VERSION_MAINNET_SINGLESIG,
            C32_ADDRESS_VERSION_MAINNET_MULTISIG,
            C32_ADDRESS_VERSION_TESTNET_SINGLESIG,
            C32_ADDRESS_VERSION_TESTNET_MULTISIG,
        ] {
            for hash in [&hash, &other] {
                let encoded = c32_address(version, hash);
                assert_eq!(c32_address_decode(&encoded), Some((version, *hash)));
            }
        }
    }

    #[test]
    fn normalizes_case_and_ambiguous_glyphs() {
        let hash = hex!("df0ba3e79792be7be5e50a370289accfc8c9e032");
        let lowered = "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159".to_ascii_lowercase();
        assert_eq!(c32_address_decode(&lowered), Some((22, hash)));

        // O for 0, l/I for 1
        let glyphed = "SP3FGQ8Z7JY9BWYZ5WM53EOM9NK7WHJF069lNZl59";
        assert_eq!(c32_address_decode(glyphed), Some((22, hash)));
    }

    #[test]
    fn rejects_bad_checksum_and_unknown_version() {
        // flip the last payload symbol
        assert_eq!(c32_address_decode("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ158"), None);
        // version symbol "A" (10) is not one of the four address versions
        let hash = hex!("df0ba3e79792be7be5e50a370289accfc8c9e032");
        let bogus = format!("SA{}", &c32_address(22, &hash)[2..]);
        assert_eq!(c32_address_decode(&bogus), None);
        // missing prefix
        assert_eq!(c32_address_decode("P3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159"), None);
        // not ASCII at all
        assert_eq!(c32_address_decode("SPé"), None);
    }

    #[test]
    fn raw_encode_preserves_leading_zero_bytes() {
        assert_eq!(c32_encode(&[0x00, 0x00, 0x01]), "001");
        assert_eq!(c32_decode("001"), Some(vec![0x00, 0x00, 0x01]));
        assert_eq!(c32_decode("!@#"), None);
    }
}
