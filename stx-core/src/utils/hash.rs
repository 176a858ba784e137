use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512_256};

/// Compute the SHA-512/256 hash of input bytes.
///
/// This is the digest Stacks uses for transaction ids and the signature hash
/// chain. Note that SHA-512/256 is the truncated-with-distinct-IV variant of
/// SHA-512, not a plain truncation of a SHA-512 digest.
pub fn sha512_256<T: AsRef<[u8]>>(bytes: T) -> [u8; 32] {
    Sha512_256::digest(bytes.as_ref()).into()
}

/// Compute `sha256(sha256(bytes))`, used for the c32check address checksum.
pub fn double_sha256<T: AsRef<[u8]>>(bytes: T) -> [u8; 32] {
    Sha256::digest(Sha256::digest(bytes.as_ref())).into()
}

/// Compute `ripemd160(sha256(bytes))`, the 20-byte hash that turns a public
/// key into an address.
pub fn hash160<T: AsRef<[u8]>>(bytes: T) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(bytes.as_ref())).into()
}
