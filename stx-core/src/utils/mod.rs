//! Various utilities for manipulating Stacks related data.

mod hash;
pub use hash::{double_sha256, hash160, sha512_256};
