//! SHA-256 digest rendered as lowercase hex.

use sha2::{Digest, Sha256};

/// Algorithm and version tag stored alongside every seal.
pub const ALGORITHM_VERSION: &str = "SHA-256-v1";

/// Length of a rendered digest.
pub const HASH_HEX_LEN: usize = 64;

/// Hash arbitrary bytes into a 64-character lowercase hex string.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// True when `value` looks like a rendered digest.
pub fn is_hex_digest(value: &str) -> bool {
    value.len() == HASH_HEX_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
