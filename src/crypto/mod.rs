//! Hashing primitives for integrity seals.

pub mod digest;
pub mod merkle;

pub use digest::{sha256_hex, ALGORITHM_VERSION, HASH_HEX_LEN};
pub use merkle::merkle_root;
