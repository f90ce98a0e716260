//! Merkle root over an ordered list of item hashes.
//!
//! Built level by level: each pair `(left, right)` becomes
//! `sha256(left ++ right)`, an odd level duplicates its last hash, and the
//! reduction stops when a single hash remains. Callers are responsible for
//! supplying the hashes in a reproducible order.

use tracing::debug;

use crate::crypto::digest::sha256_hex;

/// Combine two child hashes into their parent.
fn parent(left: &str, right: &str) -> String {
    let mut combined = String::with_capacity(left.len() + right.len());
    combined.push_str(left);
    combined.push_str(right);
    sha256_hex(combined)
}

/// Compute the Merkle root of `hashes`.
///
/// An empty input yields the digest of the empty string and a single hash
/// is its own root.
pub fn merkle_root(hashes: &[String]) -> String {
    match hashes {
        [] => return sha256_hex(""),
        [single] => return single.clone(),
        _ => {}
    }

    let mut level: Vec<String> = hashes.to_vec();
    let mut depth = 0usize;

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => parent(left, right),
                [last] => parent(last, last),
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
        depth += 1;
    }

    debug!("Merkle root over {} leaves ({} levels)", hashes.len(), depth);
    level.swap_remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::digest::{is_hex_digest, HASH_HEX_LEN};

    fn leaves(count: usize) -> Vec<String> {
        (0..count).map(|i| sha256_hex(format!("leaf-{}", i))).collect()
    }

    #[test]
    fn test_empty_root_is_empty_digest() {
        assert_eq!(merkle_root(&[]), sha256_hex(""));
    }

    #[test]
    fn test_single_leaf_is_root() {
        let hashes = leaves(1);
        assert_eq!(merkle_root(&hashes), hashes[0]);
    }

    #[test]
    fn test_two_leaves() {
        let hashes = leaves(2);
        let expected = sha256_hex(format!("{}{}", hashes[0], hashes[1]));
        assert_eq!(merkle_root(&hashes), expected);
    }

    #[test]
    fn test_odd_count_duplicates_last() {
        let hashes = leaves(3);
        let left = sha256_hex(format!("{}{}", hashes[0], hashes[1]));
        let right = sha256_hex(format!("{}{}", hashes[2], hashes[2]));
        let expected = sha256_hex(format!("{}{}", left, right));
        assert_eq!(merkle_root(&hashes), expected);
    }

    #[test]
    fn test_sizes_produce_hex_and_differ() {
        let mut previous: Option<String> = None;
        for count in [0usize, 1, 2, 3, 10, 11] {
            let root = merkle_root(&leaves(count));
            assert_eq!(root.len(), HASH_HEX_LEN);
            assert!(is_hex_digest(&root));
            if let Some(prev) = &previous {
                assert_ne!(prev, &root, "root for {} leaves repeated", count);
            }
            previous = Some(root);
        }
    }

    #[test]
    fn test_order_matters() {
        let hashes = leaves(4);
        let mut reversed = hashes.clone();
        reversed.reverse();
        assert_ne!(merkle_root(&hashes), merkle_root(&reversed));
    }
}
