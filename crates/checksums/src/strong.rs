//! Strong per-block digest (§4.6 "a cryptographic hash for the strong
//! component"). BLAKE2b-256 confirms a weak-hash match before a signature
//! block is trusted to stand in for the matching input bytes.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// Width in bytes of [`strong_hash`]'s output.
pub const STRONG_HASH_LEN: usize = 32;

/// Computes the strong digest of `block`.
#[must_use]
pub fn strong_hash(block: &[u8]) -> [u8; STRONG_HASH_LEN] {
    let mut hasher = Blake2b256::new();
    hasher.update(block);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_blocks_hash_identically() {
        assert_eq!(strong_hash(b"abc"), strong_hash(b"abc"));
    }

    #[test]
    fn differing_blocks_hash_differently() {
        assert_ne!(strong_hash(b"abc"), strong_hash(b"abd"));
    }

    #[test]
    fn empty_block_hashes_to_a_fixed_value() {
        let first = strong_hash(b"");
        let second = strong_hash(b"");
        assert_eq!(first, second);
        assert_eq!(first.len(), STRONG_HASH_LEN);
    }
}
