//! In-memory signature (§4.6.2): loads the wire format produced by
//! [`crate::calculator::calculate`] and indexes it by weak hash.

use rustc_hash::FxHashMap;

use fsyncd_checksums::STRONG_HASH_LEN;

use crate::error::{Result, SignatureError};

/// One block's recorded checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRecord {
    /// Weak rolling-hash value captured at signature time.
    pub weak: u32,
    /// Strong digest of the block.
    pub strong: [u8; STRONG_HASH_LEN],
    /// Actual length of this block (short only for the final block).
    pub len: u32,
}

/// Lifecycle of a [`Signature`] (§4.6.2: "mutates between LOADING and READY").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureState {
    /// No signature has been loaded yet.
    Loading,
    /// `blocks` and the weak-hash index are populated and queryable.
    Ready,
}

/// A loaded signature, indexed by weak hash for the delta calculator's scan.
#[derive(Debug, Default)]
pub struct Signature {
    state: Option<SignatureState>,
    block_size: u32,
    blocks: Vec<BlockRecord>,
    by_weak: FxHashMap<u32, Vec<u32>>,
}

impl Signature {
    /// A signature with nothing loaded yet.
    #[must_use]
    pub fn new() -> Self {
        Self { state: None, block_size: 0, blocks: Vec::new(), by_weak: FxHashMap::default() }
    }

    /// Parses `bytes` (the wire format [`crate::calculator::calculate`]
    /// writes) and builds the weak-hash index, transitioning to
    /// [`SignatureState::Ready`].
    pub fn load(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(SignatureError::Corrupt("signature shorter than its header".into()));
        }
        let block_size = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        let block_count = u32::from_be_bytes(bytes[4..8].try_into().unwrap());

        let record_len = crate::calculator::record_len();
        let expected_len = 8 + block_count as usize * record_len;
        if bytes.len() != expected_len {
            return Err(SignatureError::Corrupt(format!(
                "expected {expected_len} bytes for {block_count} records, got {}",
                bytes.len()
            )));
        }

        let mut blocks = Vec::with_capacity(block_count as usize);
        let mut by_weak: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        let mut cursor = 8;
        for index in 0..block_count {
            let weak = u32::from_be_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
            cursor += 4;
            let mut strong = [0u8; STRONG_HASH_LEN];
            strong.copy_from_slice(&bytes[cursor..cursor + STRONG_HASH_LEN]);
            cursor += STRONG_HASH_LEN;
            let len = u32::from_be_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
            cursor += 4;

            blocks.push(BlockRecord { weak, strong, len });
            by_weak.entry(weak).or_default().push(index);
        }

        Ok(Self { state: Some(SignatureState::Ready), block_size, blocks, by_weak })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> Option<SignatureState> {
        self.state
    }

    /// Block length this signature was generated with.
    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Number of recorded blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no blocks were recorded (an empty base, §4.6 Edge cases).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Indices of every block sharing `weak`'s rolling-hash value. The
    /// caller must still confirm with the strong hash before trusting a
    /// match (§4.6.3).
    #[must_use]
    pub fn candidates(&self, weak: u32) -> &[u32] {
        self.by_weak.get(&weak).map_or(&[], Vec::as_slice)
    }

    /// The record at `index`.
    #[must_use]
    pub fn block(&self, index: u32) -> Option<&BlockRecord> {
        self.blocks.get(index as usize)
    }

    /// Byte offset of block `index` within the base (§4.6.4: blocks are
    /// contiguous and fixed-length except for the last).
    #[must_use]
    pub fn block_offset(&self, index: u32) -> u64 {
        u64::from(index) * u64::from(self.block_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::calculate;
    use std::io::Cursor;

    #[test]
    fn load_rejects_truncated_header() {
        let err = Signature::load(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, SignatureError::Corrupt(_)));
    }

    #[test]
    fn load_indexes_every_block_by_weak_hash() {
        let data = b"aaaabbbbcccc";
        let mut wire = Vec::new();
        calculate(Cursor::new(data), 4, &mut wire).unwrap();

        let signature = Signature::load(&wire).unwrap();
        assert_eq!(signature.state(), Some(SignatureState::Ready));
        assert_eq!(signature.len(), 3);
        for index in 0..3u32 {
            let block = signature.block(index).unwrap();
            assert!(signature.candidates(block.weak).contains(&index));
        }
    }

    #[test]
    fn empty_signature_has_no_candidates() {
        let mut wire = Vec::new();
        calculate(Cursor::new(b""), 4, &mut wire).unwrap();
        let signature = Signature::load(&wire).unwrap();
        assert!(signature.is_empty());
        assert!(signature.candidates(0).is_empty());
    }
}
