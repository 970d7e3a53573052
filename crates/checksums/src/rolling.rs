//! Adler-32-style rolling weak checksum (§4.6 "rolling hash").
//!
//! Mirrors the shape of a classic rsync `rsum`: `s1` accumulates the byte
//! sum of the current window, `s2` accumulates the running sum of `s1` as
//! each byte enters, both truncated to 16 bits so the packed value fits a
//! `u32`. [`RollingChecksum::roll`] updates the window in O(1) without
//! rescanning it, which is what makes the delta calculator's sliding scan
//! over the input practical.

use crate::error::RollingError;

/// A rolling weak checksum over a sliding byte window.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RollingChecksum {
    s1: u32,
    s2: u32,
    len: usize,
}

impl RollingChecksum {
    /// Zeroed checksum over an empty window.
    #[must_use]
    pub const fn new() -> Self {
        Self { s1: 0, s2: 0, len: 0 }
    }

    /// Resets to an empty window.
    pub fn reset(&mut self) {
        self.s1 = 0;
        self.s2 = 0;
        self.len = 0;
    }

    /// Number of bytes currently in the window.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the window is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Replaces the window with `block`, discarding any prior state.
    pub fn update_from_block(&mut self, block: &[u8]) {
        self.reset();
        self.update(block);
    }

    /// Extends the current window with `chunk`.
    pub fn update(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            self.len += 1;
            self.s1 = (self.s1 + u32::from(byte)) & 0xffff;
            self.s2 = (self.s2 + self.s1) & 0xffff;
        }
    }

    /// Slides the window forward by one byte: `outgoing` leaves, `incoming`
    /// enters. The window length is unchanged.
    pub fn roll(&mut self, outgoing: u8, incoming: u8) -> Result<(), RollingError> {
        if self.len == 0 {
            return Err(RollingError::EmptyWindow);
        }
        let window_len =
            u32::try_from(self.len).map_err(|_| RollingError::WindowTooLarge { len: self.len })?;

        let out = u32::from(outgoing);
        let inn = u32::from(incoming);
        let new_s1 = self.s1.wrapping_sub(out).wrapping_add(inn) & 0xffff;
        let new_s2 = self.s2.wrapping_sub(window_len.wrapping_mul(out)).wrapping_add(new_s1) & 0xffff;
        self.s1 = new_s1;
        self.s2 = new_s2;
        Ok(())
    }

    /// Packed 32-bit value: the high half is `s2`, the low half `s1`
    /// (§4.6 "numeric semantics must match between signature and delta").
    #[must_use]
    pub const fn value(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_by_one_byte_matches_recomputing_from_scratch() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let window = 8;

        let mut rolling = RollingChecksum::new();
        rolling.update_from_block(&data[0..window]);

        for i in 1..=(data.len() - window) {
            rolling.roll(data[i - 1], data[i + window - 1]).unwrap();
            let mut fresh = RollingChecksum::new();
            fresh.update(&data[i..i + window]);
            assert_eq!(rolling.value(), fresh.value(), "mismatch rolling to offset {i}");
        }
    }

    #[test]
    fn roll_on_empty_window_is_rejected() {
        let mut checksum = RollingChecksum::new();
        assert_eq!(checksum.roll(0, 1), Err(RollingError::EmptyWindow));
    }

    #[test]
    fn identical_blocks_produce_identical_values() {
        let mut a = RollingChecksum::new();
        let mut b = RollingChecksum::new();
        a.update(b"abcdefgh");
        b.update(b"abcdefgh");
        assert_eq!(a.value(), b.value());
    }

    proptest::proptest! {
        #[test]
        fn rolling_matches_recompute_from_scratch(data in proptest::collection::vec(proptest::prelude::any::<u8>(), 8..256), window in 1usize..8) {
            let mut rolling = RollingChecksum::new();
            rolling.update_from_block(&data[0..window]);

            for i in 1..=(data.len() - window) {
                rolling.roll(data[i - 1], data[i + window - 1]).unwrap();
                let mut fresh = RollingChecksum::new();
                fresh.update(&data[i..i + window]);
                proptest::prop_assert_eq!(rolling.value(), fresh.value());
            }
        }

        #[test]
        fn update_is_order_independent_of_chunking(chunks in proptest::collection::vec(proptest::collection::vec(proptest::prelude::any::<u8>(), 0..16), 0..8)) {
            let mut incremental = RollingChecksum::new();
            let mut concatenated = Vec::new();
            for chunk in &chunks {
                incremental.update(chunk);
                concatenated.extend_from_slice(chunk);
            }

            let mut single_pass = RollingChecksum::new();
            single_pass.update(&concatenated);

            proptest::prop_assert_eq!(incremental.value(), single_pass.value());
            proptest::prop_assert_eq!(incremental.len(), single_pass.len());
        }
    }
}
