//! Signature calculator (§4.6.1): partitions a base stream into fixed-length
//! blocks and writes a header followed by one `(weak, strong, len)` record
//! per block.

use std::io::{Read, Write};

use fsyncd_checksums::{strong_hash, RollingChecksum, STRONG_HASH_LEN};

use crate::error::Result;

/// Default block length (§4.6.1: "default 2 KiB, last may be short").
pub const DEFAULT_BLOCK_SIZE: u32 = 2048;

const RECORD_LEN: usize = 4 + STRONG_HASH_LEN + 4;

/// Reads all of `base`, partitions it into `block_size`-byte blocks (the
/// last block may be shorter), and writes the signature wire format to
/// `out`: an 8-byte header (`block_size`, `block_count`, both big-endian
/// `u32`) followed by `block_count` fixed-length records.
pub fn calculate<R: Read, W: Write>(mut base: R, block_size: u32, out: &mut W) -> Result<u32> {
    let block_size = block_size.max(1);
    let mut buf = vec![0u8; block_size as usize];
    let mut records = Vec::new();

    loop {
        let mut filled = 0;
        while filled < buf.len() {
            let n = base.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }
        let block = &buf[..filled];
        let mut rolling = RollingChecksum::new();
        rolling.update_from_block(block);
        records.push((rolling.value(), strong_hash(block), filled as u32));
        if filled < buf.len() {
            break;
        }
    }

    out.write_all(&block_size.to_be_bytes())?;
    out.write_all(&(records.len() as u32).to_be_bytes())?;
    for (weak, strong, len) in &records {
        out.write_all(&weak.to_be_bytes())?;
        out.write_all(strong)?;
        out.write_all(&len.to_be_bytes())?;
    }

    Ok(records.len() as u32)
}

pub(crate) const fn record_len() -> usize {
    RECORD_LEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_base_produces_header_with_zero_records() {
        let mut out = Vec::new();
        let count = calculate(Cursor::new(b""), DEFAULT_BLOCK_SIZE, &mut out).unwrap();
        assert_eq!(count, 0);
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn partial_last_block_still_produces_a_record() {
        let data = vec![7u8; 10];
        let mut out = Vec::new();
        let count = calculate(Cursor::new(&data), 4, &mut out).unwrap();
        assert_eq!(count, 3);
        assert_eq!(out.len(), 8 + 3 * record_len());
    }
}
