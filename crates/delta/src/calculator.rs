//! Delta calculator (§4.6.3): scans the desired input against a loaded
//! [`fsyncd_signature::Signature`] and emits `COPY`/`LITERAL`/`END` commands.

use std::io::Write;

use fsyncd_checksums::{strong_hash, RollingChecksum};
use fsyncd_signature::Signature;

use crate::command::DeltaCommand;
use crate::error::Result;

/// Literal bytes accumulate up to this many before being flushed as their
/// own command (§4.6.3: "flushed when a `COPY` emits or when they reach a
/// threshold").
pub const DEFAULT_LITERAL_FLUSH_THRESHOLD: usize = 8 * 1024;

/// Computes the delta that reconstructs `input` from the base `signature`
/// describes, writing commands to `out`.
///
/// Advances a rolling-hash window one full block at a time on a match and
/// one byte at a time otherwise, rolling the checksum incrementally rather
/// than recomputing it from scratch except at the one point the window
/// shrinks to fit the input's tail.
pub fn calculate<W: Write>(signature: &Signature, input: &[u8], out: &mut W) -> Result<()> {
    calculate_with_threshold(signature, input, out, DEFAULT_LITERAL_FLUSH_THRESHOLD)
}

/// As [`calculate`], with an explicit literal-buffer flush threshold.
pub fn calculate_with_threshold<W: Write>(
    signature: &Signature,
    input: &[u8],
    out: &mut W,
    literal_flush_threshold: usize,
) -> Result<()> {
    let block_size = (signature.block_size() as usize).max(1);
    let mut literal = Vec::new();
    let mut pos = 0usize;

    if !input.is_empty() {
        let mut window_len = block_size.min(input.len());
        let mut rolling = RollingChecksum::new();
        rolling.update_from_block(&input[pos..pos + window_len]);

        loop {
            let window = &input[pos..pos + window_len];
            let matched = find_match(signature, &rolling, window, window_len);

            if let Some((base_offset, length)) = matched {
                flush_literal(&mut literal, out)?;
                DeltaCommand::Copy { base_offset, length }.write_to(out)?;
                pos += window_len;
                if pos >= input.len() {
                    break;
                }
                window_len = block_size.min(input.len() - pos);
                rolling = RollingChecksum::new();
                rolling.update_from_block(&input[pos..pos + window_len]);
            } else {
                literal.push(input[pos]);
                pos += 1;
                if literal.len() >= literal_flush_threshold {
                    flush_literal(&mut literal, out)?;
                }
                if pos >= input.len() {
                    break;
                }
                let new_window_len = block_size.min(input.len() - pos);
                if new_window_len == window_len {
                    rolling.roll(input[pos - 1], input[pos + window_len - 1])?;
                } else {
                    window_len = new_window_len;
                    rolling = RollingChecksum::new();
                    rolling.update_from_block(&input[pos..pos + window_len]);
                }
            }
        }
    }

    flush_literal(&mut literal, out)?;
    DeltaCommand::End.write_to(out)?;
    Ok(())
}

fn find_match(
    signature: &Signature,
    rolling: &RollingChecksum,
    window: &[u8],
    window_len: usize,
) -> Option<(u64, u32)> {
    let weak = rolling.value();
    for &index in signature.candidates(weak) {
        let block = signature.block(index)?;
        if block.len as usize == window_len && strong_hash(window) == block.strong {
            return Some((signature.block_offset(index), window_len as u32));
        }
    }
    None
}

fn flush_literal<W: Write>(literal: &mut Vec<u8>, out: &mut W) -> Result<()> {
    if !literal.is_empty() {
        DeltaCommand::Literal(std::mem::take(literal)).write_to(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsyncd_signature::calculate as calculate_signature;
    use std::io::Cursor;

    fn signature_for(data: &[u8], block_size: u32) -> Signature {
        let mut wire = Vec::new();
        calculate_signature(Cursor::new(data), block_size, &mut wire).unwrap();
        Signature::load(&wire).unwrap()
    }

    #[test]
    fn empty_base_yields_only_literals_and_end() {
        let signature = signature_for(b"", 4);
        let input = b"abcdefgh";
        let mut out = Vec::new();
        calculate(&signature, input, &mut out).unwrap();

        let mut cursor = out.as_slice();
        let mut literal = Vec::new();
        loop {
            match DeltaCommand::read_from(&mut cursor).unwrap() {
                DeltaCommand::Literal(bytes) => literal.extend_from_slice(&bytes),
                DeltaCommand::Copy { .. } => panic!("no base blocks to copy from"),
                DeltaCommand::End => break,
            }
        }
        assert_eq!(literal, input);
    }

    #[test]
    fn empty_input_yields_only_end() {
        let signature = signature_for(b"abcdefgh", 4);
        let mut out = Vec::new();
        calculate(&signature, b"", &mut out).unwrap();
        assert_eq!(DeltaCommand::read_from(&mut out.as_slice()).unwrap(), DeltaCommand::End);
    }

    #[test]
    fn identical_input_yields_a_single_copy() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let signature = signature_for(data, 8);
        let mut out = Vec::new();
        calculate(&signature, data, &mut out).unwrap();

        let mut cursor = out.as_slice();
        let mut copies = Vec::new();
        loop {
            match DeltaCommand::read_from(&mut cursor).unwrap() {
                DeltaCommand::Copy { base_offset, length } => copies.push((base_offset, length)),
                DeltaCommand::Literal(bytes) => panic!("unexpected literal: {bytes:?}"),
                DeltaCommand::End => break,
            }
        }
        let total: u32 = copies.iter().map(|(_, len)| len).sum();
        assert_eq!(total as usize, data.len());
    }

    #[test]
    fn single_block_change_produces_surrounding_copies_and_one_literal() {
        let mut data = b"aaaabbbbcccc".to_vec();
        let signature = signature_for(&data, 4);
        data[4..8].copy_from_slice(b"ZZZZ");

        let mut out = Vec::new();
        calculate(&signature, &data, &mut out).unwrap();

        let mut cursor = out.as_slice();
        let mut saw_literal = false;
        let mut copy_count = 0;
        loop {
            match DeltaCommand::read_from(&mut cursor).unwrap() {
                DeltaCommand::Copy { .. } => copy_count += 1,
                DeltaCommand::Literal(_) => saw_literal = true,
                DeltaCommand::End => break,
            }
        }
        assert!(saw_literal);
        assert_eq!(copy_count, 2);
    }
}
