//! Delta applier (§4.6.4): replays `COPY`/`LITERAL`/`END` commands against a
//! seekable base to reconstruct the target.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::command::DeltaCommand;
use crate::error::{DeltaError, Result};

/// Applies `delta` against `base`, writing the reconstructed bytes to
/// `target`. `base` must be seekable since `COPY` commands may reference
/// offsets out of order relative to one another.
pub fn apply<B: Read + Seek, D: Read, T: Write>(base: &mut B, delta: &mut D, target: &mut T) -> Result<u64> {
    let base_len = base.seek(SeekFrom::End(0))?;
    let mut written = 0u64;
    let mut buf = Vec::new();

    loop {
        match DeltaCommand::read_from(delta)? {
            DeltaCommand::Copy { base_offset, length } => {
                if base_offset.checked_add(u64::from(length)).is_none_or(|end| end > base_len) {
                    return Err(DeltaError::CopyOutOfRange { offset: base_offset, length });
                }
                base.seek(SeekFrom::Start(base_offset))?;
                buf.resize(length as usize, 0);
                base.read_exact(&mut buf)?;
                target.write_all(&buf)?;
                written += u64::from(length);
            }
            DeltaCommand::Literal(data) => {
                target.write_all(&data)?;
                written += data.len() as u64;
            }
            DeltaCommand::End => break,
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(commands: &[DeltaCommand]) -> Vec<u8> {
        let mut buf = Vec::new();
        for cmd in commands {
            cmd.write_to(&mut buf).unwrap();
        }
        buf
    }

    #[test]
    fn reconstructs_interleaved_copy_and_literal() {
        let base = b"0123456789";
        let delta = encode(&[
            DeltaCommand::Copy { base_offset: 0, length: 3 },
            DeltaCommand::Literal(b"XY".to_vec()),
            DeltaCommand::Copy { base_offset: 7, length: 3 },
            DeltaCommand::End,
        ]);

        let mut target = Vec::new();
        let written = apply(&mut Cursor::new(base), &mut delta.as_slice(), &mut target).unwrap();
        assert_eq!(target, b"012XY789");
        assert_eq!(written, 8);
    }

    #[test]
    fn end_only_delta_reconstructs_nothing() {
        let delta = encode(&[DeltaCommand::End]);
        let mut target = Vec::new();
        let written = apply(&mut Cursor::new(b"irrelevant"), &mut delta.as_slice(), &mut target).unwrap();
        assert_eq!(written, 0);
        assert!(target.is_empty());
    }

    #[test]
    fn copy_past_base_end_is_rejected() {
        let delta = encode(&[DeltaCommand::Copy { base_offset: 5, length: 100 }, DeltaCommand::End]);
        let mut target = Vec::new();
        let result = apply(&mut Cursor::new(b"short"), &mut delta.as_slice(), &mut target);
        assert!(matches!(result, Err(DeltaError::CopyOutOfRange { .. })));
    }
}
