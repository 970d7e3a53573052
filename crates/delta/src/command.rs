//! Delta command wire format (§4.6.3): `COPY`, `LITERAL`, `END`, all
//! big-endian, matching the rest of the workspace's wire encodings (§6.1).

use std::io::{Read, Write};

use crate::error::{DeltaError, Result};

const TAG_COPY: u8 = 0;
const TAG_LITERAL: u8 = 1;
const TAG_END: u8 = 2;

/// One instruction in a delta stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaCommand {
    /// Reuse `length` bytes from the base starting at `base_offset`.
    Copy {
        /// Offset into the base stream.
        base_offset: u64,
        /// Number of bytes to copy.
        length: u32,
    },
    /// Literal bytes not present (unchanged) in the base.
    Literal(Vec<u8>),
    /// Terminates the delta stream.
    End,
}

impl DeltaCommand {
    /// Writes this command's wire representation.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        match self {
            DeltaCommand::Copy { base_offset, length } => {
                w.write_all(&[TAG_COPY])?;
                w.write_all(&base_offset.to_be_bytes())?;
                w.write_all(&length.to_be_bytes())?;
            }
            DeltaCommand::Literal(data) => {
                w.write_all(&[TAG_LITERAL])?;
                w.write_all(&(data.len() as u32).to_be_bytes())?;
                w.write_all(data)?;
            }
            DeltaCommand::End => {
                w.write_all(&[TAG_END])?;
            }
        }
        Ok(())
    }

    /// Reads one command, or `None` past [`DeltaCommand::End`] has already
    /// been consumed and the stream is exhausted.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut tag = [0u8; 1];
        r.read_exact(&mut tag)?;
        match tag[0] {
            TAG_COPY => {
                let mut offset_buf = [0u8; 8];
                r.read_exact(&mut offset_buf)?;
                let mut len_buf = [0u8; 4];
                r.read_exact(&mut len_buf)?;
                Ok(DeltaCommand::Copy {
                    base_offset: u64::from_be_bytes(offset_buf),
                    length: u32::from_be_bytes(len_buf),
                })
            }
            TAG_LITERAL => {
                let mut len_buf = [0u8; 4];
                r.read_exact(&mut len_buf)?;
                let len = u32::from_be_bytes(len_buf) as usize;
                let mut data = vec![0u8; len];
                r.read_exact(&mut data)?;
                Ok(DeltaCommand::Literal(data))
            }
            TAG_END => Ok(DeltaCommand::End),
            other => Err(DeltaError::UnknownCommand(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(cmd: DeltaCommand) {
        let mut buf = Vec::new();
        cmd.write_to(&mut buf).unwrap();
        let decoded = DeltaCommand::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(cmd, decoded);
    }

    #[test]
    fn round_trips_every_variant() {
        round_trip(DeltaCommand::Copy { base_offset: 4096, length: 2048 });
        round_trip(DeltaCommand::Literal(b"hello".to_vec()));
        round_trip(DeltaCommand::Literal(Vec::new()));
        round_trip(DeltaCommand::End);
    }

    #[test]
    fn rejects_unknown_tag() {
        let result = DeltaCommand::read_from(&mut [9u8].as_slice());
        assert!(matches!(result, Err(DeltaError::UnknownCommand(9))));
    }
}
