//! Self-describing typed key/value container used by `STREAM_REQUEST`'s
//! `metainf` blob field (§6.1).

use std::collections::BTreeMap;

use crate::error::{ProtocolError, Result};

const TAG_STR: u8 = 0;
const TAG_U32: u8 = 1;
const TAG_U64: u8 = 2;
const TAG_BLOB: u8 = 3;
const TAG_BOOL: u8 = 4;
const TAG_UUID: u8 = 5;

/// One typed value a [`MetaInf`] entry may hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    /// UTF-8 text.
    Str(String),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Opaque byte blob.
    Blob(Vec<u8>),
    /// Boolean flag.
    Bool(bool),
    /// Raw 128-bit identifier.
    Uuid([u8; 16]),
}

/// An ordered map of string keys to [`MetaValue`]s, encoded as a flat,
/// self-describing byte sequence: `u32 count` followed by that many
/// `(key, tag, value)` triples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaInf {
    entries: BTreeMap<String, MetaValue>,
}

impl MetaInf {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) {
        self.entries.insert(key.into(), value);
    }

    /// Reads the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.get(key)
    }

    /// Encodes the container to its wire representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for (key, value) in &self.entries {
            encode_str(&mut buf, key);
            match value {
                MetaValue::Str(s) => {
                    buf.push(TAG_STR);
                    encode_str(&mut buf, s);
                }
                MetaValue::U32(v) => {
                    buf.push(TAG_U32);
                    buf.extend_from_slice(&v.to_be_bytes());
                }
                MetaValue::U64(v) => {
                    buf.push(TAG_U64);
                    buf.extend_from_slice(&v.to_be_bytes());
                }
                MetaValue::Blob(b) => {
                    buf.push(TAG_BLOB);
                    buf.extend_from_slice(&(b.len() as u32).to_be_bytes());
                    buf.extend_from_slice(b);
                }
                MetaValue::Bool(b) => {
                    buf.push(TAG_BOOL);
                    buf.push(u8::from(*b));
                }
                MetaValue::Uuid(u) => {
                    buf.push(TAG_UUID);
                    buf.extend_from_slice(u);
                }
            }
        }
        buf
    }

    /// Decodes a container from its wire representation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let count = cursor.read_u32()?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let key = cursor.read_str()?;
            let tag = cursor.read_u8()?;
            let value = match tag {
                TAG_STR => MetaValue::Str(cursor.read_str()?),
                TAG_U32 => MetaValue::U32(cursor.read_u32()?),
                TAG_U64 => MetaValue::U64(cursor.read_u64()?),
                TAG_BLOB => MetaValue::Blob(cursor.read_blob()?),
                TAG_BOOL => MetaValue::Bool(cursor.read_u8()? != 0),
                TAG_UUID => MetaValue::Uuid(cursor.read_uuid()?),
                other => return Err(ProtocolError::UnknownMetaTag(other)),
            };
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }
}

fn encode_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(ProtocolError::FieldTooLarge(len))?;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated metainf")
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_str(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    }

    fn read_blob(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn read_uuid(&mut self) -> Result<[u8; 16]> {
        Ok(self.take(16)?.try_into().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_value_kind() {
        let mut meta = MetaInf::new();
        meta.insert("name", MetaValue::Str("readme.md".to_owned()));
        meta.insert("size", MetaValue::U64(4096));
        meta.insert("chunk", MetaValue::U32(3));
        meta.insert("blob", MetaValue::Blob(vec![1, 2, 3]));
        meta.insert("resumable", MetaValue::Bool(true));
        meta.insert("origin", MetaValue::Uuid([9u8; 16]));

        let encoded = meta.encode();
        let decoded = MetaInf::decode(&encoded).unwrap();
        assert_eq!(meta, decoded);
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        let mut meta = MetaInf::new();
        meta.insert("k", MetaValue::U32(1));
        let mut encoded = meta.encode();
        // Corrupt the tag byte of the single entry.
        let tag_pos = encoded.len() - 4 - 1;
        encoded[tag_pos] = 0xff;
        assert!(matches!(MetaInf::decode(&encoded), Err(ProtocolError::UnknownMetaTag(0xff))));
    }
}
