use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// A 128-bit opaque identifier for a node in the overlay.
///
/// Generated once per node on first start (see `NodeConfig`) and persisted
/// thereafter. Lexicographic byte order defines tie-breaks, notably the
/// reconnect rule in the interlink connection table (§4.3): the session
/// opened by the lesser `PeerId` is kept.
///
/// # Examples
///
/// ```
/// use fsyncd_core::PeerId;
///
/// let a = PeerId::from_bytes([0u8; 16]);
/// let b = PeerId::from_bytes([1u8; 16]);
/// assert!(a < b);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId([u8; 16]);

impl PeerId {
    /// Generates a fresh random peer id.
    #[must_use]
    pub fn generate() -> Self {
        Self(*Uuid::new_v4().as_bytes())
    }

    /// Constructs a `PeerId` from its raw 16-byte representation.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 16-byte representation, e.g. for wire framing (§6.1).
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Hex-encodes the id, used to namespace per-peer storage map names (§4.1.4).
    #[must_use]
    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.to_hex())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Error returned when a `PeerId` cannot be parsed from text.
#[derive(Debug, thiserror::Error)]
#[error("invalid peer id: {0}")]
pub struct ParsePeerIdError(String);

impl FromStr for PeerId {
    type Err = ParsePeerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 {
            return Err(ParsePeerIdError(s.to_owned()));
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let chunk = &s[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(chunk, 16).map_err(|_| ParsePeerIdError(s.to_owned()))?;
        }
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_order_defines_ord() {
        let a = PeerId::from_bytes([0u8; 16]);
        let mut high = [0u8; 16];
        high[0] = 0xff;
        let b = PeerId::from_bytes(high);
        assert!(a < b);
    }

    #[test]
    fn hex_round_trips() {
        let id = PeerId::generate();
        let hex = id.to_hex();
        let parsed: PeerId = hex.parse().expect("valid hex");
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("not-a-peer-id".parse::<PeerId>().is_err());
    }
}
