use core::fmt;

/// Errors raised while updating a [`crate::rolling::RollingChecksum`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RollingError {
    /// The checksum window is empty, so a byte-for-byte roll has nothing to remove.
    EmptyWindow,
    /// The rolling window no longer fits in 32 bits.
    WindowTooLarge {
        /// Window length observed when the error was raised.
        len: usize,
    },
}

impl fmt::Display for RollingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyWindow => write!(f, "rolling checksum requires a non-empty window"),
            Self::WindowTooLarge { len } => {
                write!(f, "rolling checksum window of {len} bytes exceeds 32-bit limit")
            }
        }
    }
}

impl std::error::Error for RollingError {}
