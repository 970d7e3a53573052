use fsyncd_core::NodeError;

/// Error taxonomy for delta calculation and application (§4.6.3-4.6.4).
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// Underlying I/O failure reading or writing a stream.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The delta wire format named an unknown command tag.
    #[error("unknown delta command tag {0}")]
    UnknownCommand(u8),

    /// A `COPY` command referenced an offset/length past the base's end.
    #[error("copy command out of range: offset {offset}, length {length}")]
    CopyOutOfRange {
        /// Requested base offset.
        offset: u64,
        /// Requested copy length.
        length: u32,
    },

    /// The rolling checksum window was rolled in an invalid state (an
    /// internal bug in the calculator's window bookkeeping, not something a
    /// caller can trigger).
    #[error(transparent)]
    Rolling(#[from] fsyncd_checksums::RollingError),
}

impl From<DeltaError> for NodeError {
    fn from(err: DeltaError) -> Self {
        match err {
            DeltaError::Io(e) => NodeError::Io(e),
            DeltaError::UnknownCommand(_)
            | DeltaError::CopyOutOfRange { .. }
            | DeltaError::Rolling(_) => NodeError::Protocol(err.to_string()),
        }
    }
}

/// Convenience alias for delta operations.
pub type Result<T> = std::result::Result<T, DeltaError>;
