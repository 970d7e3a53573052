use fsyncd_core::NodeError;

/// Error taxonomy for the message bus (§4.2).
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The target worker's bounded queue could not accept the message.
    #[error("queue full")]
    QueueFull,

    /// The bus has been shut down; no further publishes are accepted.
    #[error("bus is shut down")]
    ShutDown,
}

impl From<BusError> for NodeError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::QueueFull => NodeError::QueueFull,
            BusError::ShutDown => NodeError::InvalidArg("bus is shut down".to_owned()),
        }
    }
}

/// Convenience alias for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
