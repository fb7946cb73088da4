use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Media resource rejected: {0}")]
    ResourceRejected(String),

    #[error("Playback blocked by host policy: {0}")]
    PolicyBlocked(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
