use aria_device::{DeviceError, ProbeError};
use thiserror::Error;

/// Errors that can occur during a sync session
#[derive(Debug, Error)]
pub enum SyncError {
    /// The pre-sync connection probe failed; nothing was attempted
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// The device tool failed outside of a per-folder operation
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Ledger could not be written
    #[error("Ledger persistence error: {0}")]
    Persistence(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
