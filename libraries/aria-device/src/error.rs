use thiserror::Error;

/// Errors that can occur while driving the external device tool
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device bridge tool could not be found on this system
    #[error("Device tool not found: {0}")]
    ToolMissing(String),

    /// The tool ran but exited with a failure status
    #[error("Device command failed ({command}): {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// I/O error while talking to the tool
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tool produced output we could not understand
    #[error("Unexpected tool output: {0}")]
    UnexpectedOutput(String),
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;
