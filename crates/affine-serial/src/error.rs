//! Serial transport errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerialError {
    #[error("No port with VID {vendor_id:04X} PID {product_id:04X}")]
    PortNotFound { vendor_id: u16, product_id: u16 },

    #[error("Failed to enumerate ports: {0}")]
    Enumeration(String),

    #[error("Failed to open {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Write timed out after {written} of {total} bytes")]
    WriteTimeout { written: usize, total: usize },

    #[error("Port disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SerialResult<T> = Result<T, SerialError>;

impl SerialError {
    /// True for errors after which the port handle must be discarded.
    pub fn is_link_loss(&self) -> bool {
        !matches!(
            self,
            SerialError::PortNotFound { .. } | SerialError::Enumeration(_)
        )
    }
}
