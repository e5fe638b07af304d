//! Error types for the IO core
//!
//! Only construction and configuration problems surface as errors. Link
//! failures while running are handled inside the slot supervisors.

use affine_capture::CaptureError;
use affine_protocol::ProtocolError;
use affine_serial::SerialError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AffineIoError {
    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or written.
    #[error("Config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON for [`crate::AffineConfig`].
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Named shared region could not be created or opened.
    #[error("Shared region {name}: {reason}")]
    SharedRegion { name: String, reason: String },

    /// A worker thread could not be spawned.
    #[error("Failed to spawn thread {name}: {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
}

pub type AffineIoResult<T> = Result<T, AffineIoError>;

impl AffineIoError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AffineIoError::invalid_config("no slots");
        assert_eq!(err.to_string(), "Invalid configuration: no slots");

        let err = AffineIoError::SharedRegion {
            name: "mai_io_shm_1".into(),
            reason: "denied".into(),
        };
        assert_eq!(err.to_string(), "Shared region mai_io_shm_1: denied");
    }

    #[test]
    fn test_from_protocol_error() {
        let err: AffineIoError = ProtocolError::InvalidPlayer(9).into();
        assert!(matches!(err, AffineIoError::Protocol(_)));
    }
}
