//! Error types for the Affine wire protocol.

use thiserror::Error;

/// Errors produced while building or interpreting protocol frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Outbound payload does not fit in a single command frame.
    #[error("Payload too large: {len} bytes exceeds maximum {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// Board info reply carried no payload bytes.
    #[error("Board info payload is empty")]
    EmptyBoardInfo,

    /// Board info reply declared an empty version string.
    #[error("Board info declares a zero-length version")]
    ZeroLengthVersion,

    /// Board info version length runs past the end of the payload.
    #[error("Board info version length {declared} overruns {available} available bytes")]
    BoardInfoOverrun { declared: usize, available: usize },

    /// Player number outside 1..=2.
    #[error("Invalid player number: {0}")]
    InvalidPlayer(u8),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

impl ProtocolError {
    /// Returns true if the error came from a malformed device reply rather
    /// than a host-side programming mistake.
    pub fn is_device_fault(&self) -> bool {
        matches!(
            self,
            Self::EmptyBoardInfo | Self::ZeroLengthVersion | Self::BoardInfoOverrun { .. }
        )
    }
}
