//! Error types for the mai2 front end

use affine_io::AffineIoError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Mai2Error {
    /// The IO core failed to start.
    #[error("IO core error: {0}")]
    Io(#[from] AffineIoError),

    /// The INI file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A board index other than 0 or 1.
    #[error("Invalid LED board index: {0}")]
    InvalidBoard(u8),
}

pub type Mai2Result<T> = Result<T, Mai2Error>;
