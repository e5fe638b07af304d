//! Capture error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open capture file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write capture line: {0}")]
    Write(#[from] std::io::Error),
}

pub type CaptureResult<T> = Result<T, CaptureError>;
