//! Append-only line sinks.

use crate::{CaptureError, CaptureResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// A line-oriented writer. Each line is flushed as soon as it is written so
/// a crash loses at most the line in flight.
pub struct CaptureSink {
    writer: Box<dyn Write + Send>,
}

impl CaptureSink {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> CaptureResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| CaptureError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_writer(file))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    pub fn write_line(&mut self, line: &str) -> CaptureResult<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_appends() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cap.log");

        CaptureSink::open(&path)?.write_line("first")?;
        CaptureSink::open(&path)?.write_line("second")?;

        assert_eq!(std::fs::read_to_string(&path)?, "first\nsecond\n");
        Ok(())
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let result = CaptureSink::open(Path::new("/nonexistent-dir/affine/cap.log"));
        assert!(matches!(result, Err(CaptureError::Open { .. })));
    }
}
