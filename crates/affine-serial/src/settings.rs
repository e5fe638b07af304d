//! Line settings applied when a board is opened.

use affine_protocol::BAUD_RATE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serial line configuration.
///
/// Data format is always 8N1 without flow control. Reads wait at most
/// `read_timeout_ms`. A write of `n` bytes may take up to
/// `write_timeout_base_ms + n * write_timeout_per_byte_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub write_timeout_base_ms: u64,
    pub write_timeout_per_byte_ms: u64,
    /// Assert DTR after opening. Boards only stream while DTR is high.
    pub assert_dtr: bool,
    pub assert_rts: bool,
    /// Largest single read.
    pub read_chunk: usize,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            read_timeout_ms: 20,
            write_timeout_base_ms: 50,
            write_timeout_per_byte_ms: 5,
            assert_dtr: true,
            assert_rts: true,
            read_chunk: 64,
        }
    }
}

impl SerialSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Deadline for writing `len` bytes.
    pub fn write_timeout(&self, len: usize) -> Duration {
        let len = u64::try_from(len).unwrap_or(u64::MAX);
        Duration::from_millis(
            self.write_timeout_base_ms
                .saturating_add(len.saturating_mul(self.write_timeout_per_byte_ms)),
        )
    }
}
