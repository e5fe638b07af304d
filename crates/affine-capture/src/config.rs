//! Capture configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Enables TX and RX traffic capture.
pub const ENV_CAPTURE: &str = "AFFINE_IO_CAPTURE";
/// Enables raw read capture.
pub const ENV_CAPTURE_RAW: &str = "AFFINE_IO_CAPTURE_RAW";
/// Enables LED colour update capture.
pub const ENV_CAPTURE_GS: &str = "AFFINE_IO_CAPTURE_GS";

/// Returns true if an environment value switches a flag on.
pub fn flag_enabled(value: &str) -> bool {
    matches!(value.chars().next(), Some('1' | 'y' | 'Y'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub traffic: bool,
    pub raw: bool,
    pub led: bool,
    /// Directory the log files are created in.
    pub directory: PathBuf,
    pub traffic_file: String,
    pub raw_file: String,
    pub led_file: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            traffic: false,
            raw: false,
            led: false,
            directory: PathBuf::from("."),
            traffic_file: "affine_io_capture.log".to_string(),
            raw_file: "affine_io_raw.log".to_string(),
            led_file: "affine_io_gs.log".to_string(),
        }
    }
}

impl CaptureConfig {
    /// Defaults with flags taken from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with flags taken from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::default().with_env_flags(lookup)
    }

    /// Switches on every flag that `lookup` reports as enabled. Flags already
    /// on stay on.
    pub fn with_env_flags(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = |key: &str| lookup(key).as_deref().is_some_and(flag_enabled);
        self.traffic |= enabled(ENV_CAPTURE);
        self.raw |= enabled(ENV_CAPTURE_RAW);
        self.led |= enabled(ENV_CAPTURE_GS);
        self
    }

    pub fn with_directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.directory = directory.as_ref().to_path_buf();
        self
    }

    pub fn any_enabled(&self) -> bool {
        self.traffic || self.raw || self.led
    }

    pub fn traffic_path(&self) -> PathBuf {
        self.directory.join(&self.traffic_file)
    }

    pub fn raw_path(&self) -> PathBuf {
        self.directory.join(&self.raw_file)
    }

    pub fn led_path(&self) -> PathBuf {
        self.directory.join(&self.led_file)
    }
}
