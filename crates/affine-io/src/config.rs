//! IO core configuration

use crate::{AffineIoError, AffineIoResult};
use affine_capture::CaptureConfig;
use affine_protocol::{Player, VENDOR_ID};
use affine_serial::SerialSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One player slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub player: Player,
    pub product_id: u16,
    /// Initial enable flag. Can be changed at runtime with
    /// [`crate::AffineIo::set_enabled`].
    pub enabled: bool,
}

impl SlotConfig {
    pub fn new(player: Player) -> Self {
        Self {
            player,
            product_id: player.default_product_id(),
            enabled: true,
        }
    }
}

/// Protocol timing, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolTiming {
    /// Pause between discovery attempts and after a link failure.
    pub rescan_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    /// Settle time between connecting and the first board info request.
    pub board_info_delay_ms: u64,
    /// Wait for a reply before re-sending the request.
    pub board_info_timeout_ms: u64,
    /// Time after connecting at which the firmware is reported unknown.
    pub board_info_give_up_ms: u64,
    pub board_info_retries: u32,
    /// Minimum spacing of repeated discovery/open failure logs.
    pub discovery_log_interval_ms: u64,
    pub led_tick_ms: u64,
}

impl Default for ProtocolTiming {
    fn default() -> Self {
        Self {
            rescan_interval_ms: 500,
            heartbeat_interval_ms: 100,
            board_info_delay_ms: 500,
            board_info_timeout_ms: 1000,
            board_info_give_up_ms: 3000,
            board_info_retries: 1,
            discovery_log_interval_ms: 5000,
            led_tick_ms: 8,
        }
    }
}

impl ProtocolTiming {
    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn board_info_delay(&self) -> Duration {
        Duration::from_millis(self.board_info_delay_ms)
    }

    pub fn board_info_timeout(&self) -> Duration {
        Duration::from_millis(self.board_info_timeout_ms)
    }

    pub fn board_info_give_up(&self) -> Duration {
        Duration::from_millis(self.board_info_give_up_ms)
    }

    pub fn discovery_log_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_log_interval_ms)
    }

    pub fn led_tick(&self) -> Duration {
        Duration::from_millis(self.led_tick_ms)
    }
}

/// Top-level configuration of the IO core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffineConfig {
    pub vendor_id: u16,
    pub slots: Vec<SlotConfig>,
    /// Shared region name is this prefix followed by the player number.
    pub shared_region_prefix: String,
    pub timing: ProtocolTiming,
    pub serial: SerialSettings,
    pub capture: CaptureConfig,
}

impl Default for AffineConfig {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            slots: Player::ALL.into_iter().map(SlotConfig::new).collect(),
            shared_region_prefix: "mai_io_shm_".to_string(),
            timing: ProtocolTiming::default(),
            serial: SerialSettings::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl AffineConfig {
    /// Loads a JSON config file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> AffineIoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AffineIoError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the config as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> AffineIoResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| AffineIoError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies the capture flags from the process environment.
    pub fn with_env_capture(mut self) -> Self {
        self.capture = self.capture.with_env_flags(|key| std::env::var(key).ok());
        self
    }

    pub fn slot(&self, player: Player) -> Option<&SlotConfig> {
        self.slots.iter().find(|slot| slot.player == player)
    }

    pub fn slot_mut(&mut self, player: Player) -> Option<&mut SlotConfig> {
        self.slots.iter_mut().find(|slot| slot.player == player)
    }

    pub fn region_name(&self, player: Player) -> String {
        format!("{}{}", self.shared_region_prefix, player.number())
    }

    /// # Errors
    ///
    /// Returns [`AffineIoError::InvalidConfig`] describing the first problem
    /// found.
    pub fn validate(&self) -> AffineIoResult<()> {
        if self.slots.is_empty() {
            return Err(AffineIoError::invalid_config("at least one slot is required"));
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if self.slots.iter().skip(i + 1).any(|other| other.player == slot.player) {
                return Err(AffineIoError::invalid_config(format!(
                    "duplicate slot for {}",
                    slot.player
                )));
            }
        }
        if self.shared_region_prefix.is_empty() {
            return Err(AffineIoError::invalid_config(
                "shared region prefix cannot be empty",
            ));
        }

        let timing = &self.timing;
        if timing.rescan_interval_ms == 0 {
            return Err(AffineIoError::invalid_config("rescan interval must be non-zero"));
        }
        if timing.heartbeat_interval_ms == 0 {
            return Err(AffineIoError::invalid_config(
                "heartbeat interval must be non-zero",
            ));
        }
        if timing.led_tick_ms == 0 {
            return Err(AffineIoError::invalid_config("LED tick must be non-zero"));
        }
        if timing.board_info_give_up_ms < timing.board_info_delay_ms {
            return Err(AffineIoError::invalid_config(
                "board info give-up must not precede the first request",
            ));
        }

        if self.serial.baud_rate == 0 {
            return Err(AffineIoError::invalid_config("baud rate must be non-zero"));
        }
        if self.serial.read_chunk == 0 {
            return Err(AffineIoError::invalid_config("read chunk must be non-zero"));
        }
        Ok(())
    }
}
