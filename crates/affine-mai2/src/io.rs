//! mai2 IO entry points over the Affine IO core.

use crate::buttons::{PollSnapshot, Poller};
use crate::{Mai2Config, Mai2Error, Mai2Result};
use affine_io::{AffineConfig, AffineIo, LED_COMMAND_LEN, TouchObserver};
use affine_protocol::{LED_GROUPS, LED_PAYLOAD_LEN, PWM_PAYLOAD_LEN, Player};
use affine_serial::{PortProvider, SystemPortProvider};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Version reported to the host, major in the high byte.
pub const API_VERSION: u16 = 0x0102;

pub fn api_version() -> u16 {
    API_VERSION
}

/// Maps a zero-based LED board index to its player.
pub fn board_player(board: u8) -> Mai2Result<Player> {
    Player::from_index(usize::from(board)).ok_or(Mai2Error::InvalidBoard(board))
}

pub struct Mai2Io {
    core: AffineIo,
    poller: Mutex<Poller>,
    latched: Mutex<PollSnapshot>,
}

impl Mai2Io {
    /// Reads the segatools INI, then starts the core on the system serial
    /// ports with capture flags taken from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the INI file cannot be read or the core fails to
    /// start.
    pub fn init() -> Mai2Result<Self> {
        info!(
            "Initializing, API version {}.{:02}",
            API_VERSION >> 8,
            API_VERSION & 0xFF
        );
        let config = Mai2Config::load()?;
        Self::start(
            config,
            AffineConfig::default().with_env_capture(),
            Arc::new(SystemPortProvider::new()),
        )
    }

    /// Starts the core with the `[touch]` enable flags applied to `core`.
    ///
    /// # Errors
    ///
    /// Returns an error if the core fails to start.
    pub fn start(
        config: Mai2Config,
        mut core: AffineConfig,
        provider: Arc<dyn PortProvider>,
    ) -> Mai2Result<Self> {
        config.apply(&mut core);
        let io = AffineIo::start(core, provider)?;
        info!("Initialization complete");
        Ok(Self::new(io))
    }

    /// Wraps an already running core.
    pub fn new(core: AffineIo) -> Self {
        Self {
            core,
            poller: Mutex::new(Poller::new()),
            latched: Mutex::new(PollSnapshot::default()),
        }
    }

    pub fn core(&self) -> &AffineIo {
        &self.core
    }

    /// Latches buttons for the following `opbtns` and `gamebtns` calls.
    pub fn poll(&self) {
        let snapshot = self.poller.lock().poll(&self.core, Instant::now());
        *self.latched.lock() = snapshot;
    }

    pub fn opbtns(&self) -> u8 {
        self.latched.lock().opbtn
    }

    /// Player 1 and player 2 game buttons.
    pub fn gamebtns(&self) -> (u16, u16) {
        let latched = self.latched.lock();
        (latched.player1, latched.player2)
    }

    pub fn touch_init(&self, observer: TouchObserver) {
        self.core.set_touch_observer(Some(observer));
    }

    pub fn touch_set_sens(&self, _sensitivity: &[u8]) {}

    pub fn touch_update(&self, player1: bool, player2: bool) {
        self.core.set_touch_enabled(Player::One, player1);
        self.core.set_touch_enabled(Player::Two, player2);
    }

    /// Sends the three FET channels of a board as PWM values.
    pub fn led_set_fet_output(&self, board: u8, values: &[u8; PWM_PAYLOAD_LEN]) {
        if let Some(player) = self.player_for(board) {
            self.core.send_pwm_leds(player, values);
        }
    }

    pub fn led_dc_update(&self, _board: u8, _rgb: &[u8]) {}

    /// Records the raw groups to the LED capture, then queues them as fades.
    pub fn led_gs_update(&self, board: u8, groups: &[u8; LED_COMMAND_LEN]) {
        let Some(player) = self.player_for(board) else {
            return;
        };
        self.core.capture().record_led(board, groups);
        self.core.submit_leds(player, groups);
    }

    /// Shows one colour on every billboard group of a board.
    pub fn led_billboard_set(&self, board: u8, rgb: &[u8; 3]) {
        if let Some(player) = self.player_for(board) {
            self.core.send_billboard_leds(player, &billboard_payload(rgb));
        }
    }

    pub fn led_cam_set(&self, _state: u8) {}

    fn player_for(&self, board: u8) -> Option<Player> {
        match board_player(board) {
            Ok(player) => Some(player),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Stops the core. Also runs on drop.
    pub fn shutdown(&mut self) {
        self.core.shutdown();
    }
}

fn billboard_payload(rgb: &[u8; 3]) -> [u8; LED_PAYLOAD_LEN] {
    let mut payload = [0u8; LED_PAYLOAD_LEN];
    for group in payload.chunks_exact_mut(LED_PAYLOAD_LEN / LED_GROUPS) {
        group.copy_from_slice(rgb);
    }
    payload
}

impl std::fmt::Debug for Mai2Io {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mai2Io")
            .field("core", &self.core)
            .field("latched", &*self.latched.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version() {
        assert_eq!(api_version(), 0x0102);
    }

    #[test]
    fn test_board_player() {
        assert!(matches!(board_player(0), Ok(Player::One)));
        assert!(matches!(board_player(1), Ok(Player::Two)));
        assert!(matches!(board_player(2), Err(Mai2Error::InvalidBoard(2))));
    }

    #[test]
    fn test_billboard_payload_repeats_colour() {
        let payload = billboard_payload(&[0x10, 0x20, 0x30]);
        for group in payload.chunks_exact(3) {
            assert_eq!(group, [0x10, 0x20, 0x30]);
        }
    }
}
