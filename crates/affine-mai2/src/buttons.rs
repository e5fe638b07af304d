//! Button mapping and per-poll state for the mai2 front end.

use affine_io::{AffineIo, SlotState};
use affine_protocol::{Player, extended_bits};
use affine_serial::LogGate;
use std::time::{Duration, Instant};
use tracing::debug;

/// Operator button bits.
pub mod opbtn {
    pub const TEST: u8 = 0x01;
    pub const SERVICE: u8 = 0x02;
    pub const COIN: u8 = 0x04;
}

/// Game button bits. Buttons 1 to 8 are bits 0 to 7.
pub mod gamebtn {
    pub const SELECT: u16 = 0x100;
}

/// Where the poller reads player state from.
pub trait InputSource {
    fn state(&self, player: Player) -> Option<SlotState>;
}

impl InputSource for AffineIo {
    fn state(&self, player: Player) -> Option<SlotState> {
        AffineIo::state(self, player)
    }
}

/// Game button word of one player.
pub fn game_buttons(state: &SlotState) -> u16 {
    let mut buttons = u16::from(state.buttons0);
    if state.buttons1 & extended_bits::SELECT != 0 {
        buttons |= gamebtn::SELECT;
    }
    buttons
}

/// Test and service bits of one player. Coin is edge-triggered separately.
pub fn operator_buttons(state: &SlotState) -> u8 {
    let mut op = 0;
    if state.buttons1 & extended_bits::TEST != 0 {
        op |= opbtn::TEST;
    }
    if state.buttons1 & extended_bits::SERVICE != 0 {
        op |= opbtn::SERVICE;
    }
    op
}

/// Turns a held coin signal into one press per rising edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinEdge {
    held: bool,
}

impl CoinEdge {
    /// Returns true only on a low-to-high transition.
    pub fn update(&mut self, pressed: bool) -> bool {
        let rising = pressed && !self.held;
        self.held = pressed;
        rising
    }

    pub fn reset(&mut self) {
        self.held = false;
    }
}

/// Buttons latched by the last poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSnapshot {
    pub opbtn: u8,
    pub player1: u16,
    pub player2: u16,
}

#[derive(Debug)]
pub struct Poller {
    coin: CoinEdge,
    last: PollSnapshot,
    no_device_log: LogGate,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

impl Poller {
    pub fn new() -> Self {
        Self {
            coin: CoinEdge::default(),
            last: PollSnapshot::default(),
            no_device_log: LogGate::new(Duration::from_secs(1)),
        }
    }

    /// Reads both players and returns the latched buttons.
    ///
    /// Only player 1's coin signal counts. Test and service come from either
    /// player.
    pub fn poll(&mut self, source: &impl InputSource, now: Instant) -> PollSnapshot {
        let mut snapshot = PollSnapshot::default();

        let p1 = source.state(Player::One);
        match &p1 {
            Some(state) => {
                snapshot.player1 = game_buttons(state);
                snapshot.opbtn |= operator_buttons(state);
                if self.coin.update(state.buttons1 & extended_bits::COIN != 0) {
                    snapshot.opbtn |= opbtn::COIN;
                }
            }
            None => self.coin.reset(),
        }

        let p2 = source.state(Player::Two);
        if let Some(state) = &p2 {
            snapshot.player2 = game_buttons(state);
            snapshot.opbtn |= operator_buttons(state);
        }

        if p1.is_none() && p2.is_none() {
            if self.no_device_log.should_log(now) {
                debug!("poll state: no device");
            }
        } else if snapshot != self.last {
            debug!(
                "poll state: op={:02X} p1={:04X} p2={:04X}",
                snapshot.opbtn, snapshot.player1, snapshot.player2
            );
            self.last = snapshot;
        }

        snapshot
    }
}
