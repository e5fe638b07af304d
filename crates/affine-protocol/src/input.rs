//! Button cluster decoding and the published two-byte state encoding.

use crate::Player;
use serde::{Deserialize, Serialize};

/// Bytes in the button cluster of a telemetry frame.
pub const BUTTON_CLUSTER_LEN: usize = 3;
/// Bytes of raw touch bitmap carried by telemetry and legacy touch frames.
pub const TOUCH_LEN: usize = 7;
/// Mask applied to the third cluster byte.
pub const EXTENDED_MASK: u8 = 0x3F;

/// Bit positions inside the decoded extended field.
pub mod extended_bits {
    pub const SELECT: u8 = 1 << 0;
    pub const TEST: u8 = 1 << 1;
    pub const SERVICE: u8 = 1 << 2;
    pub const COIN: u8 = 1 << 3;
    /// The four signals carried through the shared state byte.
    pub const SIGNALS: u8 = SELECT | TEST | SERVICE | COIN;
}

/// Bit positions inside the published io status byte.
pub mod io_status_bits {
    pub const TEST: u8 = 0x01;
    pub const SERVICE: u8 = 0x02;
    pub const COIN: u8 = 0x04;
    pub const SELECT_PLAYER_1: u8 = 0x10;
    pub const SELECT_PLAYER_2: u8 = 0x20;
}

/// Decoded button state of one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct ButtonState {
    /// Eight ring buttons, bit N = button N+1.
    pub core: u8,
    /// Cabinet signals, see [`extended_bits`].
    pub extended: u8,
}

impl ButtonState {
    pub const fn new(core: u8, extended: u8) -> Self {
        Self { core, extended }
    }

    /// Decodes the 3-byte cluster of a telemetry frame.
    ///
    /// The core field is the low nibble of byte 0 joined with the high nibble
    /// of byte 1. Byte 2 is masked to six bits.
    pub const fn from_cluster(cluster: [u8; BUTTON_CLUSTER_LEN]) -> Self {
        let [b0, b1, b2] = cluster;
        Self {
            core: (b0 & 0x0F) | (b1 & 0xF0),
            extended: b2 & EXTENDED_MASK,
        }
    }

    /// Returns true if ring button `index` (0..8) is held.
    pub fn is_core_pressed(&self, index: u8) -> bool {
        index < 8 && (self.core >> index) & 1 != 0
    }

    pub fn signals(&self) -> ExtendedSignals {
        ExtendedSignals::from_bits(self.extended)
    }

    pub fn is_idle(&self) -> bool {
        self.core == 0 && self.extended == 0
    }
}

/// Named view over the extended field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct ExtendedSignals {
    pub select: bool,
    pub test: bool,
    pub service: bool,
    pub coin: bool,
}

impl ExtendedSignals {
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            select: bits & extended_bits::SELECT != 0,
            test: bits & extended_bits::TEST != 0,
            service: bits & extended_bits::SERVICE != 0,
            coin: bits & extended_bits::COIN != 0,
        }
    }

    pub const fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.select {
            bits |= extended_bits::SELECT;
        }
        if self.test {
            bits |= extended_bits::TEST;
        }
        if self.service {
            bits |= extended_bits::SERVICE;
        }
        if self.coin {
            bits |= extended_bits::COIN;
        }
        bits
    }
}

/// Raw touch bitmap as delivered by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct TouchState(pub [u8; TOUCH_LEN]);

impl TouchState {
    pub const IDLE: TouchState = TouchState([0; TOUCH_LEN]);

    pub fn as_bytes(&self) -> &[u8; TOUCH_LEN] {
        &self.0
    }

    pub fn is_idle(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl From<[u8; TOUCH_LEN]> for TouchState {
    fn from(bytes: [u8; TOUCH_LEN]) -> Self {
        Self(bytes)
    }
}

const fn select_bit(player: Player) -> u8 {
    match player {
        Player::One => io_status_bits::SELECT_PLAYER_1,
        Player::Two => io_status_bits::SELECT_PLAYER_2,
    }
}

/// Packs the four extended signals into the published io status byte.
///
/// Spare extended bits are dropped. The select bit position depends on
/// `player`, so [`decode_io_status`] must be called with the same player.
pub const fn encode_io_status(player: Player, extended: u8) -> u8 {
    let mut status = 0;
    if extended & extended_bits::TEST != 0 {
        status |= io_status_bits::TEST;
    }
    if extended & extended_bits::SERVICE != 0 {
        status |= io_status_bits::SERVICE;
    }
    if extended & extended_bits::COIN != 0 {
        status |= io_status_bits::COIN;
    }
    if extended & extended_bits::SELECT != 0 {
        status |= select_bit(player);
    }
    status
}

/// Inverse of [`encode_io_status`] for the same player.
pub const fn decode_io_status(player: Player, status: u8) -> u8 {
    let mut extended = 0;
    if status & io_status_bits::TEST != 0 {
        extended |= extended_bits::TEST;
    }
    if status & io_status_bits::SERVICE != 0 {
        extended |= extended_bits::SERVICE;
    }
    if status & io_status_bits::COIN != 0 {
        extended |= extended_bits::COIN;
    }
    if status & select_bit(player) != 0 {
        extended |= extended_bits::SELECT;
    }
    extended
}

/// Two-byte record stored in a player's shared region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishedState {
    pub buttons0: u8,
    pub io_status: u8,
}

impl PublishedState {
    pub const SIZE: usize = 2;

    pub const fn encode(player: Player, buttons: ButtonState) -> Self {
        Self {
            buttons0: buttons.core,
            io_status: encode_io_status(player, buttons.extended),
        }
    }

    pub const fn decode(&self, player: Player) -> ButtonState {
        ButtonState {
            core: self.buttons0,
            extended: decode_io_status(player, self.io_status),
        }
    }

    pub const fn to_bytes(self) -> [u8; Self::SIZE] {
        [self.buttons0, self.io_status]
    }

    pub const fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        let [buttons0, io_status] = bytes;
        Self {
            buttons0,
            io_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_decode_takes_nibbles() {
        let state = ButtonState::from_cluster([0xAB, 0xCD, 0xFF]);
        assert_eq!(state.core, 0xCB);
        assert_eq!(state.extended, 0x3F);
    }

    #[test]
    fn test_cluster_decode_keeps_high_nibble_of_second_byte() {
        // Buttons 0, 2, 6 and 7 held, select raised.
        let state = ButtonState::from_cluster([0b0000_0101, 0b1100_0000, 0b0010_0000]);
        assert_eq!(state, ButtonState::new(0b1100_0101, 0b0010_0000));
        assert!(state.is_core_pressed(7));
    }

    #[test]
    fn test_core_pressed() {
        let state = ButtonState::new(0b1000_0001, 0);
        assert!(state.is_core_pressed(0));
        assert!(state.is_core_pressed(7));
        assert!(!state.is_core_pressed(1));
        assert!(!state.is_core_pressed(8));
    }

    #[test]
    fn test_signals_view() {
        let signals = ButtonState::new(0, extended_bits::SELECT | extended_bits::COIN).signals();
        assert!(signals.select);
        assert!(signals.coin);
        assert!(!signals.test);
        assert!(!signals.service);
        assert_eq!(signals.bits(), 0x09);
    }

    #[test]
    fn test_io_status_select_bit_per_player() {
        assert_eq!(encode_io_status(Player::One, extended_bits::SELECT), 0x10);
        assert_eq!(encode_io_status(Player::Two, extended_bits::SELECT), 0x20);
        assert_eq!(decode_io_status(Player::One, 0x20), 0);
        assert_eq!(decode_io_status(Player::Two, 0x10), 0);
    }

    #[test]
    fn test_io_status_shared_bits() {
        let ext = extended_bits::TEST | extended_bits::SERVICE | extended_bits::COIN;
        assert_eq!(encode_io_status(Player::One, ext), 0x07);
        assert_eq!(encode_io_status(Player::Two, ext), 0x07);
    }

    #[test]
    fn test_io_status_drops_spare_bits() {
        assert_eq!(encode_io_status(Player::One, 0x30), 0);
    }

    #[test]
    fn test_published_state_bytes() {
        let state = PublishedState::encode(Player::Two, ButtonState::new(0x5A, 0x01));
        assert_eq!(state.to_bytes(), [0x5A, 0x20]);
        assert_eq!(
            PublishedState::from_bytes([0x5A, 0x20]).decode(Player::Two),
            ButtonState::new(0x5A, 0x01)
        );
    }

    #[test]
    fn test_touch_idle() {
        assert!(TouchState::IDLE.is_idle());
        assert!(!TouchState([0, 0, 0, 1, 0, 0, 0]).is_idle());
    }
}
