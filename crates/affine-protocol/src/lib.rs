//! Serial protocol implementation for Affine arcade IO boards
//!
//! Each Affine board enumerates as a USB CDC serial device and speaks a small
//! framed protocol at 115200 baud 8N1. This crate contains the pure, I/O-free
//! parts of that protocol:
//!
//! - Outbound command framing (`FF cmd len payload checksum`)
//! - A byte-at-a-time receive scanner that resynchronises on garbage
//! - Button cluster decoding and the two-byte shared state encoding
//! - Board info (firmware version) payload parsing
//!
//! ## Frame layouts
//!
//! | Frame            | Layout                                              |
//! |------------------|-----------------------------------------------------|
//! | Host command     | `FF cmd len payload[len] sum`                       |
//! | Telemetry        | `FF 01 xx b0 b1 b2 t0..t6 0A` (14 bytes)            |
//! | Legacy touch     | `28 t0..t6 29` (9 bytes)                            |
//! | Board info reply | `FF F0 len payload[len] sum`                        |

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod board_info;
pub mod error;
pub mod frame;
pub mod input;
pub mod prelude;
pub mod types;

pub use board_info::*;
pub use error::{ProtocolError, ProtocolResult};
pub use frame::*;
pub use input::*;
pub use types::*;

/// Affine vendor ID shared by both player boards.
pub const VENDOR_ID: u16 = 0xAFF1;
/// Product ID of the player 1 board.
pub const PRODUCT_ID_PLAYER_1: u16 = 0x52A5;
/// Product ID of the player 2 board.
pub const PRODUCT_ID_PLAYER_2: u16 = 0x52A6;

/// Line rate used by every Affine board.
pub const BAUD_RATE: u32 = 115_200;

/// Number of LED groups driven by one board (one per ring button).
pub const LED_GROUPS: usize = 8;
/// Payload size of a button or billboard LED command (8 × RGB).
pub const LED_PAYLOAD_LEN: usize = LED_GROUPS * 3;
/// Payload size of a PWM (cabinet FET) command.
pub const PWM_PAYLOAD_LEN: usize = 3;

/// Host-to-board command identifiers.
pub mod commands {
    /// Keep-alive, sent with an empty payload.
    pub const HEARTBEAT: u8 = 0x11;
    /// Sets the 8 ring-button LEDs.
    pub const SET_BUTTON_LEDS: u8 = 0x14;
    /// Sets the 8 billboard LEDs.
    pub const SET_BILLBOARD_LEDS: u8 = 0x15;
    /// Sets the 3 PWM outputs (body, side, billboard).
    pub const SET_PWM_LEDS: u8 = 0x16;
    /// Requests firmware identification. The reply reuses this id.
    pub const GET_BOARD_INFO: u8 = 0xF0;
}
