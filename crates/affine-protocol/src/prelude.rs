//! Commonly used protocol items.

pub use crate::board_info::BoardInfo;
pub use crate::error::{ProtocolError, ProtocolResult};
pub use crate::frame::{FrameScanner, RxFrame, ScannedFrame, encode_command};
pub use crate::input::{ButtonState, ExtendedSignals, PublishedState, TouchState};
pub use crate::types::Player;
pub use crate::{LED_PAYLOAD_LEN, PWM_PAYLOAD_LEN, VENDOR_ID, commands};
