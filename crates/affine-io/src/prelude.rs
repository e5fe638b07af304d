//! Commonly used items for front ends.

pub use crate::{
    AffineConfig, AffineIo, AffineIoError, AffineIoResult, LED_COMMAND_LEN, LedSink, SlotState,
    TouchObserver,
};
pub use affine_protocol::{LED_PAYLOAD_LEN, PWM_PAYLOAD_LEN, Player, TouchState};
