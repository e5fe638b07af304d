//! Commonly used items for hosts.

pub use crate::{Mai2Config, Mai2Error, Mai2Io, Mai2Result, gamebtn, opbtn};
pub use affine_io::TouchObserver;
pub use affine_protocol::{Player, TouchState};
