//! Serial transport for Affine IO boards
//!
//! Boards are located by USB vendor/product ID and opened at the fixed line
//! settings described by [`SerialSettings`]. The [`SerialPort`] and
//! [`PortProvider`] traits decouple the connection supervisor from the
//! operating system so it can be driven by the [`mock`] transport in tests.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod log_gate;
pub mod port_info;
pub mod settings;
pub mod system;
pub mod traits;

pub use error::{SerialError, SerialResult};
pub use log_gate::LogGate;
pub use port_info::PortInfo;
pub use settings::SerialSettings;
pub use system::SystemPortProvider;
pub use traits::*;
