//! Diagnostic capture for Affine IO
//!
//! Three independent append-only text logs, each switched on by an
//! environment flag (see [`CaptureConfig::from_env`]):
//!
//! - traffic: outbound commands (`TX`) and inbound frames (`RX`), with runs of
//!   identical frames folded into a single `REPEAT=` line
//! - raw: every chunk returned by a serial read
//! - LED: colour updates as submitted by the game, with a millisecond timestamp
//!
//! Capture is best-effort. Write failures are logged at debug level and never
//! reach the IO path.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod line;
pub mod recorder;
pub mod sink;

pub use config::{CaptureConfig, ENV_CAPTURE, ENV_CAPTURE_GS, ENV_CAPTURE_RAW, flag_enabled};
pub use error::{CaptureError, CaptureResult};
pub use recorder::Capture;
pub use sink::CaptureSink;
