//! Connection core for Affine arcade IO boards
//!
//! [`AffineIo`] owns one supervisor thread per player slot. Each supervisor
//! discovers its board by USB ID, opens it, runs the board info handshake,
//! keeps the link alive with heartbeats and decodes telemetry into
//! per-slot state. Decoded buttons are mirrored into a two-byte shared region
//! so processes without their own serial handle can read them.
//!
//! A separate thread runs the LED fade engine, which interpolates button LED
//! colours and writes them through the same per-slot write lock as the
//! supervisor's own traffic.
//!
//! Link failures never reach callers. A slot without a board reports idle
//! input and the supervisor keeps retrying.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod handshake;
pub mod io;
pub mod led;
pub mod prelude;
pub mod publisher;
pub mod region;
mod slot;
mod supervisor;

pub use config::{AffineConfig, ProtocolTiming, SlotConfig};
pub use error::{AffineIoError, AffineIoResult};
pub use handshake::{BoardInfoHandshake, HandshakeAction, HandshakeState, ReplyOutcome};
pub use io::{AffineIo, AffineIoBuilder, RegionFactory, SlotState};
pub use led::{LED_COMMAND_LEN, LedFade, LedFadeEngine, LedFadeTable, LedSink, fade_duration};
pub use publisher::StatePublisher;
pub use region::{LocalRegion, SharedRegion, ShmemRegion};
pub use slot::TouchObserver;
