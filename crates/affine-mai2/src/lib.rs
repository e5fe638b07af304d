//! mai2 front end for Affine IO boards
//!
//! Maps the core's per-player state onto the mai2 operator and game button
//! words, turns the held coin signal into one press per insertion and routes
//! touch and LED calls to the matching board.
//!
//! ```no_run
//! use affine_mai2::Mai2Io;
//!
//! # fn main() -> Result<(), affine_mai2::Mai2Error> {
//! let io = Mai2Io::init()?;
//! io.poll();
//! let (p1, p2) = io.gamebtns();
//! println!("op={:02X} p1={:04X} p2={:04X}", io.opbtns(), p1, p2);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod buttons;
pub mod config;
pub mod error;
pub mod io;
pub mod prelude;

pub use buttons::{
    CoinEdge, InputSource, PollSnapshot, Poller, game_buttons, gamebtn, opbtn, operator_buttons,
};
pub use config::{DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH, Mai2Config, config_path, ini_int};
pub use error::{Mai2Error, Mai2Result};
pub use io::{API_VERSION, Mai2Io, api_version, board_player};
