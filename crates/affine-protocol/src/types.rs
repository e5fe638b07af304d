//! Shared identity types.

use crate::{PRODUCT_ID_PLAYER_1, PRODUCT_ID_PLAYER_2, ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cabinet side a board is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// Both players, in slot order.
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    /// 1-based player number as used in log and capture lines.
    pub const fn number(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    /// 0-based slot index.
    pub const fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    /// Inverse of [`Player::index`].
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Player::One),
            1 => Some(Player::Two),
            _ => None,
        }
    }

    /// Parses a 1-based player number.
    pub fn from_number(number: u8) -> ProtocolResult<Self> {
        match number {
            1 => Ok(Player::One),
            2 => Ok(Player::Two),
            other => Err(ProtocolError::InvalidPlayer(other)),
        }
    }

    /// Factory USB product ID for this player's board.
    pub const fn default_product_id(self) -> u16 {
        match self {
            Player::One => PRODUCT_ID_PLAYER_1,
            Player::Two => PRODUCT_ID_PLAYER_2,
        }
    }
}

impl TryFrom<u8> for Player {
    type Error = ProtocolError;

    fn try_from(number: u8) -> ProtocolResult<Self> {
        Player::from_number(number)
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.number())
    }
}
