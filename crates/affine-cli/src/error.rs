//! Error types for affinectl

use affine_protocol::Player;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid colour '{0}', expected RRGGBB hex")]
    InvalidColor(String),

    #[error("Invalid player: {0}")]
    Player(#[from] affine_protocol::ProtocolError),

    #[error("{player} board did not connect within {waited_ms} ms")]
    NotConnected { player: Player, waited_ms: u64 },

    #[error("Serial error: {0}")]
    Serial(#[from] affine_serial::SerialError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            CliError::NotConnected {
                player: Player::Two,
                waited_ms: 5000
            }
            .to_string(),
            "P2 board did not connect within 5000 ms"
        );
        assert_eq!(
            CliError::InvalidColor("zz".to_string()).to_string(),
            "Invalid colour 'zz', expected RRGGBB hex"
        );
    }
}
