//! Capture line formats.
//!
//! ```text
//! P1 TX CMD=14 LEN=24 DATA=FF 00 ...
//! P1 RX LEN=14 DATA=FF 01 0A ...
//! P1 RX REPEAT=37 DATA=FF 01 0A ...
//! P2 RAW LEN=5 DATA=0A FF 01 0A 00
//! TS=1712345678901 B=0 FF000010 FF000010 ...
//! ```

use affine_protocol::Player;

/// Upper-case hex bytes separated by single spaces.
pub fn hex_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn tx_line(player: Player, command: u8, payload: &[u8]) -> String {
    format!(
        "P{} TX CMD={command:02X} LEN={} DATA={}",
        player.number(),
        payload.len(),
        hex_bytes(payload)
    )
}

pub fn rx_line(player: Player, frame: &[u8]) -> String {
    format!(
        "P{} RX LEN={} DATA={}",
        player.number(),
        frame.len(),
        hex_bytes(frame)
    )
}

pub fn rx_repeat_line(player: Player, repeat: u32, frame: &[u8]) -> String {
    format!(
        "P{} RX REPEAT={repeat} DATA={}",
        player.number(),
        hex_bytes(frame)
    )
}

pub fn raw_line(player: Player, data: &[u8]) -> String {
    format!(
        "P{} RAW LEN={} DATA={}",
        player.number(),
        data.len(),
        hex_bytes(data)
    )
}

/// LED update line: up to 8 `RRGGBBSS` groups as submitted.
pub fn led_line(timestamp_ms: i64, board: u8, rgb: &[u8]) -> String {
    let groups = rgb
        .chunks(4)
        .take(affine_protocol::LED_GROUPS)
        .map(|group| group.iter().map(|b| format!("{b:02X}")).collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");
    format!("TS={timestamp_ms} B={board} {groups}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_hex_bytes() {
        assert_eq!(hex_bytes(&[]), "");
        assert_eq!(hex_bytes(&[0x0A]), "0A");
        assert_eq!(hex_bytes(&[0xFF, 0x01, 0xab]), "FF 01 AB");
    }

    #[test]
    fn test_tx_line() {
        assert_snapshot!(
            tx_line(Player::One, 0x16, &[0x10, 0x20, 0x30]),
            @"P1 TX CMD=16 LEN=3 DATA=10 20 30"
        );
        assert_snapshot!(tx_line(Player::Two, 0xF0, &[]), @"P2 TX CMD=F0 LEN=0 DATA=");
    }

    #[test]
    fn test_rx_lines() {
        let frame = [0x28, 1, 2, 3, 4, 5, 6, 7, 0x29];
        assert_snapshot!(
            rx_line(Player::Two, &frame),
            @"P2 RX LEN=9 DATA=28 01 02 03 04 05 06 07 29"
        );
        assert_snapshot!(
            rx_repeat_line(Player::Two, 12, &frame),
            @"P2 RX REPEAT=12 DATA=28 01 02 03 04 05 06 07 29"
        );
    }

    #[test]
    fn test_raw_line() {
        assert_snapshot!(raw_line(Player::One, &[0xFF, 0x01]), @"P1 RAW LEN=2 DATA=FF 01");
    }

    #[test]
    fn test_led_line() {
        let mut rgb = [0u8; 32];
        rgb[0..4].copy_from_slice(&[0xFF, 0x00, 0x80, 0x10]);
        rgb[28..32].copy_from_slice(&[0x01, 0x02, 0x03, 0x00]);
        assert_snapshot!(
            led_line(1_700_000_000_123, 0, &rgb),
            @"TS=1700000000123 B=0 FF008010 00000000 00000000 00000000 00000000 00000000 00000000 01020300"
        );
    }
}
