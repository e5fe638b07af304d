//! Snapshot tests for outbound frames and decoded replies.
//!
//! These lock in exact wire bytes so accidental framing changes show up as
//! a diff rather than a board that silently ignores commands.

use affine_protocol::{BoardInfo, FrameScanner, ProtocolError, commands, encode_command};
use insta::assert_snapshot;

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn test_snapshot_heartbeat() -> Result<(), ProtocolError> {
    let frame = encode_command(commands::HEARTBEAT, &[])?;
    assert_snapshot!(hex(&frame), @"FF 11 00 10");
    Ok(())
}

#[test]
fn test_snapshot_board_info_request() -> Result<(), ProtocolError> {
    let frame = encode_command(commands::GET_BOARD_INFO, &[])?;
    assert_snapshot!(hex(&frame), @"FF F0 00 EF");
    Ok(())
}

#[test]
fn test_snapshot_pwm_command() -> Result<(), ProtocolError> {
    let frame = encode_command(commands::SET_PWM_LEDS, &[0x10, 0x20, 0x30])?;
    assert_snapshot!(hex(&frame), @"FF 16 03 10 20 30 78");
    Ok(())
}

#[test]
fn test_snapshot_button_led_command() -> Result<(), ProtocolError> {
    let mut payload = [0u8; 24];
    payload[0] = 0xFF;
    payload[23] = 0x01;
    let frame = encode_command(commands::SET_BUTTON_LEDS, &payload)?;
    assert_snapshot!(
        hex(&frame),
        @"FF 14 18 FF 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 01 2B"
    );
    Ok(())
}

#[test]
fn test_snapshot_scanned_frames() {
    let stream = [
        0x00, 0xFF, 0x01, 0x0A, 0x03, 0x50, 0x09, 1, 2, 3, 4, 5, 6, 7, 0x0A, 0x28, 7, 6, 5, 4,
        3, 2, 1, 0x29, 0xFF, 0xF0, 0x04, 0x03, b'2', b'.', b'0', 0x00,
    ];
    let frames = FrameScanner::new().feed(&stream);
    let rendered = frames
        .iter()
        .map(|f| format!("{:?} <- {}", f.frame, hex(&f.raw)))
        .collect::<Vec<_>>()
        .join("\n");
    assert_snapshot!(rendered, @r"
    Telemetry { buttons: ButtonState { core: 83, extended: 9 }, touch: TouchState([1, 2, 3, 4, 5, 6, 7]) } <- FF 01 0A 03 50 09 01 02 03 04 05 06 07 0A
    LegacyTouch { touch: TouchState([7, 6, 5, 4, 3, 2, 1]) } <- 28 07 06 05 04 03 02 01 29
    BoardInfo { payload: [3, 50, 46, 48] } <- FF F0 04 03 32 2E 30 00
    ");
}

#[test]
fn test_snapshot_board_info_version() -> Result<(), ProtocolError> {
    let info = BoardInfo::parse(&[0x05, b'1', b'.', b'4', b'.', b'2', 0x00])?;
    assert_snapshot!(info.version, @"1.4.2");
    Ok(())
}
