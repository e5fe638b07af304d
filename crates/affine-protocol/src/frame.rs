//! Command framing and the receive-side frame scanner.

use crate::commands;
use crate::input::{BUTTON_CLUSTER_LEN, ButtonState, TOUCH_LEN, TouchState};
use crate::{ProtocolError, ProtocolResult};

/// First byte of every host command and tagged board reply.
pub const SYNC: u8 = 0xFF;
/// Command byte of a telemetry frame.
pub const TELEMETRY_CMD: u8 = 0x01;
/// Terminator closing a telemetry frame.
pub const TELEMETRY_END: u8 = 0x0A;
/// Total length of a telemetry frame.
pub const TELEMETRY_FRAME_LEN: usize = 14;
/// Opening byte of a legacy touch frame (`(`).
pub const LEGACY_START: u8 = 0x28;
/// Closing byte of a legacy touch frame (`)`).
pub const LEGACY_END: u8 = 0x29;
/// Total length of a legacy touch frame.
pub const LEGACY_FRAME_LEN: usize = 9;

/// `sync + cmd + len`
pub const HEADER_LEN: usize = 3;
/// Largest payload accepted by [`encode_command`].
pub const MAX_PAYLOAD_LEN: usize = 61;
/// Capacity of the receive accumulator.
pub const RX_BUFFER_SIZE: usize = 128;

/// Wrapping 8-bit sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Builds a host command frame `FF cmd len payload checksum`.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] if `payload` is longer than
/// [`MAX_PAYLOAD_LEN`].
pub fn encode_command(command: u8, payload: &[u8]) -> ProtocolResult<Vec<u8>> {
    let len = u8::try_from(payload.len())
        .ok()
        .filter(|&len| usize::from(len) <= MAX_PAYLOAD_LEN)
        .ok_or(ProtocolError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        })?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + 1);
    frame.push(SYNC);
    frame.push(command);
    frame.push(len);
    frame.extend_from_slice(payload);
    frame.push(checksum(&frame));
    Ok(frame)
}

/// A decoded board-to-host frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxFrame {
    /// Button cluster plus touch bitmap.
    Telemetry {
        buttons: ButtonState,
        touch: TouchState,
    },
    /// Touch-only frame from older firmware.
    LegacyTouch { touch: TouchState },
    /// Reply to [`commands::GET_BOARD_INFO`]. The checksum is not verified.
    BoardInfo { payload: Vec<u8> },
}

impl RxFrame {
    pub fn touch(&self) -> Option<&TouchState> {
        match self {
            RxFrame::Telemetry { touch, .. } | RxFrame::LegacyTouch { touch } => Some(touch),
            RxFrame::BoardInfo { .. } => None,
        }
    }

    pub fn buttons(&self) -> Option<ButtonState> {
        match self {
            RxFrame::Telemetry { buttons, .. } => Some(*buttons),
            _ => None,
        }
    }
}

/// A frame together with the exact bytes it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFrame {
    pub frame: RxFrame,
    pub raw: Vec<u8>,
}

enum Scan {
    NeedMore,
    Discard,
    Frame(RxFrame, usize),
}

/// Byte-at-a-time receive accumulator.
///
/// Bytes that cannot start a recognised frame are dropped one at a time so the
/// scanner resynchronises on the next plausible start byte. If the buffer is
/// full when a byte arrives, everything buffered is discarded first.
#[derive(Debug, Clone)]
pub struct FrameScanner {
    buffer: Vec<u8>,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(RX_BUFFER_SIZE),
        }
    }

    /// Feeds `data` and returns every frame completed by it, in order.
    pub fn feed(&mut self, data: &[u8]) -> Vec<ScannedFrame> {
        let mut frames = Vec::new();
        for &byte in data {
            if self.buffer.len() >= RX_BUFFER_SIZE {
                self.buffer.clear();
            }
            self.buffer.push(byte);
            self.drain_frames(&mut frames);
        }
        frames
    }

    /// Bytes waiting for more input.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn drain_frames(&mut self, out: &mut Vec<ScannedFrame>) {
        loop {
            match classify(&self.buffer) {
                Scan::NeedMore => break,
                Scan::Discard => {
                    self.buffer.remove(0);
                }
                Scan::Frame(frame, len) => {
                    let raw: Vec<u8> = self.buffer.drain(..len).collect();
                    out.push(ScannedFrame { frame, raw });
                }
            }
        }
    }
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(buf: &[u8]) -> Scan {
    match buf.first() {
        None => Scan::NeedMore,
        Some(&SYNC) => classify_tagged(buf),
        Some(&LEGACY_START) => classify_legacy(buf),
        Some(_) => Scan::Discard,
    }
}

fn classify_tagged(buf: &[u8]) -> Scan {
    let (Some(&command), Some(&len)) = (buf.get(1), buf.get(2)) else {
        return Scan::NeedMore;
    };

    match command {
        TELEMETRY_CMD => {
            let Some(frame) = buf.first_chunk::<TELEMETRY_FRAME_LEN>() else {
                return Scan::NeedMore;
            };
            let [_, _, _, b0, b1, b2, touch @ .., end] = *frame;
            if end != TELEMETRY_END {
                return Scan::Discard;
            }
            let cluster: [u8; BUTTON_CLUSTER_LEN] = [b0, b1, b2];
            let touch: [u8; TOUCH_LEN] = touch;
            Scan::Frame(
                RxFrame::Telemetry {
                    buttons: ButtonState::from_cluster(cluster),
                    touch: TouchState(touch),
                },
                TELEMETRY_FRAME_LEN,
            )
        }
        commands::GET_BOARD_INFO => {
            let payload_end = HEADER_LEN + usize::from(len);
            let total = payload_end + 1;
            if total > RX_BUFFER_SIZE {
                return Scan::Discard;
            }
            match buf.get(HEADER_LEN..payload_end) {
                Some(payload) if buf.len() >= total => Scan::Frame(
                    RxFrame::BoardInfo {
                        payload: payload.to_vec(),
                    },
                    total,
                ),
                _ => Scan::NeedMore,
            }
        }
        _ => Scan::Discard,
    }
}

fn classify_legacy(buf: &[u8]) -> Scan {
    let Some(frame) = buf.first_chunk::<LEGACY_FRAME_LEN>() else {
        return Scan::NeedMore;
    };
    let [_, touch @ .., end] = *frame;
    if end != LEGACY_END {
        return Scan::Discard;
    }
    let touch: [u8; TOUCH_LEN] = touch;
    Scan::Frame(
        RxFrame::LegacyTouch {
            touch: TouchState(touch),
        },
        LEGACY_FRAME_LEN,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telemetry(cluster: [u8; 3], touch: [u8; 7]) -> Vec<u8> {
        let mut frame = vec![SYNC, TELEMETRY_CMD, 0x0A];
        frame.extend_from_slice(&cluster);
        frame.extend_from_slice(&touch);
        frame.push(TELEMETRY_END);
        frame
    }

    #[test]
    fn test_encode_heartbeat() -> ProtocolResult<()> {
        assert_eq!(
            encode_command(commands::HEARTBEAT, &[])?,
            vec![0xFF, 0x11, 0x00, 0x10]
        );
        Ok(())
    }

    #[test]
    fn test_encode_board_info_request() -> ProtocolResult<()> {
        assert_eq!(
            encode_command(commands::GET_BOARD_INFO, &[])?,
            vec![0xFF, 0xF0, 0x00, 0xEF]
        );
        Ok(())
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let payload = [0u8; MAX_PAYLOAD_LEN + 1];
        assert_eq!(
            encode_command(commands::SET_BUTTON_LEDS, &payload),
            Err(ProtocolError::PayloadTooLarge { len: 62, max: 61 })
        );
    }

    #[test]
    fn test_encode_accepts_max_payload() -> ProtocolResult<()> {
        let frame = encode_command(commands::SET_BUTTON_LEDS, &[1u8; MAX_PAYLOAD_LEN])?;
        assert_eq!(frame.len(), HEADER_LEN + MAX_PAYLOAD_LEN + 1);
        assert_eq!(frame[2], 61);
        Ok(())
    }

    #[test]
    fn test_scan_telemetry() {
        let mut scanner = FrameScanner::new();
        let frames = scanner.feed(&telemetry([0x0F, 0xF0, 0x01], [1, 2, 3, 4, 5, 6, 7]));
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].frame,
            RxFrame::Telemetry {
                buttons: ButtonState::new(0xFF, 0x01),
                touch: TouchState([1, 2, 3, 4, 5, 6, 7]),
            }
        );
        assert_eq!(frames[0].raw.len(), TELEMETRY_FRAME_LEN);
        assert!(scanner.is_empty());
    }

    #[test]
    fn test_scan_telemetry_any_length_byte() {
        let mut frame = telemetry([0, 0, 0], [0; 7]);
        frame[2] = 0x33;
        let frames = FrameScanner::new().feed(&frame);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_scan_legacy_touch() {
        let frames = FrameScanner::new().feed(&[0x28, 9, 8, 7, 6, 5, 4, 3, 0x29]);
        assert_eq!(
            frames[0].frame,
            RxFrame::LegacyTouch {
                touch: TouchState([9, 8, 7, 6, 5, 4, 3])
            }
        );
        assert_eq!(frames[0].frame.buttons(), None);
    }

    #[test]
    fn test_scan_board_info_ignores_checksum() {
        let frames = FrameScanner::new().feed(&[0xFF, 0xF0, 0x03, 0x02, b'v', b'1', 0x00]);
        assert_eq!(
            frames[0].frame,
            RxFrame::BoardInfo {
                payload: vec![0x02, b'v', b'1']
            }
        );
    }

    #[test]
    fn test_scan_discards_leading_garbage() {
        let mut data = vec![0x00, 0x12, 0x29, 0xFF, 0x55];
        data.extend(telemetry([0, 0, 0], [0; 7]));
        let mut scanner = FrameScanner::new();
        let frames = scanner.feed(&data);
        assert_eq!(frames.len(), 1);
        assert!(scanner.is_empty());
    }

    #[test]
    fn test_scan_bad_terminator_resyncs() {
        let mut bad = telemetry([0, 0, 0], [0; 7]);
        bad[13] = 0x0B;
        bad.extend(telemetry([0x01, 0, 0], [0; 7]));
        let frames = FrameScanner::new().feed(&bad);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame.buttons(), Some(ButtonState::new(0x01, 0)));
    }

    #[test]
    fn test_scan_oversized_board_info_is_discarded() {
        let mut scanner = FrameScanner::new();
        let frames = scanner.feed(&[0xFF, 0xF0, 0xFF]);
        assert!(frames.is_empty());
        assert!(scanner.is_empty());
    }

    #[test]
    fn test_scan_waits_for_partial_frames() {
        let mut scanner = FrameScanner::new();
        assert!(scanner.feed(&[0xFF, 0xF0, 0x04, 0x01]).is_empty());
        assert_eq!(scanner.len(), 4);
        assert!(scanner.feed(&[0x28, 1, 2]).is_empty());
    }

    #[test]
    fn test_scan_largest_board_info_fills_buffer() {
        let mut scanner = FrameScanner::new();
        let mut data = vec![0xFF, 0xF0, 124];
        data.resize(RX_BUFFER_SIZE - 1, 0);
        assert!(scanner.feed(&data).is_empty());
        assert_eq!(scanner.len(), RX_BUFFER_SIZE - 1);
        let frames = scanner.feed(&[0x00]);
        assert_eq!(frames.len(), 1);
        assert!(scanner.is_empty());
    }
}
