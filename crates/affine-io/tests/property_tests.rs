//! Property-based tests for LED fades and the board info handshake.

use affine_io::{
    BoardInfoHandshake, HandshakeAction, LED_COMMAND_LEN, LedFadeTable, ProtocolTiming,
    fade_duration,
};
use affine_protocol::Player;
use proptest::prelude::*;
use std::time::{Duration, Instant};

fn player_strategy() -> impl Strategy<Value = Player> {
    prop_oneof![Just(Player::One), Just(Player::Two)]
}

fn solid(rgb: [u8; 3], speed: u8) -> [u8; LED_COMMAND_LEN] {
    let mut groups = [0u8; LED_COMMAND_LEN];
    for chunk in groups.chunks_exact_mut(4) {
        chunk.copy_from_slice(&[rgb[0], rgb[1], rgb[2], speed]);
    }
    groups
}

fn between(value: u8, a: u8, b: u8) -> bool {
    value >= a.min(b) && value <= a.max(b)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Speed 0 shows the target on the very next tick.
    #[test]
    fn prop_immediate_fade_lands_on_next_tick(
        board in player_strategy(),
        first in any::<[u8; 3]>(),
        second in any::<[u8; 3]>(),
    ) {
        let t0 = Instant::now();
        let mut table = LedFadeTable::new(t0);
        table.command(board, &solid(first, 0), t0);
        table.tick(t0);
        table.command(board, &solid(second, 0), t0);

        let updates = table.tick(t0);
        let payload = updates[board.index()]
            .ok_or_else(|| TestCaseError::fail("no forced update"))?;
        prop_assert_eq!([payload[0], payload[1], payload[2]], second);
    }

    /// Every channel stays between start and target while fading and equals
    /// the target once the duration has elapsed.
    #[test]
    fn prop_fade_is_bounded_and_lands_on_target(
        board in player_strategy(),
        start in any::<[u8; 3]>(),
        target in any::<[u8; 3]>(),
        speed in 1u8..=255,
        samples in proptest::collection::vec(0u64..5000, 1..20),
    ) {
        let t0 = Instant::now();
        let mut table = LedFadeTable::new(t0);
        table.command(board, &solid(start, 0), t0);
        table.tick(t0);
        table.command(board, &solid(target, speed), t0);

        let duration = fade_duration(speed);
        let mut offsets = samples;
        offsets.sort_unstable();

        for offset in offsets {
            let now = t0 + Duration::from_millis(offset);
            table.tick(now);
            let fade = table.fades(board)[0];
            for channel in 0..3 {
                prop_assert!(between(fade.current[channel], start[channel], target[channel]));
            }
            if Duration::from_millis(offset) >= duration {
                prop_assert_eq!(fade.current, target);
            }
        }

        table.tick(t0 + duration);
        prop_assert_eq!(table.fades(board)[0].current, target);
    }

    /// Commands for one board never disturb the other.
    #[test]
    fn prop_boards_are_isolated(
        board in player_strategy(),
        rgb in any::<[u8; 3]>(),
        speed in any::<u8>(),
    ) {
        let t0 = Instant::now();
        let mut table = LedFadeTable::new(t0);
        let other = if board == Player::One { Player::Two } else { Player::One };
        table.command(board, &solid(rgb, speed), t0);
        table.tick(t0 + Duration::from_secs(40));
        prop_assert_eq!(table.payload(other), [0u8; 24]);
    }

    /// Whatever the poll cadence, a silent board gets at most two requests,
    /// none before the settle delay, and exactly one give-up.
    #[test]
    fn prop_handshake_request_budget(
        gaps in proptest::collection::vec(1u64..400, 1..200),
    ) {
        let timing = ProtocolTiming::default();
        let t0 = Instant::now();
        let mut handshake = BoardInfoHandshake::new(&timing, t0);
        let mut offset = 0u64;
        let mut sends = Vec::new();
        let mut give_ups = 0;

        for gap in gaps {
            offset += gap;
            let now = t0 + Duration::from_millis(offset);
            match handshake.poll(now) {
                HandshakeAction::SendRequest => {
                    handshake.mark_requested(now);
                    sends.push(offset);
                }
                HandshakeAction::GiveUp => give_ups += 1,
                HandshakeAction::Idle => {}
            }
        }

        prop_assert!(sends.len() <= 2);
        prop_assert!(sends.iter().all(|&at| at >= timing.board_info_delay_ms));
        prop_assert!(sends.iter().all(|&at| at < timing.board_info_give_up_ms));
        if let [first, second] = sends[..] {
            prop_assert!(second - first >= timing.board_info_timeout_ms);
        }
        prop_assert!(give_ups <= 1);
        prop_assert_eq!(give_ups == 1, offset >= timing.board_info_give_up_ms);
    }
}
