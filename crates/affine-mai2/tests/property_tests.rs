//! Property-based tests for button mapping and coin edge detection.

use affine_io::SlotState;
use affine_mai2::{CoinEdge, InputSource, Poller, game_buttons, gamebtn, opbtn};
use affine_protocol::{Player, extended_bits};
use proptest::prelude::*;
use std::cell::Cell;
use std::time::Instant;

struct OnePlayer {
    state: Cell<Option<SlotState>>,
}

impl InputSource for OnePlayer {
    fn state(&self, player: Player) -> Option<SlotState> {
        match player {
            Player::One => self.state.get(),
            Player::Two => None,
        }
    }
}

fn coin_state(pressed: bool) -> SlotState {
    SlotState {
        present: true,
        buttons1: if pressed { extended_bits::COIN } else { 0 },
        ..SlotState::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// The number of reported coins equals the number of rising edges.
    #[test]
    fn prop_one_coin_per_rising_edge(signal in proptest::collection::vec(any::<bool>(), 0..200)) {
        let mut edge = CoinEdge::default();
        let reported = signal.iter().filter(|&&pressed| edge.update(pressed)).count();

        let mut previous = false;
        let mut rising = 0;
        for &pressed in &signal {
            if pressed && !previous {
                rising += 1;
            }
            previous = pressed;
        }
        prop_assert_eq!(reported, rising);
    }

    /// A coin is never reported on two consecutive polls, and a missing
    /// player 1 re-arms the edge.
    #[test]
    fn prop_poller_coin_never_repeats(
        samples in proptest::collection::vec(prop::option::of(any::<bool>()), 1..100),
    ) {
        let source = OnePlayer { state: Cell::new(None) };
        let mut poller = Poller::new();
        let now = Instant::now();
        let mut last_coin = false;
        let mut armed = true;

        for sample in samples {
            source.state.set(sample.map(coin_state));
            let coin = poller.poll(&source, now).opbtn & opbtn::COIN != 0;
            prop_assert!(!(coin && last_coin));
            prop_assert_eq!(coin, sample == Some(true) && armed);
            armed = sample != Some(true);
            last_coin = coin;
        }
    }

    /// Ring buttons pass through; select lands on bit 8 and nothing else does.
    #[test]
    fn prop_game_buttons_mapping(buttons0 in any::<u8>(), buttons1 in 0u8..0x40) {
        let state = SlotState { present: true, buttons0, buttons1, touch: [0; 7] };
        let word = game_buttons(&state);
        prop_assert_eq!(word & 0xFF, u16::from(buttons0));
        prop_assert_eq!(word & gamebtn::SELECT != 0, buttons1 & extended_bits::SELECT != 0);
        prop_assert_eq!(word & !0x1FF, 0);
    }
}
