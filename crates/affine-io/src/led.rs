//! LED fade engine.
//!
//! Callers submit eight `[R, G, B, speed]` groups per board. The engine
//! interpolates each group from its current colour to the new target on its
//! own tick loop and sends the full 24-byte colour command for a board
//! whenever any of its groups changed.

use crate::{AffineIoError, AffineIoResult};
use affine_protocol::{LED_GROUPS, LED_PAYLOAD_LEN, Player};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Length of one submitted LED command: eight `[R, G, B, speed]` groups.
pub const LED_COMMAND_LEN: usize = LED_GROUPS * 4;

/// Fade length for a speed value. Zero means jump immediately.
pub fn fade_duration(speed: u8) -> Duration {
    match speed {
        0 => Duration::ZERO,
        speed => Duration::from_millis((4095 / u64::from(speed)) * 8),
    }
}

/// Receives the colour commands produced by the fade engine.
pub trait LedSink: Send + Sync {
    fn send_button_leds(&self, player: Player, rgb: &[u8; LED_PAYLOAD_LEN]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedFade {
    pub start: [u8; 3],
    pub target: [u8; 3],
    pub current: [u8; 3],
    pub started: Instant,
    pub duration: Duration,
}

impl LedFade {
    fn idle(now: Instant) -> Self {
        Self {
            start: [0; 3],
            target: [0; 3],
            current: [0; 3],
            started: now,
            duration: Duration::ZERO,
        }
    }

    /// Colour at `now`. Truncates toward the start colour while fading.
    pub fn color_at(&self, now: Instant) -> [u8; 3] {
        let elapsed = now.saturating_duration_since(self.started);
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.target;
        }

        let total = self.duration.as_millis();
        let done = elapsed.as_millis();
        let mut out = [0u8; 3];
        for ((channel, &from), &to) in out.iter_mut().zip(&self.start).zip(&self.target) {
            let value = (u128::from(from) * (total - done) + u128::from(to) * done) / total;
            *channel = u8::try_from(value).unwrap_or(to);
        }
        out
    }
}

/// Fade state of both boards.
#[derive(Debug, Clone)]
pub struct LedFadeTable {
    boards: [[LedFade; LED_GROUPS]; 2],
    force_update: [bool; 2],
}

impl LedFadeTable {
    pub fn new(now: Instant) -> Self {
        Self {
            boards: [[LedFade::idle(now); LED_GROUPS]; 2],
            force_update: [false; 2],
        }
    }

    pub fn fades(&self, board: Player) -> &[LedFade; LED_GROUPS] {
        &self.boards[board.index()]
    }

    /// Starts a new fade for every group of `board`.
    ///
    /// Each group restarts from its current colour. If any group has speed 0
    /// the resulting colours are returned for sending right away.
    pub fn command(
        &mut self,
        board: Player,
        groups: &[u8; LED_COMMAND_LEN],
        now: Instant,
    ) -> Option<[u8; LED_PAYLOAD_LEN]> {
        let index = board.index();
        let mut immediate = false;

        for (fade, group) in self.boards[index].iter_mut().zip(groups.chunks_exact(4)) {
            let &[r, g, b, speed] = group else {
                continue;
            };
            fade.start = fade.current;
            fade.target = [r, g, b];
            fade.started = now;
            fade.duration = fade_duration(speed);
            if fade.duration.is_zero() {
                fade.current = fade.target;
                immediate = true;
            }
        }

        if immediate {
            self.force_update[index] = true;
            Some(self.payload(board))
        } else {
            None
        }
    }

    /// Advances every fade to `now` and returns the payload of each board
    /// whose colours changed or that has a forced update pending.
    pub fn tick(&mut self, now: Instant) -> [Option<[u8; LED_PAYLOAD_LEN]>; 2] {
        let mut out = [None; 2];
        for board in Player::ALL {
            let index = board.index();
            let mut changed = false;
            for fade in &mut self.boards[index] {
                let color = fade.color_at(now);
                if color != fade.current {
                    fade.current = color;
                    changed = true;
                }
            }
            if changed || self.force_update[index] {
                self.force_update[index] = false;
                out[index] = Some(self.payload(board));
            }
        }
        out
    }

    pub fn payload(&self, board: Player) -> [u8; LED_PAYLOAD_LEN] {
        let mut payload = [0u8; LED_PAYLOAD_LEN];
        for (chunk, fade) in payload.chunks_exact_mut(3).zip(&self.boards[board.index()]) {
            chunk.copy_from_slice(&fade.current);
        }
        payload
    }
}

/// Owns the fade table and the thread that ticks it.
pub struct LedFadeEngine {
    table: Arc<Mutex<LedFadeTable>>,
    sink: Arc<dyn LedSink>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl LedFadeEngine {
    /// Starts the tick thread.
    ///
    /// # Errors
    ///
    /// Returns [`AffineIoError::ThreadSpawn`] if the thread cannot be created.
    pub fn start(sink: Arc<dyn LedSink>, tick: Duration) -> AffineIoResult<Self> {
        let table = Arc::new(Mutex::new(LedFadeTable::new(Instant::now())));
        let stop = Arc::new(AtomicBool::new(false));

        let thread_table = Arc::clone(&table);
        let thread_sink = Arc::clone(&sink);
        let thread_stop = Arc::clone(&stop);
        let name = "affine-led-fade".to_string();
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || fade_loop(&thread_table, thread_sink.as_ref(), &thread_stop, tick))
            .map_err(|source| AffineIoError::ThreadSpawn { name, source })?;

        debug!("LED fade engine started, tick {:?}", tick);
        Ok(Self {
            table,
            sink,
            stop,
            thread: Some(thread),
        })
    }

    /// Accepts a command for `board`. Speed-0 groups are sent immediately.
    ///
    /// Sends happen under the table lock so frames reach a board in the order
    /// the table changed.
    pub fn submit(&self, board: Player, groups: &[u8; LED_COMMAND_LEN]) {
        let mut table = self.table.lock();
        if let Some(payload) = table.command(board, groups, Instant::now()) {
            self.sink.send_button_leds(board, &payload);
        }
    }

    /// Current colours of `board`.
    pub fn colors(&self, board: Player) -> [u8; LED_PAYLOAD_LEN] {
        self.table.lock().payload(board)
    }

    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            match thread.join() {
                Ok(()) => info!("LED fade thread stopped cleanly"),
                Err(_) => error!("LED fade thread panicked"),
            }
        }
    }
}

impl Drop for LedFadeEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn fade_loop(table: &Mutex<LedFadeTable>, sink: &dyn LedSink, stop: &AtomicBool, tick: Duration) {
    while !stop.load(Ordering::Acquire) {
        {
            let mut table = table.lock();
            let updates = table.tick(Instant::now());
            for (board, payload) in Player::ALL.into_iter().zip(updates) {
                if let Some(payload) = payload {
                    sink.send_button_leds(board, &payload);
                }
            }
        }
        thread::park_timeout(tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn solid(r: u8, g: u8, b: u8, speed: u8) -> [u8; LED_COMMAND_LEN] {
        let mut groups = [0u8; LED_COMMAND_LEN];
        for chunk in groups.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[r, g, b, speed]);
        }
        groups
    }

    #[test]
    fn test_fade_duration_formula() {
        assert_eq!(fade_duration(0), Duration::ZERO);
        assert_eq!(fade_duration(1), ms(4095 * 8));
        assert_eq!(fade_duration(255), ms(16 * 8));
        assert_eq!(fade_duration(100), ms(40 * 8));
    }

    #[test]
    fn test_immediate_command_returns_payload() {
        let t0 = Instant::now();
        let mut table = LedFadeTable::new(t0);
        let payload = table.command(Player::One, &solid(10, 20, 30, 0), t0);
        assert_eq!(payload.map(|p| p[..3].to_vec()), Some(vec![10, 20, 30]));

        // Forced resend on the next tick, then quiet.
        let [p1, p2] = table.tick(t0);
        assert!(p1.is_some());
        assert!(p2.is_none());
        assert_eq!(table.tick(t0 + ms(8)), [None, None]);
    }

    #[test]
    fn test_fade_interpolates_linearly() {
        let t0 = Instant::now();
        let mut table = LedFadeTable::new(t0);
        // speed 255 -> 128 ms
        assert!(table.command(Player::Two, &solid(200, 0, 100, 255), t0).is_none());

        let [_, half] = table.tick(t0 + ms(64));
        assert_eq!(half.map(|p| [p[0], p[1], p[2]]), Some([100, 0, 50]));

        let [_, done] = table.tick(t0 + ms(128));
        assert_eq!(done.map(|p| [p[0], p[1], p[2]]), Some([200, 0, 100]));
        assert_eq!(table.tick(t0 + ms(200)), [None, None]);
    }

    #[test]
    fn test_mid_fade_command_restarts_from_current() {
        let t0 = Instant::now();
        let mut table = LedFadeTable::new(t0);
        table.command(Player::One, &solid(255, 255, 255, 255), t0);
        table.tick(t0 + ms(64));
        let midway = table.fades(Player::One)[0].current;

        let mut groups = solid(255, 255, 255, 255);
        groups[4..8].copy_from_slice(&[0, 0, 0, 255]);
        table.command(Player::One, &groups, t0 + ms(64));

        let fades = table.fades(Player::One);
        assert_eq!(fades[1].start, midway);
        assert_eq!(fades[1].target, [0, 0, 0]);
        assert_eq!(fades[1].started, t0 + ms(64));
    }

    #[test]
    fn test_boards_are_independent() {
        let t0 = Instant::now();
        let mut table = LedFadeTable::new(t0);
        table.command(Player::Two, &solid(1, 2, 3, 0), t0);
        assert_eq!(table.payload(Player::One), [0; LED_PAYLOAD_LEN]);
        let [p1, p2] = table.tick(t0);
        assert!(p1.is_none());
        assert!(p2.is_some());
    }

    struct Recorder(Mutex<Vec<(Player, [u8; LED_PAYLOAD_LEN])>>);

    impl LedSink for Recorder {
        fn send_button_leds(&self, player: Player, rgb: &[u8; LED_PAYLOAD_LEN]) {
            self.0.lock().push((player, *rgb));
        }
    }

    #[test]
    fn test_engine_sends_immediate_and_stops() -> Result<(), Box<dyn std::error::Error>> {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut engine = LedFadeEngine::start(recorder.clone(), ms(8))?;

        engine.submit(Player::One, &solid(9, 8, 7, 0));
        assert_eq!(engine.colors(Player::One)[..3], [9, 8, 7]);
        engine.shutdown();

        let sent = recorder.0.lock();
        assert!(sent.first().is_some_and(|(player, rgb)| {
            *player == Player::One && rgb[..3] == [9, 8, 7]
        }));
        Ok(())
    }
    struct SlowRecorder(Mutex<Vec<[u8; LED_PAYLOAD_LEN]>>);

    impl LedSink for SlowRecorder {
        fn send_button_leds(&self, _player: Player, rgb: &[u8; LED_PAYLOAD_LEN]) {
            thread::sleep(Duration::from_micros(200));
            self.0.lock().push(*rgb);
        }
    }

    #[test]
    fn test_last_frame_sent_matches_table() -> Result<(), Box<dyn std::error::Error>> {
        let recorder = Arc::new(SlowRecorder(Mutex::new(Vec::new())));
        let mut engine = LedFadeEngine::start(recorder.clone(), ms(1))?;

        thread::scope(|scope| {
            for worker in 0..4u8 {
                let engine = &engine;
                scope.spawn(move || {
                    for step in 0..50u8 {
                        engine.submit(Player::One, &solid(worker, step, 0, 0));
                    }
                });
            }
        });
        thread::sleep(ms(20));
        engine.shutdown();

        let sent = recorder.0.lock();
        assert_eq!(sent.last(), Some(&engine.colors(Player::One)));
        Ok(())
    }
}
