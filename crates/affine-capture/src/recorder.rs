//! Shared capture recorder used by the IO threads.

use crate::line;
use crate::{CaptureConfig, CaptureResult, CaptureSink};
use affine_protocol::{Player, commands};
use parking_lot::Mutex;
use tracing::{debug, info};

/// Last RX frame seen for one player and how many times it repeated since
/// it was written.
#[derive(Debug, Default)]
struct RxRun {
    last: Option<Vec<u8>>,
    repeat: u32,
}

#[derive(Debug)]
struct TrafficLog {
    sink: CaptureSink,
    runs: [RxRun; 2],
}

impl TrafficLog {
    fn write_pending_repeat(&mut self, player: Player) {
        let run = &mut self.runs[player.index()];
        if run.repeat == 0 {
            return;
        }
        if let Some(last) = &run.last {
            let text = line::rx_repeat_line(player, run.repeat, last);
            write_or_log(&mut self.sink, &text);
        }
        run.repeat = 0;
    }
}

fn write_or_log(sink: &mut CaptureSink, text: &str) {
    if let Err(e) = sink.write_line(text) {
        debug!("Capture write failed: {}", e);
    }
}

/// Thread-safe set of capture sinks. Disabled sinks cost one branch.
#[derive(Debug, Default)]
pub struct Capture {
    traffic: Option<Mutex<TrafficLog>>,
    raw: Option<Mutex<CaptureSink>>,
    led: Option<Mutex<CaptureSink>>,
}

impl Capture {
    /// A recorder with every sink off.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Opens the files for every sink enabled in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if any enabled sink's file cannot be opened.
    pub fn open(config: &CaptureConfig) -> CaptureResult<Self> {
        let traffic = config
            .traffic
            .then(|| CaptureSink::open(&config.traffic_path()))
            .transpose()?;
        let raw = config
            .raw
            .then(|| CaptureSink::open(&config.raw_path()))
            .transpose()?;
        let led = config
            .led
            .then(|| CaptureSink::open(&config.led_path()))
            .transpose()?;

        if config.traffic {
            info!("Traffic capture enabled -> {}", config.traffic_path().display());
        }
        if config.raw {
            info!("Raw capture enabled -> {}", config.raw_path().display());
        }
        if config.led {
            info!("LED capture enabled -> {}", config.led_path().display());
        }
        Ok(Self::from_sinks(traffic, raw, led))
    }

    pub fn from_sinks(
        traffic: Option<CaptureSink>,
        raw: Option<CaptureSink>,
        led: Option<CaptureSink>,
    ) -> Self {
        Self {
            traffic: traffic.map(|sink| {
                Mutex::new(TrafficLog {
                    sink,
                    runs: Default::default(),
                })
            }),
            raw: raw.map(Mutex::new),
            led: led.map(Mutex::new),
        }
    }

    pub fn traffic_enabled(&self) -> bool {
        self.traffic.is_some()
    }

    pub fn raw_enabled(&self) -> bool {
        self.raw.is_some()
    }

    pub fn led_enabled(&self) -> bool {
        self.led.is_some()
    }

    /// Records an outbound command. Heartbeats are skipped.
    pub fn record_tx(&self, player: Player, command: u8, payload: &[u8]) {
        if command == commands::HEARTBEAT {
            return;
        }
        if let Some(traffic) = &self.traffic {
            let text = line::tx_line(player, command, payload);
            write_or_log(&mut traffic.lock().sink, &text);
        }
    }

    /// Records a complete inbound frame.
    ///
    /// A frame identical to the previous one for the same player only bumps a
    /// counter. The count is written as a `REPEAT=` line just before the next
    /// distinct frame.
    pub fn record_rx(&self, player: Player, frame: &[u8]) {
        let Some(traffic) = &self.traffic else {
            return;
        };
        if frame.is_empty() {
            return;
        }

        let mut log = traffic.lock();
        let run = &mut log.runs[player.index()];
        if run.last.as_deref() == Some(frame) {
            run.repeat = run.repeat.saturating_add(1);
            return;
        }

        log.write_pending_repeat(player);
        let text = line::rx_line(player, frame);
        write_or_log(&mut log.sink, &text);
        log.runs[player.index()].last = Some(frame.to_vec());
    }

    /// Records the bytes returned by one serial read.
    pub fn record_raw(&self, player: Player, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if let Some(raw) = &self.raw {
            let text = line::raw_line(player, data);
            write_or_log(&mut raw.lock(), &text);
        }
    }

    /// Records an LED colour update stamped with wall-clock milliseconds.
    pub fn record_led(&self, board: u8, rgb: &[u8]) {
        if let Some(led) = &self.led {
            let text = line::led_line(chrono::Utc::now().timestamp_millis(), board, rgb);
            write_or_log(&mut led.lock(), &text);
        }
    }

    /// Writes any pending `REPEAT=` counts.
    pub fn flush_repeats(&self) {
        if let Some(traffic) = &self.traffic {
            let mut log = traffic.lock();
            for player in Player::ALL {
                log.write_pending_repeat(player);
            }
        }
    }
}
