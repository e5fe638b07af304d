//! Connection supervisor.
//!
//! One [`SlotWorker`] per slot runs on its own thread. Each call to
//! [`SlotWorker::step`] performs one pass of the loop: enable gate, discovery
//! and open, board info handshake, heartbeat and one bounded read. Timing is
//! driven entirely by the `now` argument so the protocol timeline can be
//! tested without sleeping.

use crate::ProtocolTiming;
use crate::handshake::{BoardInfoHandshake, HandshakeAction, ReplyOutcome};
use crate::slot::SlotShared;
use affine_protocol::{FrameScanner, RxFrame, commands};
use affine_serial::{LogGate, PortProvider, SerialPort, SerialResult, SerialSettings};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    /// Run the next step immediately. The read inside the step already
    /// blocked for up to the port's read timeout.
    Continue,
    Sleep(Duration),
}

pub(crate) struct SlotWorker {
    shared: Arc<SlotShared>,
    provider: Arc<dyn PortProvider>,
    vendor_id: u16,
    product_id: u16,
    settings: SerialSettings,
    timing: ProtocolTiming,
    reader: Option<Box<dyn SerialPort>>,
    scanner: FrameScanner,
    handshake: BoardInfoHandshake,
    last_heartbeat: Instant,
    discovery_log: LogGate,
    read_buf: Vec<u8>,
}

impl SlotWorker {
    pub fn new(
        shared: Arc<SlotShared>,
        provider: Arc<dyn PortProvider>,
        vendor_id: u16,
        product_id: u16,
        settings: SerialSettings,
        timing: ProtocolTiming,
    ) -> Self {
        let now = Instant::now();
        Self {
            read_buf: vec![0; settings.read_chunk.max(1)],
            handshake: BoardInfoHandshake::new(&timing, now),
            discovery_log: LogGate::new(timing.discovery_log_interval()),
            shared,
            provider,
            vendor_id,
            product_id,
            settings,
            timing,
            reader: None,
            scanner: FrameScanner::new(),
            last_heartbeat: now,
        }
    }

    pub fn player(&self) -> affine_protocol::Player {
        self.shared.player()
    }

    /// Thread body. Returns once a stop has been requested.
    pub fn run(mut self) {
        let player = self.shared.player();
        debug!("{} supervisor started", player);

        while !self.shared.should_stop() {
            match self.step(Instant::now()) {
                StepOutcome::Continue => {}
                StepOutcome::Sleep(duration) => thread::park_timeout(duration),
            }
        }

        if self.reader.is_some() || self.shared.is_connected() {
            self.disconnect();
            info!("{} port closed", player);
        }
        debug!("{} supervisor stopped", player);
    }

    pub fn step(&mut self, now: Instant) -> StepOutcome {
        let rescan = StepOutcome::Sleep(self.timing.rescan_interval());

        if !self.shared.is_enabled() {
            if self.reader.is_some() || self.shared.is_connected() {
                self.disconnect();
                info!("{} disabled, port closed", self.shared.player());
            }
            return rescan;
        }

        if self.reader.is_none() || !self.shared.is_connected() {
            if self.reader.take().is_some() {
                self.scanner.reset();
            }
            if let Err(e) = self.connect(now) {
                if self.discovery_log.should_log(now) {
                    let suppressed = self.discovery_log.take_suppressed();
                    warn!(
                        player = %self.shared.player(),
                        suppressed,
                        "Board not available: {}",
                        e
                    );
                }
                return rescan;
            }
        }

        self.service_handshake(now);

        if !self.shared.is_connected() {
            // A write in the handshake or heartbeat failed.
            self.reader = None;
            self.scanner.reset();
            return rescan;
        }

        self.read_once(rescan)
    }

    fn connect(&mut self, now: Instant) -> SerialResult<()> {
        let port = self.provider.find(self.vendor_id, self.product_id)?;
        let reader = self.provider.open(&port, &self.settings)?;
        let writer = reader.try_clone()?;

        self.shared.attach(writer);
        self.reader = Some(reader);
        self.scanner.reset();
        self.handshake = BoardInfoHandshake::new(&self.timing, now);
        self.last_heartbeat = now;
        self.discovery_log.reset();

        info!("Connected {}: {}", self.shared.player(), port.display_name());
        Ok(())
    }

    fn disconnect(&mut self) {
        self.reader = None;
        self.scanner.reset();
        self.shared.detach();
    }

    fn service_handshake(&mut self, now: Instant) {
        let player = self.shared.player();
        match self.handshake.poll(now) {
            HandshakeAction::SendRequest => {
                if self.shared.send_command(commands::GET_BOARD_INFO, &[]) {
                    debug!("{} board info requested", player);
                    self.handshake.mark_requested(now);
                }
            }
            HandshakeAction::GiveUp => info!("{} Firmware: unknown", player),
            HandshakeAction::Idle => {}
        }

        if !self.handshake.is_pending()
            && now.saturating_duration_since(self.last_heartbeat) >= self.timing.heartbeat_interval()
        {
            self.shared.send_command(commands::HEARTBEAT, &[]);
            self.last_heartbeat = now;
        }
    }

    fn read_once(&mut self, rescan: StepOutcome) -> StepOutcome {
        let Some(reader) = self.reader.as_mut() else {
            return rescan;
        };

        let count = match reader.read(&mut self.read_buf) {
            Ok(count) => count,
            Err(e) => {
                warn!(player = %self.shared.player(), "Read failed, disconnecting: {}", e);
                self.disconnect();
                return rescan;
            }
        };
        if count == 0 {
            return StepOutcome::Continue;
        }

        let data = &self.read_buf[..count];
        let player = self.shared.player();
        self.shared.capture().record_raw(player, data);
        let frames = self.scanner.feed(data);

        for scanned in frames {
            self.shared.capture().record_rx(player, &scanned.raw);
            match scanned.frame {
                RxFrame::BoardInfo { payload } => self.on_board_info(&payload),
                frame => {
                    trace!("{} RX {:?}", player, frame);
                    self.shared.apply_frame(&frame);
                }
            }
        }
        StepOutcome::Continue
    }

    fn on_board_info(&mut self, payload: &[u8]) {
        let player = self.shared.player();
        match self.handshake.on_reply(payload) {
            ReplyOutcome::Identified(info) => info!("{} Firmware: {}", player, info.version),
            ReplyOutcome::Duplicate => debug!("{} duplicate board info reply", player),
            ReplyOutcome::Malformed(e) => {
                warn!(player = %player, "Malformed board info, firmware unknown: {}", e);
            }
        }
    }
}
