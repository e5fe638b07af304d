//! Per-slot state shared between the supervisor thread and consumers.

use crate::StatePublisher;
use affine_capture::Capture;
use affine_protocol::{ButtonState, Player, RxFrame, TouchState, encode_command};
use affine_serial::SerialPort;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{trace, warn};

/// Callback invoked with every touch update of a touch-enabled slot.
///
/// Runs on the slot's supervisor thread, outside every slot lock, so it may
/// call back into [`crate::AffineIo`].
pub type TouchObserver = Arc<dyn Fn(Player, &TouchState) + Send + Sync>;

pub(crate) type ObserverCell = Arc<RwLock<Option<TouchObserver>>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Decoded {
    pub buttons: ButtonState,
    pub touch: TouchState,
}

/// Everything about a slot that is touched by more than one thread.
///
/// The decoded state and the write half of the port have separate locks so
/// an LED command never waits for a state reader and frames from different
/// callers never interleave on the wire.
pub(crate) struct SlotShared {
    player: Player,
    enabled: AtomicBool,
    connected: AtomicBool,
    touch_enabled: AtomicBool,
    stop: AtomicBool,
    decoded: Mutex<Decoded>,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
    publisher: StatePublisher,
    capture: Arc<Capture>,
    observer: ObserverCell,
}

impl SlotShared {
    pub fn new(
        player: Player,
        enabled: bool,
        publisher: StatePublisher,
        capture: Arc<Capture>,
        observer: ObserverCell,
    ) -> Self {
        Self {
            player,
            enabled: AtomicBool::new(enabled),
            connected: AtomicBool::new(false),
            touch_enabled: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            decoded: Mutex::new(Decoded::default()),
            writer: Mutex::new(None),
            publisher,
            capture,
            observer,
        }
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn publisher(&self) -> &StatePublisher {
        &self.publisher
    }

    pub fn capture(&self) -> &Capture {
        &self.capture
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn is_touch_enabled(&self) -> bool {
        self.touch_enabled.load(Ordering::Acquire)
    }

    pub fn set_touch_enabled(&self, enabled: bool) {
        self.touch_enabled.store(enabled, Ordering::Release);
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn decoded(&self) -> Decoded {
        *self.decoded.lock()
    }

    /// Installs the write half of a freshly opened port and marks the slot
    /// connected with zeroed state.
    pub fn attach(&self, writer: Box<dyn SerialPort>) {
        *self.writer.lock() = Some(writer);
        *self.decoded.lock() = Decoded::default();
        self.publisher.publish_idle();
        self.connected.store(true, Ordering::Release);
    }

    /// Drops the write half, clears connected and zeroes local and published
    /// state.
    pub fn detach(&self) {
        self.connected.store(false, Ordering::Release);
        *self.writer.lock() = None;
        *self.decoded.lock() = Decoded::default();
        self.publisher.publish_idle();
    }

    /// Frames and writes one command.
    ///
    /// Returns false if the slot is not connected, the payload is too large
    /// or the write failed. A failed write detaches the slot so discovery
    /// starts over.
    pub fn send_command(&self, command: u8, payload: &[u8]) -> bool {
        if !self.is_connected() {
            return false;
        }

        let frame = match encode_command(command, payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(player = %self.player, "Dropping command {:02X}: {}", command, e);
                return false;
            }
        };

        self.capture.record_tx(self.player, command, payload);

        let result = {
            let mut writer = self.writer.lock();
            match writer.as_mut() {
                Some(port) => port.write_all(&frame),
                None => return false,
            }
        };

        match result {
            Ok(()) => {
                trace!(player = %self.player, "TX {:02X} len={}", command, payload.len());
                true
            }
            Err(e) => {
                warn!(player = %self.player, "Write failed, disconnecting: {}", e);
                self.detach();
                false
            }
        }
    }

    /// Applies one telemetry frame to the decoded state, notifies the touch
    /// observer and republishes the buttons.
    pub fn apply_frame(&self, frame: &RxFrame) {
        let buttons = {
            let mut decoded = self.decoded.lock();
            if let Some(buttons) = frame.buttons() {
                decoded.buttons = buttons;
            }
            if let Some(touch) = frame.touch() {
                decoded.touch = *touch;
            }
            decoded.buttons
        };

        if let Some(touch) = frame.touch()
            && self.is_touch_enabled()
        {
            let observer = self.observer.read().clone();
            if let Some(observer) = observer {
                observer(self.player, touch);
            }
        }

        self.publisher.publish(buttons);
    }
}

impl std::fmt::Debug for SlotShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotShared")
            .field("player", &self.player)
            .field("enabled", &self.is_enabled())
            .field("connected", &self.is_connected())
            .field("touch_enabled", &self.is_touch_enabled())
            .finish_non_exhaustive()
    }
}
