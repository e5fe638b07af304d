//! Subsystem lifecycle and consumer surface.

use crate::led::{LED_COMMAND_LEN, LedFadeEngine, LedSink};
use crate::slot::{ObserverCell, SlotShared, TouchObserver};
use crate::supervisor::SlotWorker;
use crate::{AffineConfig, AffineIoError, AffineIoResult, SharedRegion, ShmemRegion, StatePublisher};
use affine_capture::Capture;
use affine_protocol::{LED_PAYLOAD_LEN, PWM_PAYLOAD_LEN, Player, TOUCH_LEN, commands};
use affine_serial::{PortProvider, SystemPortProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Opens the shared region for a name. Replaced in tests and by hosts that
/// cannot map OS shared memory.
pub type RegionFactory = Box<dyn Fn(&str) -> AffineIoResult<Arc<dyn SharedRegion>> + Send>;

/// Snapshot returned by [`AffineIo::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotState {
    pub present: bool,
    /// Ring buttons.
    pub buttons0: u8,
    /// Extended signals.
    pub buttons1: u8,
    /// Always zero when read from the shared region.
    pub touch: [u8; TOUCH_LEN],
}

/// Button LED writer over the connected slots.
struct SlotLeds {
    slots: Vec<Arc<SlotShared>>,
}

impl LedSink for SlotLeds {
    fn send_button_leds(&self, player: Player, rgb: &[u8; LED_PAYLOAD_LEN]) {
        if let Some(slot) = self.slots.iter().find(|slot| slot.player() == player) {
            slot.send_command(commands::SET_BUTTON_LEDS, rgb);
        }
    }
}

pub struct AffineIoBuilder {
    config: AffineConfig,
    provider: Option<Arc<dyn PortProvider>>,
    capture: Option<Capture>,
    region_factory: Option<RegionFactory>,
    led_engine: bool,
}

impl AffineIoBuilder {
    pub fn new(config: AffineConfig) -> Self {
        Self {
            config,
            provider: None,
            capture: None,
            region_factory: None,
            led_engine: true,
        }
    }

    /// Defaults to [`SystemPortProvider`].
    pub fn with_provider(mut self, provider: Arc<dyn PortProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Uses `capture` instead of opening the sinks named in the config.
    pub fn with_capture(mut self, capture: Capture) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Defaults to [`ShmemRegion::create_or_open`].
    pub fn with_region_factory(mut self, factory: RegionFactory) -> Self {
        self.region_factory = Some(factory);
        self
    }

    /// Skips the LED fade thread. [`AffineIo::submit_leds`] then does nothing.
    pub fn without_led_engine(mut self) -> Self {
        self.led_engine = false;
        self
    }

    /// Validates the config, maps the shared regions and starts one thread per
    /// slot plus the LED fade thread.
    ///
    /// A region that cannot be mapped or a capture file that cannot be opened
    /// is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or a thread cannot be
    /// spawned. Threads already started are stopped again.
    pub fn start(self) -> AffineIoResult<AffineIo> {
        let AffineIoBuilder {
            config,
            provider,
            capture,
            region_factory,
            led_engine,
        } = self;
        config.validate()?;

        let provider: Arc<dyn PortProvider> = match provider {
            Some(provider) => provider,
            None => Arc::new(SystemPortProvider::new()),
        };
        let region_factory: RegionFactory = match region_factory {
            Some(factory) => factory,
            None => Box::new(open_shmem_region),
        };
        let capture = Arc::new(match capture {
            Some(capture) => capture,
            None => Capture::open(&config.capture).unwrap_or_else(|e| {
                warn!("Capture disabled: {}", e);
                Capture::disabled()
            }),
        });

        let observer = ObserverCell::default();
        let mut slots = Vec::with_capacity(config.slots.len());
        let mut workers = Vec::with_capacity(config.slots.len());

        for slot_config in &config.slots {
            let player = slot_config.player;
            let name = config.region_name(player);
            let region = match region_factory(&name) {
                Ok(region) => Some(region),
                Err(e) => {
                    warn!("{} shared state unavailable: {}", player, e);
                    None
                }
            };

            // Left untouched until this process owns a board: another process
            // may be publishing into the same region.
            let publisher = StatePublisher::new(player, region);
            let shared = Arc::new(SlotShared::new(
                player,
                slot_config.enabled,
                publisher,
                Arc::clone(&capture),
                Arc::clone(&observer),
            ));
            workers.push(SlotWorker::new(
                Arc::clone(&shared),
                Arc::clone(&provider),
                config.vendor_id,
                slot_config.product_id,
                config.serial.clone(),
                config.timing.clone(),
            ));
            slots.push(shared);
        }

        let led_tick = config.timing.led_tick();
        let mut io = AffineIo {
            config,
            slots,
            threads: Vec::new(),
            capture,
            observer,
            leds: None,
            running: true,
        };

        for worker in workers {
            let player = worker.player();
            let name = format!("affine-io-{}", player.to_string().to_lowercase());
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker.run())
                .map_err(|source| AffineIoError::ThreadSpawn { name, source })?;
            io.threads.push((player, handle));
        }

        if led_engine {
            io.leds = Some(LedFadeEngine::start(io.led_sink(), led_tick)?);
        }

        info!("Affine IO started with {} slot(s)", io.slots.len());
        Ok(io)
    }
}

fn open_shmem_region(name: &str) -> AffineIoResult<Arc<dyn SharedRegion>> {
    Ok(Arc::new(ShmemRegion::create_or_open(name)?))
}

/// Running IO core: one supervisor thread per configured slot and the LED
/// fade thread. Dropping it shuts everything down.
pub struct AffineIo {
    config: AffineConfig,
    slots: Vec<Arc<SlotShared>>,
    threads: Vec<(Player, JoinHandle<()>)>,
    capture: Arc<Capture>,
    observer: ObserverCell,
    leds: Option<LedFadeEngine>,
    running: bool,
}

impl AffineIo {
    pub fn builder(config: AffineConfig) -> AffineIoBuilder {
        AffineIoBuilder::new(config)
    }

    /// Starts the core with the given port provider and default regions.
    ///
    /// # Errors
    ///
    /// See [`AffineIoBuilder::start`].
    pub fn start(config: AffineConfig, provider: Arc<dyn PortProvider>) -> AffineIoResult<Self> {
        AffineIoBuilder::new(config).with_provider(provider).start()
    }

    pub fn config(&self) -> &AffineConfig {
        &self.config
    }

    pub fn capture(&self) -> &Capture {
        &self.capture
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn slot(&self, player: Player) -> Option<&Arc<SlotShared>> {
        self.slots.iter().find(|slot| slot.player() == player)
    }

    fn wake(&self, player: Player) {
        if let Some((_, handle)) = self.threads.iter().find(|(p, _)| *p == player) {
            handle.thread().unpark();
        }
    }

    /// Enables or disables a slot. A disabled slot closes its port on its
    /// next loop pass and publishes no input.
    pub fn set_enabled(&self, player: Player, enabled: bool) {
        if let Some(slot) = self.slot(player) {
            slot.set_enabled(enabled);
            debug!("{} enabled={}", player, enabled);
            self.wake(player);
        }
    }

    pub fn is_enabled(&self, player: Player) -> bool {
        self.slot(player).is_some_and(|slot| slot.is_enabled())
    }

    /// Gates touch observer calls for one slot. Off by default.
    pub fn set_touch_enabled(&self, player: Player, enabled: bool) {
        if let Some(slot) = self.slot(player) {
            slot.set_touch_enabled(enabled);
        }
    }

    /// Replaces the touch observer shared by all slots.
    pub fn set_touch_observer(&self, observer: Option<TouchObserver>) {
        *self.observer.write() = observer;
    }

    pub fn is_connected(&self, player: Player) -> bool {
        self.slot(player).is_some_and(|slot| slot.is_connected())
    }

    /// Decoded state of a slot.
    ///
    /// A connected slot reports its live state. Otherwise the shared region
    /// is read, which may hold state published by another process; touch is
    /// not carried there. Returns `None` for an unconfigured player or when
    /// the region is unavailable.
    pub fn state(&self, player: Player) -> Option<SlotState> {
        let slot = self.slot(player)?;
        if slot.is_connected() {
            let decoded = slot.decoded();
            return Some(SlotState {
                present: true,
                buttons0: decoded.buttons.core,
                buttons1: decoded.buttons.extended,
                touch: decoded.touch.0,
            });
        }

        let buttons = slot.publisher().read()?;
        Some(SlotState {
            present: true,
            buttons0: buttons.core,
            buttons1: buttons.extended,
            touch: [0; TOUCH_LEN],
        })
    }

    pub fn send_button_leds(&self, player: Player, rgb: &[u8; LED_PAYLOAD_LEN]) {
        if let Some(slot) = self.slot(player) {
            slot.send_command(commands::SET_BUTTON_LEDS, rgb);
        }
    }

    pub fn send_billboard_leds(&self, player: Player, rgb: &[u8; LED_PAYLOAD_LEN]) {
        if let Some(slot) = self.slot(player) {
            slot.send_command(commands::SET_BILLBOARD_LEDS, rgb);
        }
    }

    pub fn send_pwm_leds(&self, player: Player, values: &[u8; PWM_PAYLOAD_LEN]) {
        if let Some(slot) = self.slot(player) {
            slot.send_command(commands::SET_PWM_LEDS, values);
        }
    }

    /// Hands eight `[R, G, B, speed]` groups to the fade engine.
    pub fn submit_leds(&self, player: Player, groups: &[u8; LED_COMMAND_LEN]) {
        if let Some(leds) = &self.leds {
            leds.submit(player, groups);
        }
    }

    /// Colours most recently produced by the fade engine for `player`.
    pub fn led_colors(&self, player: Player) -> Option<[u8; LED_PAYLOAD_LEN]> {
        self.leds.as_ref().map(|leds| leds.colors(player))
    }

    /// Sink that writes button LED commands to the slots of this instance.
    pub fn led_sink(&self) -> Arc<dyn LedSink> {
        Arc::new(SlotLeds {
            slots: self.slots.clone(),
        })
    }

    /// Stops every thread, closes the ports and publishes no input.
    /// Subsequent calls do nothing.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        info!("Stopping Affine IO");

        if let Some(mut leds) = self.leds.take() {
            leds.shutdown();
        }

        for slot in &self.slots {
            slot.request_stop();
        }
        for (player, handle) in self.threads.drain(..) {
            handle.thread().unpark();
            match handle.join() {
                Ok(()) => info!("{} supervisor stopped cleanly", player),
                Err(_) => error!("{} supervisor panicked", player),
            }
        }

        for slot in &self.slots {
            slot.detach();
        }
        self.capture.flush_repeats();
        info!("Affine IO stopped");
    }
}

impl Drop for AffineIo {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AffineIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffineIo")
            .field("slots", &self.slots)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}
