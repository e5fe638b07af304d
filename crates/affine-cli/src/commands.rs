//! Command implementations for affinectl

use crate::error::CliError;
use crate::output;
use affine_io::{AffineConfig, AffineIo, SlotState};
use affine_protocol::{LED_PAYLOAD_LEN, Player, VENDOR_ID};
use affine_serial::{PortInfo, PortProvider};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const MONITOR_POLL: Duration = Duration::from_millis(10);

/// Loads `path` if given, otherwise the defaults, then applies the capture
/// environment variables.
pub fn load_config(path: Option<&Path>) -> Result<AffineConfig> {
    let config = match path {
        Some(path) => AffineConfig::from_file(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => AffineConfig::default(),
    };
    Ok(config.with_env_capture())
}

/// Ports carrying `vendor_id`, or every port when `all` is set.
pub fn matching_ports(
    provider: &dyn PortProvider,
    vendor_id: u16,
    all: bool,
) -> Result<Vec<PortInfo>, CliError> {
    let mut ports = provider.list_ports()?;
    if !all {
        ports.retain(|port| port.vendor_id == vendor_id);
    }
    ports.sort_by(|a, b| a.port_name.cmp(&b.port_name));
    Ok(ports)
}

pub fn run_ports(provider: &dyn PortProvider, all: bool, json: bool) -> Result<()> {
    let ports = matching_ports(provider, VENDOR_ID, all)?;
    if json {
        println!("{}", output::ports_json(&ports)?);
    } else if ports.is_empty() {
        println!("No Affine IO boards found");
    } else {
        for port in &ports {
            println!("{}", output::port_line(port));
        }
    }
    Ok(())
}

/// Installs a Ctrl-C handler that raises the returned flag.
pub fn stop_flag() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_clone.store(true, Ordering::Relaxed);
    })
    .context("failed to install Ctrl-C handler")?;
    Ok(stop)
}

/// Writes one line per player whenever its state changes, until `stop` is
/// raised or `deadline` passes. Returns the number of lines written.
pub fn monitor_loop(
    io: &AffineIo,
    stop: &AtomicBool,
    deadline: Option<Instant>,
    json: bool,
    out: &mut impl Write,
) -> Result<usize> {
    let mut last: [Option<Option<SlotState>>; 2] = [None, None];
    let mut lines = 0usize;

    while !stop.load(Ordering::Relaxed) && deadline.is_none_or(|at| Instant::now() < at) {
        for player in Player::ALL {
            let state = io.state(player);
            let seen = &mut last[player.index()];
            if seen.as_ref() == Some(&state) {
                continue;
            }
            let line = if json {
                output::state_json(player, state.as_ref())?
            } else {
                output::state_line(player, state.as_ref())
            };
            writeln!(out, "{line}").context("failed to write monitor output")?;
            *seen = Some(state);
            lines = lines.saturating_add(1);
        }
        std::thread::sleep(MONITOR_POLL);
    }
    Ok(lines)
}

pub fn run_monitor(
    config: AffineConfig,
    provider: Arc<dyn PortProvider>,
    duration_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    let stop = stop_flag()?;
    let mut io = AffineIo::start(config, provider).context("failed to start IO core")?;
    let deadline = duration_ms.map(|ms| Instant::now() + Duration::from_millis(ms));

    eprintln!("Monitoring Affine IO boards (Ctrl-C to stop)");
    let lines = monitor_loop(&io, &stop, deadline, json, &mut std::io::stdout().lock())?;
    io.shutdown();
    debug!("monitor wrote {} line(s)", lines);
    Ok(())
}

/// Parses `RRGGBB`, with or without a leading `#`.
pub fn parse_color(raw: &str) -> Result<[u8; 3], CliError> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CliError::InvalidColor(raw.to_string()));
    }
    let value = u32::from_str_radix(hex, 16)
        .ok()
        .ok_or_else(|| CliError::InvalidColor(raw.to_string()))?;
    let [_, r, g, b] = value.to_be_bytes();
    Ok([r, g, b])
}

pub fn solid_payload(rgb: [u8; 3]) -> [u8; LED_PAYLOAD_LEN] {
    let mut payload = [0u8; LED_PAYLOAD_LEN];
    for group in payload.chunks_exact_mut(3) {
        group.copy_from_slice(&rgb);
    }
    payload
}

/// Polls until `player` is connected or `timeout` elapses.
pub fn wait_connected(io: &AffineIo, player: Player, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if io.is_connected(player) {
            return true;
        }
        std::thread::sleep(MONITOR_POLL);
    }
    io.is_connected(player)
}

/// Sends one colour to every button LED of `player`'s board.
pub fn send_solid(
    io: &AffineIo,
    player: Player,
    rgb: [u8; 3],
    wait: Duration,
) -> Result<(), CliError> {
    if !wait_connected(io, player, wait) {
        return Err(CliError::NotConnected {
            player,
            waited_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
        });
    }
    io.send_button_leds(player, &solid_payload(rgb));
    info!(
        "{} LEDs set to {:02X}{:02X}{:02X}",
        player, rgb[0], rgb[1], rgb[2]
    );
    Ok(())
}

pub fn run_led(
    mut config: AffineConfig,
    provider: Arc<dyn PortProvider>,
    player: Player,
    rgb: [u8; 3],
    wait_ms: u64,
) -> Result<()> {
    for slot in &mut config.slots {
        slot.enabled = slot.player == player;
    }
    // The fade engine would overwrite the colour on its next tick.
    let mut io = AffineIo::builder(config)
        .with_provider(provider)
        .without_led_engine()
        .start()
        .context("failed to start IO core")?;
    let result = send_solid(&io, player, rgb, Duration::from_millis(wait_ms));
    io.shutdown();
    result?;
    println!("{player} LEDs set to {:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use affine_io::{AffineIoError, RegionFactory};
    use affine_protocol::commands;
    use affine_serial::mock::MockPortProvider;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn fast_config() -> AffineConfig {
        let mut config = AffineConfig::default();
        config.timing.rescan_interval_ms = 10;
        config.serial.read_timeout_ms = 1;
        config
    }

    fn no_regions() -> RegionFactory {
        Box::new(|name: &str| {
            Err(AffineIoError::SharedRegion {
                name: name.to_string(),
                reason: "not mapped in tests".to_string(),
            })
        })
    }

    fn start(provider: &Arc<MockPortProvider>) -> Result<AffineIo, AffineIoError> {
        AffineIo::builder(fast_config())
            .with_provider(provider.clone())
            .with_region_factory(no_regions())
            .without_led_engine()
            .start()
    }

    #[test]
    fn test_parse_color() -> TestResult {
        assert_eq!(parse_color("FF8000")?, [0xFF, 0x80, 0x00]);
        assert_eq!(parse_color("#0a0B0c")?, [0x0A, 0x0B, 0x0C]);
        assert!(matches!(parse_color("FF80"), Err(CliError::InvalidColor(_))));
        assert!(matches!(parse_color("GG0000"), Err(CliError::InvalidColor(_))));
        assert!(matches!(parse_color("ÿÿÿ"), Err(CliError::InvalidColor(_))));
        Ok(())
    }

    #[test]
    fn test_matching_ports_filters_vendor() -> TestResult {
        let provider = MockPortProvider::new();
        provider.add_board(PortInfo::new("COM9", VENDOR_ID, 0x52A6));
        provider.add_board(PortInfo::new("COM1", 0x2341, 0x0043));
        provider.add_board(PortInfo::new("COM3", VENDOR_ID, 0x52A5));

        let names = |ports: Vec<PortInfo>| -> Vec<String> {
            ports.into_iter().map(|port| port.port_name).collect()
        };
        assert_eq!(
            names(matching_ports(&provider, VENDOR_ID, false)?),
            ["COM3", "COM9"]
        );
        assert_eq!(
            names(matching_ports(&provider, VENDOR_ID, true)?),
            ["COM1", "COM3", "COM9"]
        );
        Ok(())
    }

    #[test]
    fn test_send_solid_reaches_board() -> TestResult {
        let provider = Arc::new(MockPortProvider::new());
        let io = start(&provider)?;
        let board = provider.add_board(PortInfo::new(
            "COM3",
            VENDOR_ID,
            Player::One.default_product_id(),
        ));

        send_solid(&io, Player::One, [1, 2, 3], Duration::from_secs(2))?;
        let frames = board.written_commands(commands::SET_BUTTON_LEDS);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][3..27], &solid_payload([1, 2, 3]));
        Ok(())
    }

    #[test]
    fn test_send_solid_times_out_without_board() -> TestResult {
        let provider = Arc::new(MockPortProvider::new());
        let io = start(&provider)?;
        let result = send_solid(&io, Player::Two, [1, 2, 3], Duration::from_millis(30));
        assert!(matches!(
            result,
            Err(CliError::NotConnected {
                player: Player::Two,
                waited_ms: 30
            })
        ));
        Ok(())
    }

    #[test]
    fn test_monitor_prints_changes_only() -> TestResult {
        let provider = Arc::new(MockPortProvider::new());
        let io = start(&provider)?;
        let stop = AtomicBool::new(false);
        let mut out = Vec::new();

        let deadline = Some(Instant::now() + Duration::from_millis(60));
        let lines = monitor_loop(&io, &stop, deadline, false, &mut out)?;
        assert_eq!(lines, 2);
        assert_eq!(String::from_utf8(out)?, "P1 absent\nP2 absent\n");
        Ok(())
    }

    #[test]
    fn test_monitor_stops_on_flag() -> TestResult {
        let provider = Arc::new(MockPortProvider::new());
        let io = start(&provider)?;
        let stop = AtomicBool::new(true);
        let mut out = Vec::new();
        assert_eq!(monitor_loop(&io, &stop, None, true, &mut out)?, 0);
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_config_from_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("affine.json");
        let mut config = AffineConfig::default();
        config.timing.heartbeat_interval_ms = 250;
        config.save(&path)?;

        let loaded = load_config(Some(&path))?;
        assert_eq!(loaded.timing.heartbeat_interval_ms, 250);
        assert!(matches!(
            load_config(Some(&dir.path().join("missing.json"))),
            Err(_)
        ));
        Ok(())
    }
}
