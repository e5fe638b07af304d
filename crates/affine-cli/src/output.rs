//! Output formatting for CLI responses

use affine_io::SlotState;
use affine_protocol::Player;
use affine_serial::PortInfo;
use serde_json::json;

/// Print error in human-readable format
pub fn print_error_human(error: &anyhow::Error) {
    eprintln!("Error: {error}");

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  Caused by: {err}");
        source = err.source();
    }
}

pub fn port_line(port: &PortInfo) -> String {
    let mut line = format!(
        "{:<16} {:04X}:{:04X}",
        port.port_name, port.vendor_id, port.product_id
    );
    if let Some(player) = Player::ALL
        .into_iter()
        .find(|player| port.product_id == player.default_product_id())
    {
        line.push_str(&format!("  {player}"));
    }
    if let Some(name) = port.product_name.as_ref().or(port.manufacturer.as_ref()) {
        line.push_str(&format!("  {name}"));
    }
    line
}

pub fn ports_json(ports: &[PortInfo]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&json!({
        "success": true,
        "ports": ports,
    }))
}

/// One monitor line for a player. `None` means no board and no shared state.
pub fn state_line(player: Player, state: Option<&SlotState>) -> String {
    match state {
        Some(state) => format!(
            "{player} buttons0={:02X} buttons1={:02X} touch={}",
            state.buttons0,
            state.buttons1,
            state
                .touch
                .iter()
                .map(|byte| format!("{byte:02X}"))
                .collect::<Vec<_>>()
                .join(" ")
        ),
        None => format!("{player} absent"),
    }
}

pub fn state_json(player: Player, state: Option<&SlotState>) -> serde_json::Result<String> {
    serde_json::to_string(&json!({
        "player": player.number(),
        "state": state,
    }))
}
