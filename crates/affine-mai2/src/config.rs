//! segatools INI settings read by the mai2 front end.

use crate::{Mai2Error, Mai2Result};
use affine_io::AffineConfig;
use affine_protocol::Player;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the INI file.
pub const ENV_CONFIG_PATH: &str = "SEGATOOLS_CONFIG_PATH";

pub const DEFAULT_CONFIG_PATH: &str = ".\\segatools.ini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mai2Config {
    pub p1_enable: bool,
    pub p2_enable: bool,
}

impl Default for Mai2Config {
    fn default() -> Self {
        Self {
            p1_enable: true,
            p2_enable: true,
        }
    }
}

impl Mai2Config {
    /// Loads the file named by `SEGATOOLS_CONFIG_PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load() -> Mai2Result<Self> {
        Self::from_file(&config_path(|key| std::env::var(key).ok()))
    }

    /// Reads `[touch] p1Enable/p2Enable`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn from_file(path: &Path) -> Mai2Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} not found, using defaults", path.display());
                String::new()
            }
            Err(source) => {
                return Err(Mai2Error::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = Self::parse(&text);
        info!(
            "Config: p1Enable={} p2Enable={}",
            u8::from(config.p1_enable),
            u8::from(config.p2_enable)
        );
        Ok(config)
    }

    pub fn parse(text: &str) -> Self {
        Self {
            p1_enable: ini_int(text, "touch", "p1Enable").unwrap_or(1) != 0,
            p2_enable: ini_int(text, "touch", "p2Enable").unwrap_or(1) != 0,
        }
    }

    pub fn enabled(&self, player: Player) -> bool {
        match player {
            Player::One => self.p1_enable,
            Player::Two => self.p2_enable,
        }
    }

    /// Copies the enable flags onto the matching core slots.
    pub fn apply(&self, core: &mut AffineConfig) {
        for player in Player::ALL {
            if let Some(slot) = core.slot_mut(player) {
                slot.enabled = self.enabled(player);
            }
        }
    }
}

/// Resolves the INI path from `lookup`, falling back to the default.
pub fn config_path(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup(ENV_CONFIG_PATH)
        .filter(|path| !path.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Integer value of `key` in `[section]`.
///
/// Section and key names are case-insensitive. The value is read as an
/// optionally signed leading run of digits; anything else reads as 0.
pub fn ini_int(text: &str, section: &str, key: &str) -> Option<i64> {
    let mut in_section = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            in_section = name.trim().eq_ignore_ascii_case(section);
            continue;
        }
        if !in_section || trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }
        let Some((name, value)) = trimmed.split_once('=') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case(key) {
            return Some(leading_int(value.trim()));
        }
    }
    None
}

fn leading_int(value: &str) -> i64 {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let magnitude = digits
        .chars()
        .map_while(|c| c.to_digit(10))
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d)));
    if negative { -magnitude } else { magnitude }
}
