//! affinectl - Affine IO operator tool
//!
//! Lists Affine IO boards, monitors decoded player state and pushes LED
//! colours without a game running.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod output;

use affine_protocol::Player;
use affine_serial::SystemPortProvider;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "affinectl")]
#[command(about = "Affine IO operator tool - list boards, monitor input and drive LEDs")]
#[command(version)]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// IO core config file (JSON)
    #[arg(long, global = true, env = "AFFINE_IO_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports carrying the Affine vendor ID
    Ports {
        /// List every serial port
        #[arg(short, long)]
        all: bool,
    },

    /// Print player state whenever it changes
    Monitor {
        /// Stop after this many milliseconds instead of waiting for Ctrl-C
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
    },

    /// Set every button LED of one board to a colour
    Led {
        /// Player whose board is driven
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
        player: u8,

        /// Colour as RRGGBB hex
        #[arg(short, long)]
        color: String,

        /// How long to wait for the board to connect
        #[arg(long, default_value_t = 5000, value_name = "MS")]
        wait_ms: u64,
    },
}

fn default_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("affinectl={level},affine_io={level},affine_serial={level},affine_capture={level}")
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(cli.verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error_human(&e);
            ExitCode::FAILURE
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Ports { all } => commands::run_ports(&SystemPortProvider::new(), *all, cli.json),
        Commands::Monitor { duration_ms } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::run_monitor(
                config,
                Arc::new(SystemPortProvider::new()),
                *duration_ms,
                cli.json,
            )
        }
        Commands::Led {
            player,
            color,
            wait_ms,
        } => {
            let player = Player::from_number(*player).map_err(error::CliError::from)?;
            let rgb = commands::parse_color(color)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::run_led(
                config,
                Arc::new(SystemPortProvider::new()),
                player,
                rgb,
                *wait_ms,
            )
        }
    }
}
