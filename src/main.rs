//! # FG NMEA Bridge
//!
//! Bridges FlightGear telemetry to a serial NMEA receiver, and vehicle
//! commands from serial back to the simulator or a message bus.
//!
//! # Examples
//!
//! Simulator side, property server on the default port:
//! ```bash
//! fg-nmea-bridge fg --serial /dev/ttyUSB0
//! ```
//!
//! Vehicle side, with a config file and debug logging:
//! ```bash
//! fg-nmea-bridge -v -c config/default.toml uav --bus-addr 0.0.0.0:8091
//! ```
//!
//! Expected output:
//! ```text
//! INFO fg_nmea_bridge: FG NMEA Bridge v0.1.0 starting (fg mode)
//! INFO fg_nmea_bridge::serial: Connected to serial port /dev/ttyUSB0 at 9600 baud
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use fg_nmea_bridge::adapter;
use fg_nmea_bridge::config::{Config, LoggingConfig, Overrides};

/// FlightGear telemetry to serial NMEA bridge
#[derive(Debug, Parser)]
#[command(name = "fg-nmea-bridge", version, about)]
struct Cli {
    /// Log at debug level, including every sentence written
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Poll the simulator and write NMEA to serial
    Fg {
        /// Property server host
        #[arg(long)]
        telnet_host: Option<String>,

        /// Property server port
        #[arg(long)]
        telnet_port: Option<u16>,

        /// Serial device path
        #[arg(long)]
        serial: Option<String>,
    },
    /// Expose the serial port on the message bus
    Uav {
        /// Serial device path
        #[arg(long)]
        serial: Option<String>,

        /// Bus listen address
        #[arg(long)]
        bus_addr: Option<String>,
    },
}

impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Mode::Fg { .. } => "fg",
            Mode::Uav { .. } => "uav",
        }
    }

    fn overrides(&self) -> Overrides {
        match self {
            Mode::Fg { telnet_host, telnet_port, serial } => Overrides {
                simulator_host: telnet_host.clone(),
                simulator_port: *telnet_port,
                serial_port: serial.clone(),
                bus_listen: None,
            },
            Mode::Uav { serial, bus_addr } => Overrides {
                serial_port: serial.clone(),
                bus_listen: bus_addr.clone(),
                ..Overrides::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    config
        .apply_overrides(cli.mode.overrides())
        .context("Invalid command line options")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(cli.verbose, &config.logging)?;

    info!("FG NMEA Bridge v{} starting ({} mode)", env!("CARGO_PKG_VERSION"), cli.mode.name());

    // Fail before entering the reconnect loop
    let serial = config.serial_port()?;
    info!("Serial device: {}", serial);
    info!("Press Ctrl+C to exit");

    let run = async {
        match &cli.mode {
            Mode::Fg { .. } => adapter::fg::run(&config).await,
            Mode::Uav { .. } => adapter::uav::run(&config).await,
        }
    };

    tokio::select! {
        result = run => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}

/// Install the tracing subscriber
///
/// Logs go to stdout, and also to `logging.file` when configured.
fn init_logging(verbose: bool, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    match &logging.file {
        Some(file) => {
            let (directory, name) = split_log_path(Path::new(file))?;
            let appender = tracing_appender::rolling::never(directory, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stdout.and(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf)> {
    let name = path
        .file_name()
        .with_context(|| format!("Log file path '{}' has no file name", path.display()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((directory, PathBuf::from(name)))
}
