//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//! Command line flags are applied on top with [`Config::apply_overrides`].

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{BridgeError, Result};
use crate::nmea::{ChecksumMode, CoordinateFormat, EncoderOptions};
use crate::serial::{DEFAULT_BAUD_RATE, SUPPORTED_BAUD_RATES};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub nmea: NmeaConfig,
    #[serde(default)]
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Simulator property server
#[derive(Debug, Deserialize, Clone)]
pub struct SimulatorConfig {
    #[serde(default = "default_simulator_host")]
    pub host: String,

    #[serde(default = "default_simulator_port")]
    pub port: u16,

    #[serde(default = "default_response_timeout_ms")]
    pub timeout_ms: u64,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path; required, from here or `--serial`
    #[serde(default)]
    pub port: Option<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Sentence formatting
#[derive(Debug, Deserialize, Clone, Default)]
pub struct NmeaConfig {
    #[serde(default)]
    pub checksum: ChecksumMode,

    #[serde(default)]
    pub coordinates: CoordinateFormat,
}

/// Control loop timing
#[derive(Debug, Deserialize, Clone)]
pub struct AdapterConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

/// Message bus endpoint of the vehicle-side adapter
#[derive(Debug, Deserialize, Clone)]
pub struct BusConfig {
    #[serde(default = "default_bus_listen")]
    pub listen: String,
}

/// Log output
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<String>,
}

// Default value functions
fn default_simulator_host() -> String { "127.0.0.1".to_string() }
fn default_simulator_port() -> u16 { 5401 }
fn default_response_timeout_ms() -> u64 { 2000 }

fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }

fn default_poll_interval_ms() -> u64 { 500 }
fn default_reconnect_delay_ms() -> u64 { 5000 }

fn default_bus_listen() -> String { "127.0.0.1:8091".to_string() }

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            host: default_simulator_host(),
            port: default_simulator_port(),
            timeout_ms: default_response_timeout_ms(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            listen: default_bus_listen(),
        }
    }
}

/// Values given on the command line, taking precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub simulator_host: Option<String>,
    pub simulator_port: Option<u16>,
    pub serial_port: Option<String>,
    pub bus_listen: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fg_nmea_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command line values, then re-validate
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(host) = overrides.simulator_host {
            self.simulator.host = host;
        }
        if let Some(port) = overrides.simulator_port {
            self.simulator.port = port;
        }
        if let Some(port) = overrides.serial_port {
            self.serial.port = Some(port);
        }
        if let Some(listen) = overrides.bus_listen {
            self.bus.listen = listen;
        }
        self.validate()
    }

    /// The serial device path, which every adapter needs
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MissingSerialDevice`] when neither the file
    /// nor the command line named one.
    pub fn serial_port(&self) -> Result<&str> {
        self.serial
            .port
            .as_deref()
            .filter(|port| !port.is_empty())
            .ok_or(BridgeError::MissingSerialDevice)
    }

    /// Parsed bus listen address
    pub fn bus_addr(&self) -> Result<SocketAddr> {
        self.bus.listen.parse().map_err(|_| {
            BridgeError::Config(toml::de::Error::custom(format!(
                "bus listen address '{}' is not a socket address",
                self.bus.listen
            )))
        })
    }

    pub fn encoder_options(&self) -> EncoderOptions {
        EncoderOptions {
            checksum: self.nmea.checksum,
            coordinates: self.nmea.coordinates,
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.simulator.host.is_empty() {
            return Err(BridgeError::Config(
                toml::de::Error::custom("simulator host cannot be empty")
            ));
        }

        if self.simulator.port == 0 {
            return Err(BridgeError::Config(
                toml::de::Error::custom("simulator port must be greater than 0")
            ));
        }

        if self.simulator.timeout_ms == 0 || self.simulator.timeout_ms > 60000 {
            return Err(BridgeError::Config(
                toml::de::Error::custom("timeout_ms must be between 1 and 60000")
            ));
        }

        if let Some(port) = &self.serial.port {
            if port.is_empty() {
                return Err(BridgeError::Config(
                    toml::de::Error::custom("serial port cannot be empty")
                ));
            }
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(BridgeError::Config(
                toml::de::Error::custom(format!(
                    "baud_rate must be one of: {:?}",
                    SUPPORTED_BAUD_RATES
                ))
            ));
        }

        if self.adapter.poll_interval_ms == 0 || self.adapter.poll_interval_ms > 60000 {
            return Err(BridgeError::Config(
                toml::de::Error::custom("poll_interval_ms must be between 1 and 60000")
            ));
        }

        if self.adapter.reconnect_delay_ms == 0 || self.adapter.reconnect_delay_ms > 60000 {
            return Err(BridgeError::Config(
                toml::de::Error::custom("reconnect_delay_ms must be between 1 and 60000")
            ));
        }

        self.bus_addr()?;

        if let Some(file) = &self.logging.file {
            if file.is_empty() {
                return Err(BridgeError::Config(
                    toml::de::Error::custom("logging file cannot be empty")
                ));
            }
        }

        Ok(())
    }
}
