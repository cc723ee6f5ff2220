//! # Serial Communication Module
//!
//! Handles the serial line to the NMEA receiver / vehicle.
//!
//! This module handles:
//! - Opening the serial device (8N1, configurable baud)
//! - Writing NMEA sentences, one per line
//! - Reading command lines sent back by the vehicle

pub mod port_trait;

use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::SerialPortBuilderExt;
use tracing::info;

use crate::error::{BridgeError, Result};

pub use port_trait::{LineReader, LineSink, LineWriter, SharedLineSink};

/// Default baud rate (pyserial / most USB GPS emulators)
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Baud rates accepted by the configuration
pub const SUPPORTED_BAUD_RATES: &[u32] = &[4800, 9600, 19200, 38400, 57600, 115200];

/// Reading half of an opened serial port
pub type SerialLineReader = LineReader<ReadHalf<tokio_serial::SerialStream>>;

/// Writing half of an opened serial port
pub type SerialLineWriter = LineWriter<WriteHalf<tokio_serial::SerialStream>>;

/// NMEA Serial Port Handler
pub struct NmeaSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for NmeaSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NmeaSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl NmeaSerial {
    /// Open a serial device
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Line speed
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Serial`] if the device cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fg_nmea_bridge::serial::NmeaSerial;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = NmeaSerial::open("/dev/ttyUSB0", 9600)?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| BridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        info!("Connected to serial port {} at {} baud", path, baud_rate);
        Ok(Self {
            port,
            device_path: path.to_string(),
        })
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Split into a command line reader and a sentence writer
    pub fn into_split(self) -> (SerialLineReader, SerialLineWriter) {
        let (reader, writer) = tokio::io::split(self.port);
        (LineReader::new(reader), LineWriter::new(writer))
    }
}
