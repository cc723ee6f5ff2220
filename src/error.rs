//! # Error Types
//!
//! Custom error types for FG NMEA Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for FG NMEA Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// No serial device was given on the command line or in the config file
    #[error("No comms method specified: a serial device path is required")]
    MissingSerialDevice,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// The peer closed the stream before the expected data arrived
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// No response from the peer within the configured timeout
    #[error("Timed out after {0} ms waiting for the simulator")]
    Timeout(u64),

    /// A telemetry field required by the NMEA encoder is absent
    #[error("Missing telemetry field: {0}")]
    MissingField(String),

    /// A telemetry field required by the NMEA encoder is not a decimal
    #[error("Telemetry field {0} is not numeric")]
    NonNumericField(String),

    /// Command id with no known actuator
    #[error("Unknown command id: {0}")]
    UnknownCommand(i64),

    /// Command line that cannot be parsed or applied
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    /// Message bus protocol errors
    #[error("Bus error: {0}")]
    Bus(String),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Whether the error means the transport is gone and must be reopened
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            BridgeError::Io(_)
                | BridgeError::Serial(_)
                | BridgeError::ConnectionClosed(_)
                | BridgeError::Timeout(_)
        )
    }
}

/// Result type alias for FG NMEA Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_classification() {
        let io = BridgeError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe"));
        assert!(io.is_disconnect());
        assert!(BridgeError::ConnectionClosed("eof".into()).is_disconnect());
        assert!(BridgeError::Timeout(100).is_disconnect());
        assert!(BridgeError::Serial("gone".into()).is_disconnect());

        assert!(!BridgeError::MissingField("altitude-ft".into()).is_disconnect());
        assert!(!BridgeError::UnknownCommand(99).is_disconnect());
        assert!(!BridgeError::MalformedCommand("x".into()).is_disconnect());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            BridgeError::MissingField("heading-deg".into()).to_string(),
            "Missing telemetry field: heading-deg"
        );
        assert_eq!(BridgeError::UnknownCommand(99).to_string(), "Unknown command id: 99");
    }
}
