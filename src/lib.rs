//! # FG NMEA Bridge Library
//!
//! Feed simulated flight telemetry to a serial NMEA receiver and forward
//! vehicle commands back.
//!
//! The simulator-side adapter polls the FlightGear property server, encodes
//! each snapshot as `$GPGGA`, `$GPRMC` and `$EXINJ` sentences and writes them
//! to serial. Command lines read from serial become throttle `set`s on the
//! simulator, or `uav.cmd` events on the message bus for the vehicle-side
//! adapter.

pub mod adapter;
pub mod bus;
pub mod command;
pub mod config;
pub mod error;
pub mod nmea;
pub mod props;
pub mod serial;
pub mod telemetry;
