//! # NMEA Module
//!
//! NMEA 0183 sentence generation for the serial receiver.
//!
//! This module handles:
//! - GPGGA / GPRMC / EXINJ sentence formatting from telemetry
//! - Feet to metres and hemisphere conversion
//! - Fixed legacy checksum suffixes or computed XOR checksums

pub mod protocol;
pub mod encoder;
pub mod checksum;

pub use encoder::{encode_sentences, EncoderOptions};
pub use protocol::{ChecksumMode, CoordinateFormat, NmeaTriple};
