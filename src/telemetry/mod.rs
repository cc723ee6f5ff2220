//! # Telemetry Module
//!
//! Simulator telemetry as typed values.
//!
//! This module handles:
//! - Decoding `ls` property listings row by row
//! - Exact decimal parsing of `double` properties
//! - Merging several listings into one snapshot per poll cycle

pub mod decoder;
pub mod types;

pub use types::{TelemetrySnapshot, TelemetryValue};
