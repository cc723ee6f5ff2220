//! # Command Module
//!
//! Vehicle command lines forwarded to the simulator or the message bus.
//!
//! This module handles:
//! - Parsing `<id>,<param>,...` command lines
//! - Mapping command ids to simulator actuator expressions
//! - Suppressing repeats of an unchanged command

pub mod protocol;
pub mod forwarder;

pub use forwarder::{CommandForwarder, CommandSink, CommandTable, Forwarded};
pub use protocol::{lookup_actuator, ActuatorCommand, CommandRecord};
