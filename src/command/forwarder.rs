//! # Command Forwarder
//!
//! Deduplicates command lines and hands new ones to a [`CommandSink`].
//!
//! Vehicles repeat their last command continuously; only a change of
//! parameters for a given id is forwarded.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info};

use super::protocol::{lookup_actuator, CommandRecord};
use crate::error::Result;

/// Destination for forwarded commands
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandSink: Send {
    /// Deliver one command
    ///
    /// `expression` is the actuator expression rendered from the record,
    /// e.g. `/controls/engines/engine[0]/throttle 0.5`.
    async fn forward(&mut self, record: &CommandRecord, expression: &str) -> Result<()>;
}

/// Outcome of [`CommandForwarder::forward`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// Delivered to the sink
    Sent,
    /// Same parameters as the last delivery for this id; nothing done
    Suppressed,
}

/// Last forwarded parameters per command id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    last: HashMap<i64, Vec<String>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters last forwarded for `id`
    pub fn last(&self, id: i64) -> Option<&[String]> {
        self.last.get(&id).map(Vec::as_slice)
    }

    /// Whether `record` repeats the last forwarded parameters for its id
    pub fn is_unchanged(&self, record: &CommandRecord) -> bool {
        self.last(record.id) == Some(record.params.as_slice())
    }

    fn record(&mut self, record: CommandRecord) {
        self.last.insert(record.id, record.params);
    }
}

/// Deduplicating command forwarder
///
/// Owns the dedup table; the sink is borrowed per call so the same
/// transport can be used for polling in between.
#[derive(Debug, Default)]
pub struct CommandForwarder {
    table: CommandTable,
}

impl CommandForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Parse a raw command line and forward it
    ///
    /// # Errors
    ///
    /// See [`CommandForwarder::forward`]; additionally
    /// [`BridgeError::MalformedCommand`](crate::error::BridgeError::MalformedCommand)
    /// for lines without a numeric id.
    pub async fn forward_line<S>(&mut self, line: &str, sink: &mut S) -> Result<Forwarded>
    where
        S: CommandSink + ?Sized,
    {
        let record: CommandRecord = line.parse()?;
        self.forward(record, sink).await
    }

    /// Forward a command unless it repeats the last one for its id
    ///
    /// The table is only updated after the sink accepted the command, so a
    /// failed delivery is retried when the vehicle repeats the line.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::UnknownCommand`](crate::error::BridgeError::UnknownCommand)
    ///   for ids without an actuator; nothing is sent
    /// - [`BridgeError::MalformedCommand`](crate::error::BridgeError::MalformedCommand)
    ///   when parameters are missing
    /// - any error returned by the sink
    pub async fn forward<S>(&mut self, record: CommandRecord, sink: &mut S) -> Result<Forwarded>
    where
        S: CommandSink + ?Sized,
    {
        let actuator = lookup_actuator(record.id)?;

        debug!("Command {} {:?}, last {:?}", record.id, record.params, self.table.last(record.id));

        if self.table.is_unchanged(&record) {
            return Ok(Forwarded::Suppressed);
        }

        let expression = actuator.render(&record.params)?;
        sink.forward(&record, &expression).await?;
        info!("Forwarded command {}: {}", record.id, expression);

        self.table.record(record);
        Ok(Forwarded::Sent)
    }
}
