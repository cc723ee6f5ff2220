//! # Simulator Property Client
//!
//! Talks to the FlightGear property server (`--telnet=<port>`).
//!
//! This module handles:
//! - Opening the TCP session to the simulator
//! - `ls <path>` requests and prompt-delimited responses
//! - `set <path> <value>` requests for forwarded commands
//! - Read timeouts and disconnect detection

use async_trait::async_trait;
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::command::{CommandRecord, CommandSink};
use crate::error::{BridgeError, Result};
use crate::telemetry::decoder::decode_listing;
use crate::telemetry::TelemetrySnapshot;

/// Prompt printed by the property server after every response
pub const PROMPT: &[u8] = b"/> ";

/// Request terminator
const REQUEST_TERMINATOR: &str = "\r\n";

/// Property directories polled every cycle, merged in this order
pub const TELEMETRY_PATHS: &[&str] = &["position", "orientation/model", "velocities"];

/// Initial capacity of the response buffer
const READ_BUFFER_CAPACITY: usize = 4096;

/// Property server session over any byte stream
pub struct PropertyClient<S> {
    stream: S,
    buffer: BytesMut,
    timeout: Duration,
}

impl<S> std::fmt::Debug for PropertyClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyClient")
            .field("timeout", &self.timeout)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

impl PropertyClient<TcpStream> {
    /// Connect to the property server
    ///
    /// # Arguments
    ///
    /// * `host` - Simulator host name or address
    /// * `port` - Telnet property port
    /// * `timeout` - Limit for connecting and for each response
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Io`] if the connection is refused and
    /// [`BridgeError::Timeout`] if it does not complete in time.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| BridgeError::Timeout(timeout.as_millis() as u64))??;
        stream.set_nodelay(true)?;

        info!("Connected to simulator at {}:{}", host, port);
        Ok(Self::new(stream, timeout))
    }
}

impl<S> PropertyClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already connected stream
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
            timeout,
        }
    }

    /// List a property directory and decode it
    pub async fn list(&mut self, path: &str) -> Result<TelemetrySnapshot> {
        let response = self.request(&format!("ls {}", path)).await?;
        Ok(decode_listing(&response))
    }

    /// Read one telemetry snapshot (all of [`TELEMETRY_PATHS`], merged)
    pub async fn read_telemetry(&mut self) -> Result<TelemetrySnapshot> {
        let mut snapshot = TelemetrySnapshot::new();
        for path in TELEMETRY_PATHS {
            snapshot.merge(self.list(path).await?);
        }
        Ok(snapshot)
    }

    /// Set a property, `expression` being `<path> <value>`
    pub async fn set(&mut self, expression: &str) -> Result<()> {
        self.request(&format!("set {}", expression)).await?;
        Ok(())
    }

    /// Send one request line and return the response, prompt included
    async fn request(&mut self, command: &str) -> Result<String> {
        debug!("Simulator request: {}", command);

        let line = format!("{}{}", command, REQUEST_TERMINATOR);
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.flush().await?;

        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.read_until_prompt())
            .await
            .map_err(|_| BridgeError::Timeout(timeout.as_millis() as u64))?
    }

    async fn read_until_prompt(&mut self) -> Result<String> {
        loop {
            if let Some(end) = find_subsequence(&self.buffer, PROMPT) {
                let response = self.buffer.split_to(end + PROMPT.len());
                return Ok(String::from_utf8_lossy(&response).into_owned());
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(BridgeError::ConnectionClosed(
                    "simulator closed the connection before the prompt".to_string(),
                ));
            }
        }
    }
}

#[async_trait]
impl<S> CommandSink for PropertyClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn forward(&mut self, _record: &CommandRecord, expression: &str) -> Result<()> {
        self.set(expression).await
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandForwarder;
    use crate::telemetry::TelemetryValue;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn dec(s: &str) -> TelemetryValue {
        TelemetryValue::Decimal(Decimal::from_str(s).unwrap())
    }

    #[tokio::test]
    async fn test_list_decodes_response() {
        let stream = Builder::new()
            .write(b"ls position\r\n")
            .read(b"latitude-deg = '45.0' (double)\r\n")
            .read(b"longitude-deg = '-122.0' (double)\r\n/> ")
            .build();
        let mut client = PropertyClient::new(stream, TIMEOUT);

        let snapshot = client.list("position").await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("latitude-deg"), Some(&dec("45.0")));
    }

    #[tokio::test]
    async fn test_read_telemetry_merges_three_listings() {
        let stream = Builder::new()
            .write(b"ls position\r\n")
            .read(b"altitude-ft = '1000' (double)\r\nlatitude-deg = '45.0' (double)\r\n/> ")
            .write(b"ls orientation/model\r\n")
            .read(b"heading-deg = '90' (double)\r\n/> ")
            .write(b"ls velocities\r\n")
            .read(b"groundspeed-kt = '100' (double)\r\naltitude-ft = '1001' (double)\r\n/> ")
            .build();
        let mut client = PropertyClient::new(stream, TIMEOUT);

        let snapshot = client.read_telemetry().await.unwrap();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.get("heading-deg"), Some(&dec("90")));
        // Later listing wins
        assert_eq!(snapshot.get("altitude-ft"), Some(&dec("1001")));
    }

    #[tokio::test]
    async fn test_prompt_split_across_reads() {
        let stream = Builder::new()
            .write(b"ls position\r\n")
            .read(b"latitude-deg = '45.0' (double)\r\n/")
            .read(b"> ")
            .build();
        let mut client = PropertyClient::new(stream, TIMEOUT);

        assert_eq!(client.list("position").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_eof_before_prompt_is_disconnect() {
        let stream = Builder::new()
            .write(b"ls position\r\n")
            .read(b"latitude-deg = '45.0' (double)\r\n")
            .build();
        let mut client = PropertyClient::new(stream, TIMEOUT);

        let err = client.list("position").await.unwrap_err();
        assert!(matches!(err, BridgeError::ConnectionClosed(_)));
        assert!(err.is_disconnect());
    }

    #[tokio::test]
    async fn test_silent_simulator_times_out() {
        let stream = Builder::new()
            .write(b"ls position\r\n")
            .wait(Duration::from_millis(200))
            .build();
        let mut client = PropertyClient::new(stream, Duration::from_millis(10));

        let err = client.list("position").await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(10)));
        assert!(err.is_disconnect());
    }

    #[tokio::test]
    async fn test_write_error_is_disconnect() {
        let stream = Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken"))
            .build();
        let mut client = PropertyClient::new(stream, TIMEOUT);

        assert!(client.list("position").await.unwrap_err().is_disconnect());
    }

    #[tokio::test]
    async fn test_set_sends_expression() {
        let stream = Builder::new()
            .write(b"set /controls/engines/engine[0]/throttle 0.5\r\n")
            .read(b"/> ")
            .build();
        let mut client = PropertyClient::new(stream, TIMEOUT);

        client.set("/controls/engines/engine[0]/throttle 0.5").await.unwrap();
    }

    #[tokio::test]
    async fn test_forwarder_through_simulator() {
        // Second "1,0.5" is suppressed, so only two requests reach the stream
        let stream = Builder::new()
            .write(b"set /controls/engines/engine[0]/throttle 0.5\r\n")
            .read(b"/> ")
            .write(b"set /controls/engines/engine[0]/throttle 0.6\r\n")
            .read(b"/> ")
            .build();
        let mut client = PropertyClient::new(stream, TIMEOUT);
        let mut forwarder = CommandForwarder::new();

        forwarder.forward_line("1,0.5", &mut client).await.unwrap();
        forwarder.forward_line("1,0.5", &mut client).await.unwrap();
        forwarder.forward_line("1,0.6", &mut client).await.unwrap();
        assert!(forwarder.forward_line("99,1", &mut client).await.is_err());
    }

    #[test]
    fn test_find_subsequence() {
        assert_eq!(find_subsequence(b"abc/> ", PROMPT), Some(3));
        assert_eq!(find_subsequence(b"abc/>", PROMPT), None);
        assert_eq!(find_subsequence(b"", PROMPT), None);
    }

    #[test]
    fn test_telemetry_paths() {
        assert_eq!(TELEMETRY_PATHS, &["position", "orientation/model", "velocities"]);
    }
}
