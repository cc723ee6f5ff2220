//! # Message Bus Module
//!
//! JSON-lines message bus endpoint for the vehicle-side adapter.
//!
//! Every connected client can:
//! - call `uav.send_nmea_line` with one sentence, which is written to serial
//! - receive `uav.cmd` events carrying deduplicated vehicle commands
//!
//! ```text
//! -> {"type":"call","id":7,"procedure":"uav.send_nmea_line","args":["$GPGGA,..."]}
//! <- {"type":"result","id":7}
//! <- {"type":"event","topic":"uav.cmd","command_id":1,"params":["0.5"]}
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::command::{CommandRecord, CommandSink};
use crate::error::{BridgeError, Result};
use crate::serial::{LineReader, LineSink, LineWriter};

/// Remote procedure writing one NMEA sentence to the serial port
pub const PROC_SEND_NMEA_LINE: &str = "uav.send_nmea_line";

/// Topic carrying vehicle commands
pub const TOPIC_COMMAND: &str = "uav.cmd";

/// Events buffered per client before it starts lagging
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// One line on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMessage {
    /// Remote procedure invocation
    Call {
        id: u64,
        procedure: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    /// Successful completion of a call
    #[serde(rename = "result")]
    Reply { id: u64 },
    /// Failed call
    Error { id: u64, message: String },
    /// Publication on a topic
    Event {
        topic: String,
        command_id: i64,
        params: Vec<String>,
    },
}

impl BusMessage {
    fn error(id: u64, message: impl Into<String>) -> Self {
        BusMessage::Error {
            id,
            message: message.into(),
        }
    }
}

/// Publishes forwarded commands on [`TOPIC_COMMAND`]
#[derive(Debug, Clone)]
pub struct BusPublisher {
    events: broadcast::Sender<BusMessage>,
}

impl BusPublisher {
    pub fn new(events: broadcast::Sender<BusMessage>) -> Self {
        Self { events }
    }

    /// New publisher with its own event channel
    pub fn channel() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.events.subscribe()
    }
}

#[async_trait]
impl CommandSink for BusPublisher {
    async fn forward(&mut self, record: &CommandRecord, _expression: &str) -> Result<()> {
        let event = BusMessage::Event {
            topic: TOPIC_COMMAND.to_string(),
            command_id: record.id,
            params: record.params.clone(),
        };

        match self.events.send(event) {
            Ok(receivers) => debug!("Published {} {} to {} client(s)", TOPIC_COMMAND, record, receivers),
            Err(_) => debug!("Published {} {} with no clients connected", TOPIC_COMMAND, record),
        }
        Ok(())
    }
}

/// Accept bus clients forever
///
/// # Arguments
///
/// * `addr` - Listen address
/// * `sink` - Where `uav.send_nmea_line` writes; cloned per client
/// * `publisher` - Source of `uav.cmd` events
///
/// # Errors
///
/// Returns [`BridgeError::Io`] if the listener cannot be bound. Accept
/// failures after that are logged and retried.
pub async fn serve<L>(addr: SocketAddr, sink: L, publisher: BusPublisher) -> Result<()>
where
    L: LineSink + Clone + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!("Message bus listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept bus client: {}", e);
                sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };
        info!("Bus client connected: {}", peer);

        let sink = sink.clone();
        let events = publisher.subscribe();
        tokio::spawn(async move {
            match handle_client(stream, sink, events).await {
                Ok(()) => info!("Bus client disconnected: {}", peer),
                Err(e) => warn!("Bus client {} dropped: {}", peer, e),
            }
        });
    }
}

/// Serve one client until it disconnects
pub async fn handle_client<S, L>(
    stream: S,
    mut sink: L,
    mut events: broadcast::Receiver<BusMessage>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    L: LineSink,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut lines = LineReader::new(reader);
    let mut writer = LineWriter::new(writer);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }

                let reply = handle_line(&line, &mut sink).await;
                send(&mut writer, &reply).await?;
            }

            event = events.recv() => {
                match event {
                    Ok(event) => send(&mut writer, &event).await?,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Bus client lagging, {} event(s) dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }
        }
    }
}

/// Decode one client line and run it
async fn handle_line<L: LineSink>(line: &str, sink: &mut L) -> BusMessage {
    let message: BusMessage = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => return BusMessage::error(0, format!("invalid message: {}", e)),
    };

    match message {
        BusMessage::Call { id, procedure, args } => match call(&procedure, &args, sink).await {
            Ok(()) => BusMessage::Reply { id },
            Err(e) => BusMessage::error(id, e.to_string()),
        },
        _ => BusMessage::error(0, "only calls are accepted"),
    }
}

async fn call<L: LineSink>(procedure: &str, args: &[Value], sink: &mut L) -> Result<()> {
    match procedure {
        PROC_SEND_NMEA_LINE => {
            let line = match args {
                [Value::String(line)] => line,
                _ => {
                    return Err(BridgeError::Bus(format!(
                        "{} expects exactly one string argument",
                        PROC_SEND_NMEA_LINE
                    )))
                }
            };
            if line.contains(['\r', '\n']) {
                return Err(BridgeError::Bus(format!(
                    "{} argument must be a single line",
                    PROC_SEND_NMEA_LINE
                )));
            }
            debug!("Writing NMEA sentence from bus: {}", line);
            sink.write_line(line).await
        }
        other => Err(BridgeError::Bus(format!("no such procedure: {}", other))),
    }
}

async fn send<W>(writer: &mut LineWriter<W>, message: &BusMessage) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let json = serde_json::to_string(message)?;
    writer.write_line(&json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::port_trait::mocks::MockLineSink;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[test]
    fn test_message_json_shapes() {
        let event = BusMessage::Event {
            topic: TOPIC_COMMAND.into(),
            command_id: 1,
            params: vec!["0.5".into()],
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "event", "topic": "uav.cmd", "command_id": 1, "params": ["0.5"]})
        );
        assert_eq!(
            serde_json::to_value(BusMessage::Reply { id: 3 }).unwrap(),
            json!({"type": "result", "id": 3})
        );

        let call: BusMessage = serde_json::from_str(
            r#"{"type":"call","id":7,"procedure":"uav.send_nmea_line","args":["$GPGGA"]}"#,
        )
        .unwrap();
        assert_eq!(
            call,
            BusMessage::Call {
                id: 7,
                procedure: PROC_SEND_NMEA_LINE.into(),
                args: vec![json!("$GPGGA")],
            }
        );
    }

    #[tokio::test]
    async fn test_send_nmea_line_call_writes_to_sink() {
        let mut sink = MockLineSink::new();
        let reply = handle_line(
            r#"{"type":"call","id":1,"procedure":"uav.send_nmea_line","args":["$EXINJ,90,1,2,90,NA"]}"#,
            &mut sink,
        )
        .await;

        assert_eq!(reply, BusMessage::Reply { id: 1 });
        assert_eq!(sink.get_written_lines(), vec!["$EXINJ,90,1,2,90,NA"]);
    }

    #[tokio::test]
    async fn test_bad_calls_are_answered_with_errors() {
        let mut sink = MockLineSink::new();

        let reply = handle_line(r#"{"type":"call","id":2,"procedure":"uav.reboot"}"#, &mut sink).await;
        assert!(matches!(reply, BusMessage::Error { id: 2, .. }));

        let reply = handle_line(
            r#"{"type":"call","id":3,"procedure":"uav.send_nmea_line","args":[1]}"#,
            &mut sink,
        )
        .await;
        assert!(matches!(reply, BusMessage::Error { id: 3, .. }));

        let reply = handle_line("not json", &mut sink).await;
        assert!(matches!(reply, BusMessage::Error { id: 0, .. }));

        assert!(sink.get_written_lines().is_empty());
    }

    #[tokio::test]
    async fn test_multi_line_argument_is_rejected() {
        let mut sink = MockLineSink::new();

        for args in [r#"["$GPGGA\n$GPRMC"]"#, r#"["$GPGGA\r"]"#] {
            let line = format!(
                r#"{{"type":"call","id":5,"procedure":"uav.send_nmea_line","args":{}}}"#,
                args
            );
            let reply = handle_line(&line, &mut sink).await;
            assert!(matches!(reply, BusMessage::Error { id: 5, .. }), "{:?}", reply);
        }

        assert!(sink.get_written_lines().is_empty());
    }

    #[tokio::test]
    async fn test_serve_keeps_listening_between_clients() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = MockLineSink::new();
        let server = tokio::spawn(serve(addr, sink.clone(), BusPublisher::channel()));

        for id in 1..=2u64 {
            let mut stream = loop {
                match tokio::net::TcpStream::connect(addr).await {
                    Ok(stream) => break stream,
                    Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
                }
            };
            let call = format!(
                "{{\"type\":\"call\",\"id\":{},\"procedure\":\"uav.send_nmea_line\",\"args\":[\"$EXINJ\"]}}\n",
                id
            );
            stream.write_all(call.as_bytes()).await.unwrap();

            let mut replies = BufReader::new(stream).lines();
            let reply: BusMessage = serde_json::from_str(&replies.next_line().await.unwrap().unwrap()).unwrap();
            assert_eq!(reply, BusMessage::Reply { id });
        }

        assert!(!server.is_finished());
        assert_eq!(sink.get_written_lines().len(), 2);
        server.abort();
    }

    #[tokio::test]
    async fn test_serial_failure_is_reported_to_caller() {
        let mut sink = MockLineSink::new();
        sink.set_write_error();

        let reply = handle_line(
            r#"{"type":"call","id":4,"procedure":"uav.send_nmea_line","args":["$GPGGA"]}"#,
            &mut sink,
        )
        .await;
        assert!(matches!(reply, BusMessage::Error { id: 4, .. }));
    }

    #[tokio::test]
    async fn test_publisher_without_clients_is_ok() {
        let mut publisher = BusPublisher::channel();
        let record = CommandRecord::new(1, vec!["0.5".into()]);
        assert!(publisher.forward(&record, "ignored").await.is_ok());
    }

    #[tokio::test]
    async fn test_client_session() {
        let publisher = BusPublisher::channel();
        let sink = MockLineSink::new();
        let (client, server) = tokio::io::duplex(4096);

        let session = tokio::spawn(handle_client(server, sink.clone(), publisher.subscribe()));

        let (client_read, mut client_write) = tokio::io::split(client);
        let mut replies = BufReader::new(client_read).lines();

        client_write
            .write_all(b"{\"type\":\"call\",\"id\":9,\"procedure\":\"uav.send_nmea_line\",\"args\":[\"$GPRMC\"]}\n")
            .await
            .unwrap();
        let reply: BusMessage = serde_json::from_str(&replies.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply, BusMessage::Reply { id: 9 });
        assert_eq!(sink.get_written_lines(), vec!["$GPRMC"]);

        let mut publisher_handle = publisher.clone();
        publisher_handle
            .forward(&CommandRecord::new(2, vec!["0.3".into()]), "ignored")
            .await
            .unwrap();
        let event: BusMessage = serde_json::from_str(&replies.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(
            event,
            BusMessage::Event {
                topic: TOPIC_COMMAND.into(),
                command_id: 2,
                params: vec!["0.3".into()],
            }
        );

        drop(client_write);
        drop(replies);
        session.await.unwrap().unwrap();
    }
}
