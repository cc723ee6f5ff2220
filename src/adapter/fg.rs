//! # Simulator-side Adapter
//!
//! Polls the simulator, writes NMEA sentences to the serial port and
//! forwards command lines read from the serial port back to the simulator.

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{LinkEvent, LinkState, Timing};
use crate::command::{CommandForwarder, Forwarded};
use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::nmea::{encode_sentences, EncoderOptions, NmeaTriple};
use crate::props::PropertyClient;
use crate::serial::{LineReader, LineSink, NmeaSerial};

/// Run the simulator-side adapter until the process is stopped
///
/// Transport failures are retried forever after the reconnect delay.
///
/// # Errors
///
/// Returns [`BridgeError::MissingSerialDevice`] if no serial device is
/// configured.
pub async fn run(config: &Config) -> Result<()> {
    let serial_path = config.serial_port()?.to_string();
    let timing = Timing::from(config);
    let options = config.encoder_options();
    let host = config.simulator.host.as_str();
    let port = config.simulator.port;

    let mut state = LinkState::Disconnected;
    let mut forwarder = CommandForwarder::new();

    loop {
        let connected = async {
            let client = PropertyClient::connect(host, port, timing.response_timeout).await?;
            let serial = NmeaSerial::open(&serial_path, config.serial.baud_rate)?;
            Ok::<_, BridgeError>((client, serial))
        }
        .await;

        match connected {
            Ok((mut client, serial)) => {
                state = state.on(LinkEvent::ConnectSucceeded);
                let (mut commands, mut sentences) = serial.into_split();

                let error = run_session(
                    &mut client,
                    &mut sentences,
                    &mut commands,
                    &mut forwarder,
                    &mut state,
                    &options,
                    &timing,
                )
                .await;

                state = state.on(LinkEvent::TransportFailed);
                warn!(
                    "Connection lost ({}), reconnecting in {}s",
                    error,
                    timing.reconnect_delay.as_secs()
                );
            }
            Err(e) => {
                state = state.on(LinkEvent::ConnectFailed);
                info!(
                    "Connection to {}:{} failed ({}), retrying after {}s",
                    host,
                    port,
                    e,
                    timing.reconnect_delay.as_secs()
                );
            }
        }

        sleep(timing.reconnect_delay).await;
    }
}

/// Poll and forward on one connected session until a transport fails
///
/// Returns the error that ended the session.
pub async fn run_session<S, W, R>(
    client: &mut PropertyClient<S>,
    sentences: &mut W,
    commands: &mut LineReader<R>,
    forwarder: &mut CommandForwarder,
    state: &mut LinkState,
    options: &EncoderOptions,
    timing: &Timing,
) -> BridgeError
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    W: LineSink + ?Sized,
    R: AsyncRead + Unpin + Send,
{
    let mut ticker = interval(timing.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                *state = state.on(LinkEvent::CycleStarted);
                let result = poll_cycle(client, sentences, options, Utc::now()).await;
                *state = state.on(LinkEvent::CycleFinished);

                match result {
                    Ok(_) => {}
                    Err(e) if e.is_disconnect() => return e,
                    Err(e) => warn!("Skipping cycle: {}", e),
                }
            }

            line = commands.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if let Err(e) = handle_command(&line, client, forwarder).await {
                            return e;
                        }
                    }
                    Ok(None) => {
                        return BridgeError::ConnectionClosed("serial port closed".to_string());
                    }
                    Err(e) => return e,
                }
            }
        }
    }
}

/// Read telemetry, encode it and write the three sentences
///
/// # Errors
///
/// Transport errors from either side, or the encoder's missing/non-numeric
/// field errors (nothing is written in that case).
pub async fn poll_cycle<S, W>(
    client: &mut PropertyClient<S>,
    sentences: &mut W,
    options: &EncoderOptions,
    now: DateTime<Utc>,
) -> Result<NmeaTriple>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    W: LineSink + ?Sized,
{
    let snapshot = client.read_telemetry().await?;
    let triple = encode_sentences(&snapshot, now, options)?;

    for sentence in triple.sentences() {
        debug!("Writing NMEA sentence: {}", sentence);
        sentences.write_line(sentence).await?;
    }

    Ok(triple)
}

/// Forward one serial command line to the simulator
///
/// Rejected commands are logged and dropped; only transport failures are
/// returned.
pub async fn handle_command<S>(
    line: &str,
    client: &mut PropertyClient<S>,
    forwarder: &mut CommandForwarder,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    if line.trim().is_empty() {
        return Ok(());
    }

    match forwarder.forward_line(line, client).await {
        Ok(Forwarded::Sent) => Ok(()),
        Ok(Forwarded::Suppressed) => {
            debug!("Suppressed repeated command: {}", line);
            Ok(())
        }
        Err(e) if e.is_disconnect() => Err(e),
        Err(e) => {
            warn!("Rejected command '{}': {}", line, e);
            Ok(())
        }
    }
}
