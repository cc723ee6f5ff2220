//! # Vehicle-side Adapter
//!
//! Exposes the serial port on the message bus: NMEA sentences arriving via
//! `uav.send_nmea_line` are written to serial, and command lines read from
//! serial are published as `uav.cmd` events.

use tokio::io::AsyncRead;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{LinkEvent, LinkState, Timing};
use crate::bus::{self, BusPublisher};
use crate::command::{CommandForwarder, CommandSink, Forwarded};
use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::serial::{LineReader, NmeaSerial, SharedLineSink};

/// Run the vehicle-side adapter until the process is stopped
///
/// The bus endpoint stays up while the serial port comes and goes; calls made
/// while the port is down are answered with an error.
///
/// # Errors
///
/// Returns an error if no serial device is configured, or if the bus
/// listener cannot be bound or fails.
pub async fn run(config: &Config) -> Result<()> {
    let serial_path = config.serial_port()?.to_string();
    let bus_addr = config.bus_addr()?;
    let timing = Timing::from(config);

    let serial = SharedLineSink::new();
    let publisher = BusPublisher::channel();

    let mut bus_task = tokio::spawn(bus::serve(bus_addr, serial.clone(), publisher.clone()));

    let relay = async {
        let mut state = LinkState::Disconnected;
        let mut forwarder = CommandForwarder::new();
        let mut publisher = publisher.clone();

        loop {
            match NmeaSerial::open(&serial_path, config.serial.baud_rate) {
                Ok(port) => {
                    state = state.on(LinkEvent::ConnectSucceeded);
                    let (mut commands, writer) = port.into_split();
                    serial.attach(Box::new(writer)).await;

                    let error = relay_commands(&mut commands, &mut forwarder, &mut publisher, &mut state).await;

                    serial.detach().await;
                    state = state.on(LinkEvent::TransportFailed);
                    warn!(
                        "Serial link lost ({}), reopening in {}s",
                        error,
                        timing.reconnect_delay.as_secs()
                    );
                }
                Err(e) => {
                    state = state.on(LinkEvent::ConnectFailed);
                    info!("{}, retrying after {}s", e, timing.reconnect_delay.as_secs());
                }
            }

            sleep(timing.reconnect_delay).await;
        }
    };

    tokio::select! {
        result = &mut bus_task => {
            match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(BridgeError::Bus(format!("bus task failed: {}", e))),
            }
        }
        _ = relay => Ok(()),
    }
}

/// Forward serial command lines to `sink` until the serial link fails
///
/// Returns the error that ended the link.
pub async fn relay_commands<R, S>(
    commands: &mut LineReader<R>,
    forwarder: &mut CommandForwarder,
    sink: &mut S,
    state: &mut LinkState,
) -> BridgeError
where
    R: AsyncRead + Unpin + Send,
    S: CommandSink + ?Sized,
{
    loop {
        let line = match commands.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return BridgeError::ConnectionClosed("serial port closed".to_string()),
            Err(e) => return e,
        };

        if line.trim().is_empty() {
            continue;
        }

        *state = state.on(LinkEvent::CycleStarted);
        let result = forwarder.forward_line(&line, sink).await;
        *state = state.on(LinkEvent::CycleFinished);

        match result {
            Ok(Forwarded::Sent) => {}
            Ok(Forwarded::Suppressed) => debug!("Suppressed repeated command: {}", line),
            Err(e) if e.is_disconnect() => return e,
            Err(e) => warn!("Rejected command '{}': {}", line, e),
        }
    }
}
