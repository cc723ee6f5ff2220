//! # Adapter Module
//!
//! The two control loops built on the leaf modules:
//!
//! - [`fg`]: simulator telemetry -> NMEA on serial, serial commands -> simulator
//! - [`uav`]: bus calls -> NMEA on serial, serial commands -> bus events
//!
//! Both loops follow the same [`LinkState`] machine: connect, poll until the
//! transport fails, wait the reconnect delay, connect again.

pub mod fg;
pub mod uav;

use std::time::Duration;

use crate::config::Config;

/// Connection state of an adapter control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No transport; waiting to (re)connect
    #[default]
    Disconnected,
    /// Transport open, idle between cycles
    Connected,
    /// A poll cycle or command is in flight
    Polling,
}

/// Something that happened to the transport or the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    ConnectSucceeded,
    ConnectFailed,
    CycleStarted,
    CycleFinished,
    TransportFailed,
}

impl LinkState {
    /// Next state after `event`
    pub fn on(self, event: LinkEvent) -> LinkState {
        use LinkEvent::*;
        use LinkState::*;

        match (self, event) {
            (_, TransportFailed) => Disconnected,
            (Disconnected, ConnectSucceeded) => Connected,
            (Disconnected, _) => Disconnected,
            (Connected, CycleStarted) => Polling,
            (Polling, CycleFinished) => Connected,
            (state, _) => state,
        }
    }
}

/// Loop timing shared by both adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub poll_interval: Duration,
    pub reconnect_delay: Duration,
    pub response_timeout: Duration,
}

impl From<&Config> for Timing {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.adapter.poll_interval_ms),
            reconnect_delay: Duration::from_millis(config.adapter.reconnect_delay_ms),
            response_timeout: Duration::from_millis(config.simulator.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_cycle_disconnect() {
        let state = LinkState::default();
        assert_eq!(state, LinkState::Disconnected);

        let state = state.on(LinkEvent::ConnectSucceeded);
        assert_eq!(state, LinkState::Connected);

        let state = state.on(LinkEvent::CycleStarted);
        assert_eq!(state, LinkState::Polling);

        let state = state.on(LinkEvent::CycleFinished);
        assert_eq!(state, LinkState::Connected);

        let state = state.on(LinkEvent::CycleStarted).on(LinkEvent::TransportFailed);
        assert_eq!(state, LinkState::Disconnected);
    }

    #[test]
    fn test_failed_connect_stays_disconnected() {
        assert_eq!(
            LinkState::Disconnected.on(LinkEvent::ConnectFailed),
            LinkState::Disconnected
        );
        // Cycles cannot start without a transport
        assert_eq!(
            LinkState::Disconnected.on(LinkEvent::CycleStarted),
            LinkState::Disconnected
        );
    }

    #[test]
    fn test_transport_failure_from_any_state() {
        for state in [LinkState::Disconnected, LinkState::Connected, LinkState::Polling] {
            assert_eq!(state.on(LinkEvent::TransportFailed), LinkState::Disconnected);
        }
    }

    #[test]
    fn test_timing_from_config() {
        let timing = Timing::from(&Config::default());
        assert_eq!(timing.poll_interval, Duration::from_millis(500));
        assert_eq!(timing.reconnect_delay, Duration::from_secs(5));
        assert_eq!(timing.response_timeout, Duration::from_secs(2));
    }
}
