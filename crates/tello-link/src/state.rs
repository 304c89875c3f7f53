use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use tello_proto::TelemetryFrame;

use crate::Endpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkState {
    Disconnected,
    Listening,
}

/// Per-connection counters, reset on connect.
#[derive(Debug, Clone, Default)]
pub(crate) struct LinkCounters {
    pub responses: u64,
    pub frames: u64,
    pub last_telemetry: Option<TelemetryFrame>,
}

/// Point-in-time view of the link.
#[derive(Debug, Clone)]
pub struct LinkStatus {
    pub state: LinkState,
    pub endpoint: Endpoint,
    pub local_addr: Option<SocketAddr>,
    pub responses_received: u64,
    pub frames_received: u64,
    pub last_telemetry: Option<TelemetryFrame>,
    pub recording: Option<Duration>,
}

impl LinkStatus {
    pub fn is_listening(&self) -> bool {
        self.state == LinkState::Listening
    }

    pub fn battery(&self) -> Option<i32> {
        self.last_telemetry.as_ref().map(|f| f.battery)
    }
}
