use tello_proto::{CommandResponse, TelemetryFrame};
use tokio::sync::mpsc;

use crate::state::LinkState;

/// Why a connection left the listening state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    Requested,
    /// Receive failed at the transport level.
    ConnectionLost(String),
    SendFailure(String),
    ResponseTimeout,
    /// A state line did not decode; the stream is considered out of sync.
    MalformedTelemetry(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStateChange {
    pub state: LinkState,
    /// Set when `state` is `Disconnected`.
    pub reason: Option<DisconnectReason>,
}

impl LinkStateChange {
    pub fn listening() -> Self {
        Self { state: LinkState::Listening, reason: None }
    }

    pub fn disconnected(reason: DisconnectReason) -> Self {
        Self { state: LinkState::Disconnected, reason: Some(reason) }
    }
}

/// Callbacks fired by the link.
///
/// Response and telemetry callbacks run on the receive task, in datagram
/// arrival order. Implementations must not block; hand the value off to your
/// own task or thread instead.
pub trait LinkObserver: Send + Sync {
    fn on_response(&self, _response: &CommandResponse) {}

    fn on_telemetry(&self, _frame: &TelemetryFrame) {}

    fn on_state_changed(&self, _change: &LinkStateChange) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LinkObserver for NoopObserver {}

#[derive(Debug, Clone)]
pub enum LinkEvent {
    Response(CommandResponse),
    Telemetry(TelemetryFrame),
    State(LinkStateChange),
}

/// Forward every callback into a channel. Send errors (receiver gone) are ignored.
impl LinkObserver for mpsc::UnboundedSender<LinkEvent> {
    fn on_response(&self, response: &CommandResponse) {
        let _ = self.send(LinkEvent::Response(response.clone()));
    }

    fn on_telemetry(&self, frame: &TelemetryFrame) {
        let _ = self.send(LinkEvent::Telemetry(frame.clone()));
    }

    fn on_state_changed(&self, change: &LinkStateChange) {
        let _ = self.send(LinkEvent::State(change.clone()));
    }
}
