use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tello_proto::{CommandResponse, DecodeError, TelemetryFrame};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{LinkError, Result};
use crate::observer::{DisconnectReason, LinkObserver, LinkStateChange, NoopObserver};
use crate::recording::{Recorder, Recording};
use crate::state::{LinkCounters, LinkState, LinkStatus};
use crate::Endpoint;

/// Largest datagram we accept.
const MAX_DATAGRAM_SIZE: usize = 2048;

/// Responses queued while no correlated call is waiting. Drained before each call.
const RESPONSE_BACKLOG: usize = 16;

/// Control channel to one drone.
///
/// Cloning is cheap; all clones share one socket, one receive task and one
/// recording. The socket and receive task go away on disconnect, on any
/// transport error, or when the last clone is dropped.
#[derive(Clone)]
pub struct TelloLink {
    pub(crate) shared: Arc<Shared>,
}

pub(crate) struct Shared {
    endpoint: Endpoint,
    observer: Arc<dyn LinkObserver>,
    session: Mutex<Option<Session>>,
    generation: AtomicU64,
    recorder: Mutex<Recorder>,
    counters: Mutex<LinkCounters>,
    response_tx: mpsc::Sender<CommandResponse>,
    /// Held for the whole of a correlated call, so at most one is in flight.
    pub(crate) responses: tokio::sync::Mutex<mpsc::Receiver<CommandResponse>>,
}

struct Session {
    socket: Arc<UdpSocket>,
    reader: JoinHandle<()>,
    generation: u64,
    local_addr: Option<SocketAddr>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TelloLink {
    pub fn new(endpoint: Endpoint, observer: Arc<dyn LinkObserver>) -> Self {
        let (response_tx, response_rx) = mpsc::channel(RESPONSE_BACKLOG);
        Self {
            shared: Arc::new(Shared {
                endpoint,
                observer,
                session: Mutex::new(None),
                generation: AtomicU64::new(0),
                recorder: Mutex::new(Recorder::new()),
                counters: Mutex::new(LinkCounters::default()),
                response_tx,
                responses: tokio::sync::Mutex::new(response_rx),
            }),
        }
    }

    pub fn without_observer(endpoint: Endpoint) -> Self {
        Self::new(endpoint, Arc::new(NoopObserver))
    }

    pub fn state(&self) -> LinkState {
        if self.is_connected() {
            LinkState::Listening
        } else {
            LinkState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.shared.session).is_some()
    }

    /// Bind the receive port, associate with the drone and start the receive task.
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Err(LinkError::AlreadyConnected);
        }

        let ep = &self.shared.endpoint;
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, ep.receive_port))
            .await
            .map_err(|source| LinkError::Bind { port: ep.receive_port, source })?;
        socket
            .connect((ep.address.as_str(), ep.send_port))
            .await
            .map_err(|source| LinkError::Connect { peer: ep.peer(), source })?;
        let local_addr = socket.local_addr().ok();
        let socket = Arc::new(socket);

        {
            let mut session = lock(&self.shared.session);
            // lost a race with another connect
            if session.is_some() {
                return Err(LinkError::AlreadyConnected);
            }
            let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed) + 1;
            lock(&self.shared.recorder).reset_origin();
            *lock(&self.shared.counters) = LinkCounters::default();

            let reader = tokio::spawn(receive_loop(
                Arc::downgrade(&self.shared),
                socket.clone(),
                generation,
            ));
            *session = Some(Session { socket, reader, generation, local_addr });
        }

        info!("link: listening on {:?}, peer {}", local_addr, ep.peer());
        self.shared.observer.on_state_changed(&LinkStateChange::listening());
        Ok(())
    }

    /// Close the socket. Any active recording stops; its frames stay available
    /// through [`TelloLink::end_recording`]. No-op when already disconnected.
    pub fn disconnect(&self) {
        self.shared.teardown(None, DisconnectReason::Requested);
    }

    /// Legacy connect button: disconnect when listening, connect otherwise.
    pub async fn toggle(&self) -> Result<LinkState> {
        if self.is_connected() {
            self.disconnect();
        } else {
            self.connect().await?;
        }
        Ok(self.state())
    }

    /// Send one command datagram without waiting for a reply.
    ///
    /// A transport failure tears the connection down before the error is returned.
    pub async fn send(&self, command: &str) -> Result<()> {
        self.shared.transmit(command).await.map(|_| ())
    }

    pub fn start_recording(&self) {
        let mut recorder = lock(&self.shared.recorder);
        if recorder.is_active() {
            warn!("link: recording restarted, previous frames discarded");
        }
        recorder.start();
        info!("link: recording started");
    }

    pub fn stop_recording(&self) {
        lock(&self.shared.recorder).stop();
    }

    /// Stop recording and take the captured frames.
    pub fn end_recording(&self) -> Recording {
        let recording = lock(&self.shared.recorder).end();
        info!("link: recording ended with {} frames", recording.len());
        recording
    }

    pub fn is_recording(&self) -> bool {
        lock(&self.shared.recorder).is_active()
    }

    pub fn recording_elapsed(&self) -> Option<Duration> {
        lock(&self.shared.recorder).elapsed()
    }

    pub fn status(&self) -> LinkStatus {
        let local_addr = lock(&self.shared.session).as_ref().map(|s| s.local_addr);
        let counters = lock(&self.shared.counters).clone();
        LinkStatus {
            state: if local_addr.is_some() { LinkState::Listening } else { LinkState::Disconnected },
            endpoint: self.shared.endpoint.clone(),
            local_addr: local_addr.flatten(),
            responses_received: counters.responses,
            frames_received: counters.frames,
            last_telemetry: counters.last_telemetry,
            recording: self.recording_elapsed(),
        }
    }
}

impl Shared {
    fn current(&self) -> Option<(Arc<UdpSocket>, u64)> {
        lock(&self.session).as_ref().map(|s| (s.socket.clone(), s.generation))
    }

    /// Returns the generation of the connection the datagram went out on.
    pub(crate) async fn transmit(&self, command: &str) -> Result<u64> {
        let (socket, generation) = self.current().ok_or(LinkError::NotConnected)?;
        debug!("link: send {:?}", command);
        match socket.send(command.as_bytes()).await {
            Ok(_) => Ok(generation),
            Err(source) => {
                self.teardown(Some(generation), DisconnectReason::SendFailure(source.to_string()));
                Err(LinkError::Send { command: command.to_string(), source })
            }
        }
    }

    /// Drop the connection if it is still the one identified by `generation`
    /// (any connection when `None`). Returns whether anything was torn down.
    pub(crate) fn teardown(&self, generation: Option<u64>, reason: DisconnectReason) -> bool {
        let session = {
            let mut guard = lock(&self.session);
            let current = guard
                .as_ref()
                .is_some_and(|s| generation.map_or(true, |g| g == s.generation));
            if current {
                guard.take()
            } else {
                None
            }
        };
        let Some(session) = session else {
            return false;
        };
        drop(session);

        {
            let mut recorder = lock(&self.recorder);
            recorder.stop();
            recorder.reset_origin();
        }

        match &reason {
            DisconnectReason::Requested => info!("link: disconnected"),
            other => warn!("link: connection dropped: {:?}", other),
        }
        self.observer.on_state_changed(&LinkStateChange::disconnected(reason));
        true
    }

    fn dispatch(&self, text: &str) -> std::result::Result<(), DecodeError> {
        if TelemetryFrame::is_telemetry(text) {
            let frame = {
                let mut recorder = lock(&self.recorder);
                let frame = TelemetryFrame::parse(recorder.elapsed_ms(), text)?;
                recorder.push(frame.clone());
                frame
            };
            {
                let mut counters = lock(&self.counters);
                counters.frames += 1;
                counters.last_telemetry = Some(frame.clone());
            }
            self.observer.on_telemetry(&frame);
        } else {
            let response = CommandResponse::classify(text);
            debug!("link: response {:?}", response.text());
            lock(&self.counters).responses += 1;
            if self.response_tx.try_send(response.clone()).is_err() {
                debug!("link: response backlog full, dropping {:?}", response.text());
            }
            self.observer.on_response(&response);
        }
        Ok(())
    }
}

async fn receive_loop(shared: Weak<Shared>, socket: Arc<UdpSocket>, generation: u64) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let received = socket.recv(&mut buf).await;
        let Some(link) = shared.upgrade() else {
            return;
        };
        let reason = match received {
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]);
                match link.dispatch(&text) {
                    Ok(()) => continue,
                    Err(e) => DisconnectReason::MalformedTelemetry(e.to_string()),
                }
            }
            Err(e) => DisconnectReason::ConnectionLost(e.to_string()),
        };
        link.teardown(Some(generation), reason);
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinkEvent;

    fn loopback(send_port: u16) -> Endpoint {
        Endpoint::new("127.0.0.1", send_port, 0)
    }

    #[tokio::test]
    async fn send_without_socket_is_not_connected() {
        let link = TelloLink::without_observer(loopback(9));
        assert!(matches!(link.send("command").await, Err(LinkError::NotConnected)));
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn connect_twice_is_rejected() {
        let link = TelloLink::without_observer(loopback(9));
        link.connect().await.unwrap();
        assert!(matches!(link.connect().await, Err(LinkError::AlreadyConnected)));
        assert!(link.is_connected());
        link.disconnect();
        assert!(!link.is_connected());
        link.disconnect();
    }

    #[tokio::test]
    async fn toggle_flips_state() {
        let link = TelloLink::without_observer(loopback(9));
        assert_eq!(link.toggle().await.unwrap(), LinkState::Listening);
        assert_eq!(link.toggle().await.unwrap(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn stale_generation_does_not_tear_down_newer_connection() {
        let link = TelloLink::without_observer(loopback(9));
        link.connect().await.unwrap();
        link.disconnect();
        link.connect().await.unwrap();
        let torn = link.shared.teardown(Some(1), DisconnectReason::ConnectionLost("late".into()));
        assert!(!torn);
        assert!(link.is_connected());
    }

    #[tokio::test]
    async fn disconnect_stops_recording_but_keeps_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = TelloLink::new(loopback(9), Arc::new(tx));
        link.connect().await.unwrap();
        link.start_recording();
        link.shared
            .dispatch("mid:1;x:0;y:0;z:0;mpry:0,0,0;pitch:0;roll:0;yaw:0;vgx:0;vgy:0;vgz:0;templ:1;temph:2;tof:3;h:4;bat:50;baro:0;time:0;agx:0;agy:0;agz:0;\r\n")
            .unwrap();
        link.disconnect();
        assert!(!link.is_recording());
        assert_eq!(link.end_recording().len(), 1);

        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let LinkEvent::State(change) = event {
                states.push(change);
            }
        }
        assert_eq!(
            states,
            vec![LinkStateChange::listening(), LinkStateChange::disconnected(DisconnectReason::Requested)]
        );
    }

    #[tokio::test]
    async fn status_counts_traffic() {
        let link = TelloLink::without_observer(loopback(9));
        link.connect().await.unwrap();
        link.shared.dispatch("ok\r\n").unwrap();
        link.shared
            .dispatch("mid:1;x:0;y:0;z:0;mpry:0,0,0;pitch:0;roll:0;yaw:0;vgx:0;vgy:0;vgz:0;templ:1;temph:2;tof:3;h:4;bat:77;baro:0;time:0;agx:0;agy:0;agz:0;")
            .unwrap();
        let status = link.status();
        assert!(status.is_listening());
        assert_eq!(status.responses_received, 1);
        assert_eq!(status.frames_received, 1);
        assert_eq!(status.battery(), Some(77));
        assert!(status.local_addr.is_some());
    }

    #[tokio::test]
    async fn malformed_state_line_is_an_error() {
        let link = TelloLink::without_observer(loopback(9));
        assert!(link.shared.dispatch("mid:1;x:0;y:broken").is_err());
    }
}
