use std::time::Duration;

use tello_proto::CommandResponse;
use tracing::{debug, warn};

use crate::error::{LinkError, Result};
use crate::link::TelloLink;
use crate::observer::DisconnectReason;

impl TelloLink {
    /// Send `command` and wait up to `timeout_s` seconds for the next
    /// non-telemetry datagram.
    ///
    /// Returns a `NotConnected` response, not an error, when there is no
    /// socket. On timeout the connection is torn down and
    /// [`LinkError::ResponseTimeout`] is returned. Concurrent callers queue up;
    /// only one correlated call is in flight at a time.
    pub async fn send_and_await(&self, command: &str, timeout_s: u64) -> Result<CommandResponse> {
        if !self.is_connected() {
            return Ok(CommandResponse::not_connected());
        }

        let mut responses = self.shared.responses.lock().await;

        // replies nobody waited for
        let mut stale = 0usize;
        while responses.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!("link: discarded {} unsolicited responses", stale);
        }

        let generation = match self.shared.transmit(command).await {
            Ok(g) => g,
            Err(LinkError::NotConnected) => return Ok(CommandResponse::not_connected()),
            Err(e) => return Err(e),
        };

        let timeout = Duration::from_secs(timeout_s);
        match tokio::time::timeout(timeout, responses.recv()).await {
            Ok(Some(response)) => {
                debug!("link: {:?} -> {:?}", command, response.code);
                Ok(response)
            }
            _ => {
                warn!("link: no response to {:?} within {}s", command, timeout_s);
                self.shared.teardown(Some(generation), DisconnectReason::ResponseTimeout);
                Err(LinkError::ResponseTimeout { command: command.to_string(), timeout })
            }
        }
    }
}
