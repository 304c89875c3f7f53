use std::io;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = LinkError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("already connected; disconnect first")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,

    #[error("bind receive port {port}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("connect to {peer}")]
    Connect {
        peer: String,
        #[source]
        source: io::Error,
    },

    /// Transmit failed; the connection has been torn down.
    #[error("send {command:?} failed")]
    Send {
        command: String,
        #[source]
        source: io::Error,
    },

    /// No response within the budget; the connection has been torn down.
    #[error("no response to {command:?} within {timeout:?}")]
    ResponseTimeout { command: String, timeout: Duration },
}

impl LinkError {
    /// True for failures that closed the connection as a side effect.
    pub fn tore_down_link(&self) -> bool {
        matches!(self, LinkError::Send { .. } | LinkError::ResponseTimeout { .. })
    }
}
