pub mod doctor;
pub mod error;
pub mod observer;
pub mod state;

mod correlate;
mod link;
mod recording;

pub use error::{LinkError, Result};
pub use link::TelloLink;
pub use observer::{DisconnectReason, LinkEvent, LinkObserver, LinkStateChange, NoopObserver};
pub use recording::Recording;
pub use state::{LinkState, LinkStatus};

use serde::Deserialize;

pub const DEFAULT_ADDRESS: &str = "192.168.10.1";
pub const DEFAULT_SEND_PORT: u16 = 8889;
pub const DEFAULT_RECEIVE_PORT: u16 = 8890;

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Drone address. The drone's own access point uses 192.168.10.1.
    #[serde(default = "default_address")]
    pub address: String,

    /// Remote port commands are sent to.
    #[serde(default = "default_send_port")]
    pub send_port: u16,

    /// Local port we bind; responses and state lines arrive here.
    /// 0 lets the OS pick one.
    #[serde(default = "default_receive_port")]
    pub receive_port: u16,
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_send_port() -> u16 {
    DEFAULT_SEND_PORT
}

fn default_receive_port() -> u16 {
    DEFAULT_RECEIVE_PORT
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            send_port: default_send_port(),
            receive_port: default_receive_port(),
        }
    }
}

/// Where the control channel points. Fixed for the lifetime of a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub send_port: u16,
    pub receive_port: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, send_port: u16, receive_port: u16) -> Self {
        Self { address: address.into(), send_port, receive_port }
    }

    pub fn peer(&self) -> String {
        format!("{}:{}", self.address, self.send_port)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS, DEFAULT_SEND_PORT, DEFAULT_RECEIVE_PORT)
    }
}

impl From<&LinkConfig> for Endpoint {
    fn from(cfg: &LinkConfig) -> Self {
        Self::new(cfg.address.clone(), cfg.send_port, cfg.receive_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_drone_access_point() {
        let cfg: LinkConfig = toml::from_str("").unwrap();
        assert_eq!(Endpoint::from(&cfg), Endpoint::default());
        assert_eq!(Endpoint::default().peer(), "192.168.10.1:8889");
    }

    #[test]
    fn config_overrides() {
        let cfg: LinkConfig = toml::from_str("address = \"127.0.0.1\"\nreceive_port = 0").unwrap();
        let ep = Endpoint::from(&cfg);
        assert_eq!(ep, Endpoint::new("127.0.0.1", 8889, 0));
    }
}
