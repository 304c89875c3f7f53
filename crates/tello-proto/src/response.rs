use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    Ok,
    Error,
    Value,
    /// Synthesized locally when there is no socket; never seen on the wire.
    NotConnected,
}

/// A non-telemetry datagram from the drone, or a local "not connected" stand-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub raw: String,
    pub code: ResponseCode,
}

impl CommandResponse {
    pub fn classify(raw: &str) -> Self {
        Self { raw: raw.to_string(), code: ResponseCode::classify(raw) }
    }

    pub fn not_connected() -> Self {
        Self { raw: "Not connected".to_string(), code: ResponseCode::NotConnected }
    }

    pub fn is_ok(&self) -> bool {
        self.code == ResponseCode::Ok
    }

    /// Raw text without line terminators, for logs.
    pub fn text(&self) -> &str {
        self.raw.trim_end_matches(['\r', '\n'])
    }
}

impl ResponseCode {
    pub fn classify(raw: &str) -> Self {
        let text = raw.trim_end_matches('\n').trim_end_matches('\r');
        if text == "ok" {
            ResponseCode::Ok
        } else if text.starts_with("error") {
            ResponseCode::Error
        } else {
            ResponseCode::Value
        }
    }
}

impl fmt::Display for CommandResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            ResponseCode::Ok => f.write_str("OK"),
            ResponseCode::Error => write!(f, "ERROR ({})", self.text()),
            ResponseCode::Value => f.write_str(self.text()),
            ResponseCode::NotConnected => f.write_str("Not Connected"),
        }
    }
}
