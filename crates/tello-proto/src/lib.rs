//! Wire-level types for the Tello SDK control channel: telemetry state lines,
//! command responses and the command vocabulary.

pub mod command;
pub mod response;
pub mod telemetry;

pub use command::{CommandError, ControlCommand, Direction, FlipDirection, Query};
pub use response::{CommandResponse, ResponseCode};
pub use telemetry::{DecodeError, TelemetryFrame, TELEMETRY_PREFIX};
