//! Line-oriented flight scripts.
//!
//! ```text
//! // comments and blank lines are skipped
//! command
//! set timeout 20
//! takeoff
//! delay 5
//! land
//! ```
//!
//! Every command must be answered with `ok`. Anything else sends
//! `emergency` and ends the run.

pub mod doctor;
pub mod parse;
pub mod runner;

pub use parse::{ParseError, Script, Step};
pub use runner::{ScriptError, ScriptReport, ScriptRunner};

use serde::Deserialize;

pub const DEFAULT_TIMEOUT_S: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    /// Response timeout for each command until a `set timeout` line changes it.
    #[serde(default = "default_timeout_s")]
    pub default_timeout_s: u64,
}

fn default_timeout_s() -> u64 {
    DEFAULT_TIMEOUT_S
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self { default_timeout_s: DEFAULT_TIMEOUT_S }
    }
}
