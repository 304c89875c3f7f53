use std::time::{Duration, Instant};

use tello_link::{LinkError, TelloLink};
use tello_proto::{CommandResponse, ControlCommand};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::parse::{ParseError, Script, Step};
use crate::DEFAULT_TIMEOUT_S;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("link is not connected")]
    NotConnected,

    /// The drone answered something other than `ok`; `emergency` was sent.
    #[error("line {line}: {command:?} answered {response}, script aborted")]
    Aborted { line: usize, command: String, response: CommandResponse },

    #[error("line {line}: {command:?}")]
    Link {
        line: usize,
        command: String,
        #[source]
        source: LinkError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReport {
    pub commands: usize,
    pub elapsed: Duration,
}

/// Runs scripts over a link, one command in flight at a time.
#[derive(Clone)]
pub struct ScriptRunner {
    link: TelloLink,
    default_timeout_s: u64,
}

impl ScriptRunner {
    pub fn new(link: TelloLink) -> Self {
        Self { link, default_timeout_s: DEFAULT_TIMEOUT_S }
    }

    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_s = secs;
        self
    }

    /// Run on a separate task so the caller is not blocked.
    pub fn spawn(self, text: String) -> JoinHandle<Result<ScriptReport, ScriptError>> {
        tokio::spawn(async move { self.run(&text).await })
    }

    pub async fn run(&self, text: &str) -> Result<ScriptReport, ScriptError> {
        let script = Script::parse(text)?;
        self.execute(&script).await
    }

    pub async fn execute(&self, script: &Script) -> Result<ScriptReport, ScriptError> {
        let started = Instant::now();
        if script.is_empty() {
            return Ok(ScriptReport { commands: 0, elapsed: started.elapsed() });
        }
        if !self.link.is_connected() {
            return Err(ScriptError::NotConnected);
        }

        let mut timeout_s = self.default_timeout_s;
        let mut commands = 0;
        info!("script: executing {} lines [timeout = {}s]", script.lines.len(), timeout_s);

        for line in &script.lines {
            match &line.step {
                Step::Delay(d) => tokio::time::sleep(*d).await,
                Step::SetTimeout(secs) => {
                    timeout_s = *secs;
                    info!("script: set timeout to {}s", timeout_s);
                }
                Step::Command(command) => {
                    let response = self
                        .link
                        .send_and_await(command, timeout_s)
                        .await
                        .map_err(|source| {
                            warn!("script: line {} {:?} failed: {}", line.number, command, source);
                            ScriptError::Link { line: line.number, command: command.clone(), source }
                        })?;
                    if !response.is_ok() {
                        self.emergency().await;
                        return Err(ScriptError::Aborted {
                            line: line.number,
                            command: command.clone(),
                            response,
                        });
                    }
                    commands += 1;
                }
            }
        }

        let elapsed = started.elapsed();
        info!("script: finished, {} commands in {:.1}s", commands, elapsed.as_secs_f32());
        Ok(ScriptReport { commands, elapsed })
    }

    /// Best effort; the reply is not awaited.
    async fn emergency(&self) {
        warn!("script: unexpected response, sending emergency");
        if let Err(e) = self.link.send(&ControlCommand::Emergency.to_string()).await {
            warn!("script: emergency send failed: {}", e);
        }
    }
}
