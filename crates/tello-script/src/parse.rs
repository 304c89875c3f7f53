use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Pause the run; the link keeps receiving.
    Delay(Duration),
    /// Response timeout, seconds, for the following commands.
    SetTimeout(u64),
    /// Sent verbatim and must be answered with `ok`.
    Command(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    /// 1-based line number in the source text.
    pub number: usize,
    pub step: Step,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}: {text:?}")]
pub struct ParseError {
    pub line: usize,
    pub text: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub lines: Vec<ScriptLine>,
}

impl Script {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut lines = Vec::new();
        for (i, raw) in text.split('\n').enumerate() {
            let entry = raw.trim_end_matches('\r');
            if entry.trim().is_empty() || entry.starts_with("//") {
                continue;
            }
            let number = i + 1;
            let step = parse_step(entry).map_err(|reason| ParseError {
                line: number,
                text: entry.to_string(),
                reason,
            })?;
            lines.push(ScriptLine { number, step });
        }
        Ok(Self { lines })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn command_count(&self) -> usize {
        self.lines.iter().filter(|l| matches!(l.step, Step::Command(_))).count()
    }
}

impl FromStr for Script {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Script::parse(s)
    }
}

fn parse_step(entry: &str) -> Result<Step, &'static str> {
    if let Some(rest) = entry.strip_prefix("delay ") {
        let secs = seconds(rest, "delay needs whole seconds")?;
        return Ok(Step::Delay(Duration::from_secs(secs)));
    }
    if let Some(rest) = entry.strip_prefix("set timeout ") {
        let secs = seconds(rest, "set timeout needs whole seconds")?;
        return Ok(Step::SetTimeout(secs));
    }
    Ok(Step::Command(entry.to_string()))
}

/// First token after the directive keyword.
fn seconds(rest: &str, reason: &'static str) -> Result<u64, &'static str> {
    rest.split_whitespace().next().and_then(|t| t.parse().ok()).ok_or(reason)
}
