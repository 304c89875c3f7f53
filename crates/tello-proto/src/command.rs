use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

pub const DISTANCE_CM: RangeInclusive<u32> = 20..=500;
pub const ROTATION_DEG: RangeInclusive<u32> = 1..=3600;

pub const DEFAULT_DISTANCE_CM: u32 = 20;
pub const DEFAULT_ROTATION_DEG: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Forward,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlipDirection {
    Left,
    Right,
    Forward,
    Back,
}

/// Read-only state queries. The drone answers each with a value, not `ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    Speed,
    Battery,
    Time,
    Height,
    Temp,
    Attitude,
    Baro,
    Acceleration,
    Tof,
    Wifi,
}

/// The built-in command palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCommand {
    /// Enter SDK mode.
    Command,
    Takeoff,
    Land,
    /// Stop motors immediately.
    Emergency,
    Move { direction: Direction, cm: u32 },
    Clockwise { deg: u32 },
    CounterClockwise { deg: u32 },
    Flip(FlipDirection),
    Query(Query),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{command} value {value} outside {min}..={max}")]
    OutOfRange { command: &'static str, value: u32, min: u32, max: u32 },

    #[error("unknown command: {0:?}")]
    Unknown(String),

    #[error("bad argument for {command}: {arg:?}")]
    BadArgument { command: &'static str, arg: String },
}

impl Direction {
    fn keyword(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Forward => "forward",
            Direction::Back => "back",
        }
    }
}

impl FlipDirection {
    fn letter(self) -> char {
        match self {
            FlipDirection::Left => 'l',
            FlipDirection::Right => 'r',
            FlipDirection::Forward => 'f',
            FlipDirection::Back => 'b',
        }
    }
}

impl Query {
    pub const ALL: [Query; 10] = [
        Query::Speed,
        Query::Battery,
        Query::Time,
        Query::Height,
        Query::Temp,
        Query::Attitude,
        Query::Baro,
        Query::Acceleration,
        Query::Tof,
        Query::Wifi,
    ];

    /// Wire text, including the trailing `?`.
    pub fn keyword(self) -> &'static str {
        match self {
            Query::Speed => "speed?",
            Query::Battery => "battery?",
            Query::Time => "time?",
            Query::Height => "height?",
            Query::Temp => "temp?",
            Query::Attitude => "attitude?",
            Query::Baro => "baro?",
            Query::Acceleration => "acceleration?",
            Query::Tof => "tof?",
            Query::Wifi => "wifi?",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.keyword() == keyword)
    }
}

impl ControlCommand {
    pub fn validate(&self) -> Result<(), CommandError> {
        let (command, value, range) = match *self {
            ControlCommand::Move { direction, cm } => (direction.keyword(), cm, DISTANCE_CM),
            ControlCommand::Clockwise { deg } => ("cw", deg, ROTATION_DEG),
            ControlCommand::CounterClockwise { deg } => ("ccw", deg, ROTATION_DEG),
            _ => return Ok(()),
        };
        if range.contains(&value) {
            Ok(())
        } else {
            Err(CommandError::OutOfRange { command, value, min: *range.start(), max: *range.end() })
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::Command => f.write_str("command"),
            ControlCommand::Takeoff => f.write_str("takeoff"),
            ControlCommand::Land => f.write_str("land"),
            ControlCommand::Emergency => f.write_str("emergency"),
            ControlCommand::Move { direction, cm } => write!(f, "{} {}", direction.keyword(), cm),
            ControlCommand::Clockwise { deg } => write!(f, "cw {}", deg),
            ControlCommand::CounterClockwise { deg } => write!(f, "ccw {}", deg),
            ControlCommand::Flip(dir) => write!(f, "flip {}", dir.letter()),
            ControlCommand::Query(query) => f.write_str(query.keyword()),
        }
    }
}

impl FromStr for ControlCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let keyword = parts.next().ok_or_else(|| CommandError::Unknown(s.to_string()))?;
        let arg = parts.next();

        let number = |command: &'static str, default: u32| -> Result<u32, CommandError> {
            match arg {
                None => Ok(default),
                Some(a) => a.parse().map_err(|_| CommandError::BadArgument { command, arg: a.to_string() }),
            }
        };

        let cmd = match keyword {
            "command" => ControlCommand::Command,
            "takeoff" => ControlCommand::Takeoff,
            "land" => ControlCommand::Land,
            "emergency" => ControlCommand::Emergency,
            "up" | "down" | "left" | "right" | "forward" | "back" => {
                let direction = match keyword {
                    "up" => Direction::Up,
                    "down" => Direction::Down,
                    "left" => Direction::Left,
                    "right" => Direction::Right,
                    "forward" => Direction::Forward,
                    _ => Direction::Back,
                };
                ControlCommand::Move { direction, cm: number(direction.keyword(), DEFAULT_DISTANCE_CM)? }
            }
            "cw" => ControlCommand::Clockwise { deg: number("cw", DEFAULT_ROTATION_DEG)? },
            "ccw" => ControlCommand::CounterClockwise { deg: number("ccw", DEFAULT_ROTATION_DEG)? },
            "flip" => {
                let dir = match arg {
                    Some("l") => FlipDirection::Left,
                    Some("r") => FlipDirection::Right,
                    Some("f") => FlipDirection::Forward,
                    Some("b") => FlipDirection::Back,
                    other => {
                        return Err(CommandError::BadArgument {
                            command: "flip",
                            arg: other.unwrap_or_default().to_string(),
                        })
                    }
                };
                ControlCommand::Flip(dir)
            }
            other => match Query::from_keyword(other) {
                Some(query) => ControlCommand::Query(query),
                None => return Err(CommandError::Unknown(s.to_string())),
            },
        };
        cmd.validate()?;
        Ok(cmd)
    }
}
