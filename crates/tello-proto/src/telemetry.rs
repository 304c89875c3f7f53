use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Every state line emitted by the drone starts with this key.
pub const TELEMETRY_PREFIX: &str = "mid:";

/// Number of positional `key:value` entries in a state line.
pub const FIELD_COUNT: usize = 21;

/// Field names in emission order, used for error reporting.
const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "mid", "x", "y", "z", "mpry", "pitch", "roll", "yaw", "vgx", "vgy", "vgz", "templ", "temph",
    "tof", "h", "bat", "baro", "time", "agx", "agy", "agz",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("telemetry line has {found} entries, expected {}", FIELD_COUNT)]
    TooFewEntries { found: usize },

    #[error("telemetry entry {index} has no value: {entry:?}")]
    MissingValue { index: usize, entry: String },

    #[error("telemetry field {field} is not numeric: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// One decoded state snapshot.
///
/// Fields are read by position, not by key: the drone always emits them in
/// the same order, so any deviation means the stream is out of sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Milliseconds since the current session/recording start.
    pub timestamp_ms: u64,
    pub raw: String,

    /// Mission pad id, -1 when none detected.
    pub mid: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub mpry: String,

    // Attitude, degrees
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,

    pub speed_x: f64,
    pub speed_y: f64,
    pub speed_z: f64,

    // Celsius
    pub temp_low: i32,
    pub temp_high: i32,

    /// Time-of-flight distance, mm.
    pub tof: i32,
    /// Height, cm.
    pub height: i32,
    /// Battery, percent 0-100.
    pub battery: i32,
    pub baro: f64,
    /// Motors-on time, seconds.
    pub time: i32,

    // Acceleration, 0.001g
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
}

impl TelemetryFrame {
    pub fn is_telemetry(text: &str) -> bool {
        text.starts_with(TELEMETRY_PREFIX)
    }

    pub fn parse(timestamp_ms: u64, raw: &str) -> Result<Self, DecodeError> {
        let trimmed = raw.trim_end_matches(['\r', '\n']).trim_end_matches(';');

        let entries: Vec<&str> = trimmed.split(';').collect();
        if entries.len() < FIELD_COUNT {
            return Err(DecodeError::TooFewEntries { found: entries.len() });
        }

        let mut values = [""; FIELD_COUNT];
        for (index, entry) in entries.iter().take(FIELD_COUNT).enumerate() {
            let (_, value) = entry.split_once(':').ok_or_else(|| DecodeError::MissingValue {
                index,
                entry: entry.to_string(),
            })?;
            values[index] = value;
        }

        Ok(Self {
            timestamp_ms,
            raw: raw.to_string(),
            mid: field(&values, 0)?,
            x: field(&values, 1)?,
            y: field(&values, 2)?,
            z: field(&values, 3)?,
            mpry: values[4].to_string(),
            pitch: field(&values, 5)?,
            roll: field(&values, 6)?,
            yaw: field(&values, 7)?,
            speed_x: field(&values, 8)?,
            speed_y: field(&values, 9)?,
            speed_z: field(&values, 10)?,
            temp_low: field(&values, 11)?,
            temp_high: field(&values, 12)?,
            tof: field(&values, 13)?,
            height: field(&values, 14)?,
            battery: field(&values, 15)?,
            baro: field(&values, 16)?,
            time: field(&values, 17)?,
            acc_x: field(&values, 18)?,
            acc_y: field(&values, 19)?,
            acc_z: field(&values, 20)?,
        })
    }
}

fn field<T: FromStr>(values: &[&str; FIELD_COUNT], index: usize) -> Result<T, DecodeError> {
    let value = values[index];
    value.trim().parse().map_err(|_| DecodeError::InvalidNumber {
        field: FIELD_NAMES[index],
        value: value.to_string(),
    })
}

impl fmt::Display for TelemetryFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={}ms bat={}% pitch={} roll={} yaw={} h={}cm acc=({}, {}, {})",
            self.timestamp_ms,
            self.battery,
            self.pitch,
            self.roll,
            self.yaw,
            self.height,
            self.acc_x,
            self.acc_y,
            self.acc_z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "mid:-1;x:0;y:0;z:0;mpry:0,0,0;pitch:1;roll:-2;yaw:45;vgx:0;vgy:0;vgz:0;templ:63;temph:65;tof:10;h:0;bat:87;baro:-53.11;time:0;agx:-5.00;agy:3.00;agz:-999.00;\r\n";

    #[test]
    fn parses_device_state_line() {
        let frame = TelemetryFrame::parse(250, SAMPLE).unwrap();
        assert_eq!(frame.timestamp_ms, 250);
        assert_eq!(frame.raw, SAMPLE);
        assert_eq!(frame.mid, -1);
        assert_eq!(frame.mpry, "0,0,0");
        assert_eq!(frame.pitch, 1.0);
        assert_eq!(frame.roll, -2.0);
        assert_eq!(frame.yaw, 45.0);
        assert_eq!(frame.temp_low, 63);
        assert_eq!(frame.temp_high, 65);
        assert_eq!(frame.tof, 10);
        assert_eq!(frame.battery, 87);
        assert_eq!(frame.baro, -53.11);
        assert_eq!(frame.acc_z, -999.0);
    }

    #[test]
    fn fields_are_positional() {
        // keys are ignored, only order matters
        let line = (0..FIELD_COUNT)
            .map(|i| if i == 4 { "k4:a,b,c".to_string() } else { format!("k{i}:{i}") })
            .collect::<Vec<_>>()
            .join(";");
        let frame = TelemetryFrame::parse(0, &line).unwrap();
        assert_eq!(frame.mid, 0);
        assert_eq!(frame.x, 1.0);
        assert_eq!(frame.mpry, "a,b,c");
        assert_eq!(frame.speed_z, 10.0);
        assert_eq!(frame.height, 14);
        assert_eq!(frame.time, 17);
        assert_eq!(frame.acc_z, 20.0);
    }

    #[test]
    fn table_of_synthetic_lines() {
        let table: &[(i32, f64, i32, f64, &str)] = &[
            (1, 12.5, 100, -0.25, ";\r\n"),
            (-1, 0.0, 0, 0.0, ""),
            (8, -180.0, 55, 999.75, ";"),
            (3, 3.0, 12, 1e3, "\n"),
        ];
        for &(mid, yaw, bat, agx, tail) in table {
            let line = format!(
                "mid:{mid};x:1;y:2;z:3;mpry:0,0,0;pitch:4;roll:5;yaw:{yaw};vgx:6;vgy:7;vgz:8;templ:9;temph:10;tof:11;h:12;bat:{bat};baro:13.5;time:14;agx:{agx};agy:15;agz:16{tail}"
            );
            let frame = TelemetryFrame::parse(7, &line).unwrap();
            assert_eq!(frame.mid, mid);
            assert_eq!(frame.yaw, yaw);
            assert_eq!(frame.battery, bat);
            assert_eq!(frame.acc_x, agx);
            assert_eq!(frame.baro, 13.5);
            assert_eq!(frame.acc_z, 16.0);
        }
    }

    #[test]
    fn too_few_entries_fails() {
        let line = "mid:1;x:0;y:0;z:0;mpry:0,0,0;pitch:0;roll:0;yaw:0;\r\n";
        assert_eq!(TelemetryFrame::parse(0, line), Err(DecodeError::TooFewEntries { found: 8 }));
    }

    #[test]
    fn non_numeric_value_fails() {
        let line = SAMPLE.replace("bat:87", "bat:full");
        assert_eq!(
            TelemetryFrame::parse(0, &line),
            Err(DecodeError::InvalidNumber { field: "bat", value: "full".into() })
        );
    }

    #[test]
    fn entry_without_value_fails() {
        let line = SAMPLE.replace("tof:10", "tof");
        assert!(matches!(
            TelemetryFrame::parse(0, &line),
            Err(DecodeError::MissingValue { index: 13, .. })
        ));
    }

    #[test]
    fn detects_prefix() {
        assert!(TelemetryFrame::is_telemetry(SAMPLE));
        assert!(!TelemetryFrame::is_telemetry("ok"));
        assert!(!TelemetryFrame::is_telemetry(" mid:1"));
    }
}
