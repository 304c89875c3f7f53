use std::time::{Duration, Instant};
use tello_proto::TelemetryFrame;
use time::OffsetDateTime;

/// A finished recording, handed to the caller by value.
#[derive(Debug, Clone)]
pub struct Recording {
    pub started_at: OffsetDateTime,
    pub frames: Vec<TelemetryFrame>,
}

impl Recording {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Session clock plus the frame buffer of the active recording.
///
/// Only the receive task appends. Frame timestamps are relative to `origin`,
/// which moves on connect, on disconnect and on every `start`.
#[derive(Debug)]
pub(crate) struct Recorder {
    origin: Instant,
    started_at: OffsetDateTime,
    active: bool,
    frames: Vec<TelemetryFrame>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            started_at: OffsetDateTime::now_utc(),
            active: false,
            frames: Vec::new(),
        }
    }

    pub fn reset_origin(&mut self) {
        self.origin = Instant::now();
        self.started_at = OffsetDateTime::now_utc();
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// Begin a fresh recording. An active one is discarded, not finished.
    pub fn start(&mut self) {
        self.reset_origin();
        self.frames = Vec::new();
        self.active = true;
    }

    /// Stop capturing; collected frames stay until `end`.
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn end(&mut self) -> Recording {
        self.active = false;
        Recording {
            started_at: self.started_at,
            frames: std::mem::take(&mut self.frames),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.active.then(|| self.origin.elapsed())
    }

    /// Returns whether the frame was kept.
    pub fn push(&mut self, frame: TelemetryFrame) -> bool {
        if self.active {
            self.frames.push(frame);
        }
        self.active
    }
}
