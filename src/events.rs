//! Recorded playback event logs
//!
//! One JSON object per line:
//!
//! ```text
//! {"event":"play","duration":100.0,"at_ms":0}
//! {"event":"progress","time":5.0,"at_ms":1000}
//! {"event":"ended","at_ms":9000}
//! ```
//!
//! `at_ms` is when the event arrived, relative to the start of the log. It
//! drives sample throttling on replay and defaults to 0. Blank lines and
//! lines starting with `#` are skipped.

use std::path::Path;
use std::time::Instant;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::grader::PlaybackEvent;
use crate::types::Milliseconds;

/// A playback event with its arrival offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEvent {
    pub event: PlaybackEvent,
    pub at: Milliseconds,
}

impl TimedEvent {
    /// Arrival instant relative to `base`
    #[must_use]
    pub fn instant_from(&self, base: Instant) -> Instant {
        base + self.at.to_duration()
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum LogLine {
    Play {
        duration: f64,
        #[serde(default)]
        at_ms: Milliseconds,
    },
    Progress {
        time: f64,
        #[serde(default)]
        at_ms: Milliseconds,
    },
    Ended {
        #[serde(default)]
        at_ms: Milliseconds,
    },
}

impl From<LogLine> for TimedEvent {
    fn from(line: LogLine) -> Self {
        match line {
            LogLine::Play { duration, at_ms } => Self {
                event: PlaybackEvent::Play {
                    duration_secs: duration,
                },
                at: at_ms,
            },
            LogLine::Progress { time, at_ms } => Self {
                event: PlaybackEvent::Progress {
                    position_secs: time,
                },
                at: at_ms,
            },
            LogLine::Ended { at_ms } => Self {
                event: PlaybackEvent::Ended,
                at: at_ms,
            },
        }
    }
}

/// Parse an event log
pub fn parse_event_log(contents: &str) -> Result<Vec<TimedEvent>> {
    let mut events = Vec::new();
    let mut last_at = Milliseconds::default();

    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed: LogLine = serde_json::from_str(line).map_err(|e| Error::InvalidEvent {
            line: index + 1,
            reason: e.to_string(),
        })?;

        let event = TimedEvent::from(parsed);
        if event.at < last_at {
            return Err(Error::InvalidEvent {
                line: index + 1,
                reason: format!("at_ms {} goes back in time (previous {})", event.at.get(), last_at.get()),
            });
        }
        last_at = event.at;
        events.push(event);
    }

    Ok(events)
}

/// Read and parse an event log file
pub fn read_event_log(path: &Path) -> Result<Vec<TimedEvent>> {
    let contents = std::fs::read_to_string(path)?;
    parse_event_log(&contents)
}
