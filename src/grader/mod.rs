//! Watch-progress graders
//!
//! A grader observes playback events and decides, exactly once, when a
//! viewer has earned credit for a video. The decision is handed to a
//! [`CompletionSink`]; what happens after that (network calls, status text)
//! is the sink's business.

mod collection;
mod end;
mod percent;
mod timeline;

pub use collection::{GraderCollection, GraderSettings, GraderValue};
pub use end::WatchUntilEnd;
pub use percent::WatchProgressGrader;
pub use timeline::{BucketPlan, SampleThrottle, SamplingPolicy, Timeline};

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Playback events delivered by the media player
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    /// Playback started; carries the media length known at that point
    Play { duration_secs: f64 },
    /// Periodic position report
    Progress { position_secs: f64 },
    /// Playback reached the end of the media
    Ended,
}

/// The closed set of grading rules a video can be scored on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GraderKind {
    /// Credit once playback reaches the end
    #[serde(rename = "scored_on_end")]
    WatchUntilEnd,
    /// Credit once a share of the timeline has been watched
    #[serde(rename = "scored_on_percent")]
    WatchUntilPercent,
}

impl GraderKind {
    /// Name used by the grading backend
    #[must_use]
    pub const fn backend_name(self) -> &'static str {
        match self {
            Self::WatchUntilEnd => "scored_on_end",
            Self::WatchUntilPercent => "scored_on_percent",
        }
    }

    /// Look up a grader by its backend name
    #[must_use]
    pub fn from_backend_name(name: &str) -> Option<Self> {
        match name {
            "scored_on_end" => Some(Self::WatchUntilEnd),
            "scored_on_percent" => Some(Self::WatchUntilPercent),
            _ => None,
        }
    }
}

impl fmt::Display for GraderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.backend_name())
    }
}

impl FromStr for GraderKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_backend_name(s)
            .ok_or_else(|| crate::Error::invalid_grader(format!("unknown grader '{s}'")))
    }
}

/// Receiver of a grader's one-shot completion signal.
///
/// Implementations must not block; anything slow belongs on the other side
/// of a channel.
pub trait CompletionSink {
    /// Called at most once per grader, when it decides the video is watched.
    fn report_complete(&mut self, grader: GraderKind);
}

/// One grader of either kind
#[derive(Debug)]
pub enum Grader<S: CompletionSink> {
    UntilEnd(WatchUntilEnd<S>),
    UntilPercent(WatchProgressGrader<S>),
}

impl<S: CompletionSink> Grader<S> {
    /// Which rule this grader applies
    #[must_use]
    pub const fn kind(&self) -> GraderKind {
        match self {
            Self::UntilEnd(_) => GraderKind::WatchUntilEnd,
            Self::UntilPercent(_) => GraderKind::WatchUntilPercent,
        }
    }

    /// Feed an event that arrived at `at`
    pub fn observe_at(&mut self, event: PlaybackEvent, at: Instant) {
        match self {
            Self::UntilEnd(grader) => grader.observe(event),
            Self::UntilPercent(grader) => grader.observe_at(event, at),
        }
    }

    /// Feed an event that arrived now
    pub fn observe(&mut self, event: PlaybackEvent) {
        self.observe_at(event, Instant::now());
    }

    /// Whether the grader has reached its terminal state
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        match self {
            Self::UntilEnd(grader) => grader.is_complete(),
            Self::UntilPercent(grader) => grader.is_complete(),
        }
    }

    /// Watched share of the timeline, for graders that keep one
    #[must_use]
    pub fn watched_percent(&self) -> Option<f64> {
        match self {
            Self::UntilEnd(_) => None,
            Self::UntilPercent(grader) => Some(grader.watched_percent()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use crate::types::Percent;

    #[test]
    fn test_backend_names_round_trip() {
        for kind in [GraderKind::WatchUntilEnd, GraderKind::WatchUntilPercent] {
            assert_eq!(GraderKind::from_backend_name(kind.backend_name()), Some(kind));
            assert_eq!(kind.to_string().parse::<GraderKind>().unwrap(), kind);
        }
        assert!("scored_on_vibes".parse::<GraderKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_as_backend_name() {
        let json = serde_json::to_string(&GraderKind::WatchUntilPercent).unwrap();
        assert_eq!(json, "\"scored_on_percent\"");
    }

    #[test]
    fn test_grader_enum_dispatches_by_kind() {
        let sink = RecordingSink::default();
        let mut end = Grader::UntilEnd(WatchUntilEnd::new(false, sink.clone()));
        let mut percent = Grader::UntilPercent(WatchProgressGrader::new(
            Percent::FULL,
            false,
            sink.clone(),
        ));

        assert_eq!(end.kind(), GraderKind::WatchUntilEnd);
        assert_eq!(percent.kind(), GraderKind::WatchUntilPercent);
        assert_eq!(end.watched_percent(), None);
        assert_eq!(percent.watched_percent(), Some(0.0));

        for grader in [&mut end, &mut percent] {
            grader.observe(PlaybackEvent::Play { duration_secs: 60.0 });
            grader.observe(PlaybackEvent::Ended);
            assert!(grader.is_complete());
        }

        assert_eq!(
            sink.reports(),
            vec![GraderKind::WatchUntilEnd, GraderKind::WatchUntilPercent]
        );
    }
}
