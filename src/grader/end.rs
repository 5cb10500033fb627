//! Watch-until-end grader

use tracing::info;

use super::{CompletionSink, GraderKind, PlaybackEvent};

/// Credits a viewer when playback reaches the end of the media.
#[derive(Debug)]
pub struct WatchUntilEnd<S> {
    completed: bool,
    sink: S,
}

impl<S: CompletionSink> WatchUntilEnd<S> {
    /// Create a grader. An `already_graded` grader never reports.
    pub const fn new(already_graded: bool, sink: S) -> Self {
        Self {
            completed: already_graded,
            sink,
        }
    }

    /// Feed a playback event; only `Ended` matters
    pub fn observe(&mut self, event: PlaybackEvent) {
        if matches!(event, PlaybackEvent::Ended) {
            self.on_ended();
        }
    }

    /// Playback finished
    pub fn on_ended(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;

        info!("End grader complete: playback reached the end");
        self.sink.report_complete(GraderKind::WatchUntilEnd);
    }

    /// Whether the grader has reached its terminal state
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grader::testing::RecordingSink;

    #[test]
    fn test_completes_only_on_ended() {
        let sink = RecordingSink::default();
        let mut grader = WatchUntilEnd::new(false, sink.clone());

        grader.observe(PlaybackEvent::Play { duration_secs: 10.0 });
        grader.observe(PlaybackEvent::Progress { position_secs: 9.9 });
        assert!(!grader.is_complete());

        grader.observe(PlaybackEvent::Ended);
        assert!(grader.is_complete());
        assert_eq!(sink.reports(), vec![GraderKind::WatchUntilEnd]);
    }

    #[test]
    fn test_repeated_ended_reports_once() {
        let sink = RecordingSink::default();
        let mut grader = WatchUntilEnd::new(false, sink.clone());
        grader.on_ended();
        grader.on_ended();
        grader.on_ended();
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn test_already_graded_is_silent() {
        let sink = RecordingSink::default();
        let mut grader = WatchUntilEnd::new(true, sink.clone());
        assert!(grader.is_complete());
        grader.on_ended();
        assert_eq!(sink.count(), 0);
    }
}
