//! Score and status bookkeeping shown to the viewer

use std::collections::BTreeSet;

use crate::grader::GraderKind;

/// Status text after every grader was reported successfully
pub const SUCCESS_MESSAGE: &str = "You've received credit for viewing this video.";

/// Status text after a failed report
pub const ERROR_MESSAGE: &str =
    "An error occurred. Please refresh the page and try viewing the video again.";

/// Outcome of the reports so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
}

/// Parse a score the way the grading backend sends it: any finite number.
#[must_use]
pub fn parse_score(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|score| score.is_finite())
}

/// Format points with at least one decimal place ("1.0", "0.5", "0.75").
#[must_use]
pub fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{points:.1}")
    } else {
        format!("{points}")
    }
}

/// Caller-side view of one video's grade.
///
/// Only a successful report may change the score or mark a grader as
/// graded. A failed report leaves both untouched and queues the grader for
/// a retry that re-sends the same completion. The success status waits
/// until every active grader has been accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBoard {
    max_score: f64,
    score: Option<f64>,
    status: Option<Status>,
    active: BTreeSet<GraderKind>,
    graded: BTreeSet<GraderKind>,
    failed: BTreeSet<GraderKind>,
}

impl ScoreBoard {
    /// Board for an ungraded video
    #[must_use]
    pub const fn new(max_score: f64) -> Self {
        Self {
            max_score,
            score: None,
            status: None,
            active: BTreeSet::new(),
            graded: BTreeSet::new(),
            failed: BTreeSet::new(),
        }
    }

    /// Start from a previously earned score
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Graders that must all be accepted before the status turns to success
    #[must_use]
    pub fn with_graders(mut self, graders: impl IntoIterator<Item = GraderKind>) -> Self {
        self.active = graders.into_iter().collect();
        self
    }

    /// Record a report the backend accepted
    pub fn record_success(&mut self, grader: GraderKind, score: Option<f64>) {
        if let Some(score) = score {
            self.score = Some(score);
        }
        self.graded.insert(grader);
        self.failed.remove(&grader);

        if !self.failed.is_empty() {
            self.status = Some(Status::Error);
        } else if self.active.is_subset(&self.graded) {
            self.status = Some(Status::Success);
        }
    }

    /// Record a report that did not get through
    pub fn record_failure(&mut self, grader: GraderKind) {
        if !self.graded.contains(&grader) {
            self.failed.insert(grader);
        }
        self.status = Some(Status::Error);
    }

    /// Progress line, e.g. "(0.5 / 1.0 points)" or "(1.0 points possible)"
    #[must_use]
    pub fn progress_text(&self) -> String {
        match self.score {
            Some(score) => format!(
                "({} / {} points)",
                format_points(score),
                format_points(self.max_score)
            ),
            None => format!("({} points possible)", format_points(self.max_score)),
        }
    }

    /// Status line, if any report has completed
    #[must_use]
    pub const fn status_text(&self) -> Option<&'static str> {
        match self.status {
            Some(Status::Success) => Some(SUCCESS_MESSAGE),
            Some(Status::Error) => Some(ERROR_MESSAGE),
            None => None,
        }
    }

    /// Graders whose completion still has to be delivered
    #[must_use]
    pub fn pending_retries(&self) -> Vec<GraderKind> {
        self.failed.iter().copied().collect()
    }

    /// Graders the backend has accepted during this session
    #[must_use]
    pub const fn graded(&self) -> &BTreeSet<GraderKind> {
        &self.graded
    }

    #[must_use]
    pub const fn score(&self) -> Option<f64> {
        self.score
    }

    #[must_use]
    pub const fn max_score(&self) -> f64 {
        self.max_score
    }

    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        self.status
    }

    #[must_use]
    pub const fn is_scored(&self) -> bool {
        self.score.is_some()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == Some(Status::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("0.5"), Some(0.5));
        assert_eq!(parse_score(" 1 \n"), Some(1.0));
        assert_eq!(parse_score("a0.5a"), None);
        assert_eq!(parse_score(""), None);
        assert_eq!(parse_score("inf"), None);
        assert_eq!(parse_score("NaN"), None);
    }

    #[test]
    fn test_format_points() {
        assert_eq!(format_points(1.0), "1.0");
        assert_eq!(format_points(0.5), "0.5");
        assert_eq!(format_points(0.75), "0.75");
        assert_eq!(format_points(10.0), "10.0");
    }

    #[test]
    fn test_progress_text() {
        let board = ScoreBoard::new(1.0);
        assert_eq!(board.progress_text(), "(1.0 points possible)");
        assert_eq!(board.status_text(), None);

        let board = board.with_score(0.5);
        assert_eq!(board.progress_text(), "(0.5 / 1.0 points)");
    }

    #[test]
    fn test_success_updates_score_and_status() {
        let mut board = ScoreBoard::new(1.0);
        board.record_success(GraderKind::WatchUntilEnd, Some(0.5));
        assert_eq!(board.score(), Some(0.5));
        assert_eq!(board.status_text(), Some(SUCCESS_MESSAGE));
        assert!(board.graded().contains(&GraderKind::WatchUntilEnd));
    }

    #[test]
    fn test_success_without_score_keeps_previous() {
        let mut board = ScoreBoard::new(1.0).with_score(0.25);
        board.record_success(GraderKind::WatchUntilPercent, None);
        assert_eq!(board.score(), Some(0.25));
        assert_eq!(board.status(), Some(Status::Success));
    }

    #[test]
    fn test_failure_leaves_score_alone_and_queues_retry() {
        let mut board = ScoreBoard::new(1.0);
        board.record_failure(GraderKind::WatchUntilPercent);
        assert!(!board.is_scored());
        assert!(board.is_error());
        assert_eq!(board.status_text(), Some(ERROR_MESSAGE));
        assert_eq!(board.progress_text(), "(1.0 points possible)");
        assert_eq!(board.pending_retries(), vec![GraderKind::WatchUntilPercent]);
        assert!(board.graded().is_empty());
    }

    #[test]
    fn test_error_persists_until_all_failures_clear() {
        let mut board = ScoreBoard::new(1.0);
        board.record_failure(GraderKind::WatchUntilEnd);
        board.record_success(GraderKind::WatchUntilPercent, Some(1.0));
        assert!(board.is_error());

        board.record_success(GraderKind::WatchUntilEnd, Some(1.0));
        assert_eq!(board.status(), Some(Status::Success));
        assert!(board.pending_retries().is_empty());
    }

    #[test]
    fn test_success_waits_for_every_active_grader() {
        let mut board = ScoreBoard::new(1.0)
            .with_graders([GraderKind::WatchUntilEnd, GraderKind::WatchUntilPercent]);

        board.record_success(GraderKind::WatchUntilPercent, Some(0.5));
        assert_eq!(board.score(), Some(0.5));
        assert_eq!(board.status(), None);
        assert_eq!(board.progress_text(), "(0.5 / 1.0 points)");

        board.record_success(GraderKind::WatchUntilEnd, Some(1.0));
        assert_eq!(board.status_text(), Some(SUCCESS_MESSAGE));
    }

    #[test]
    fn test_cleared_failure_keeps_error_until_all_graders_are_in() {
        let mut board = ScoreBoard::new(1.0)
            .with_graders([GraderKind::WatchUntilEnd, GraderKind::WatchUntilPercent]);
        board.record_failure(GraderKind::WatchUntilPercent);
        board.record_success(GraderKind::WatchUntilPercent, None);
        assert!(board.is_error());
        assert!(board.pending_retries().is_empty());

        board.record_success(GraderKind::WatchUntilEnd, None);
        assert_eq!(board.status(), Some(Status::Success));
    }

    #[test]
    fn test_failure_after_success_does_not_requeue() {
        let mut board = ScoreBoard::new(1.0);
        board.record_success(GraderKind::WatchUntilEnd, Some(1.0));
        board.record_failure(GraderKind::WatchUntilEnd);
        assert!(board.pending_retries().is_empty());
    }
}
