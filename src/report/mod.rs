//! Grade reporting
//!
//! Graders hand completions to a [`ReportQueue`] without waiting. A
//! [`GradeReporter`] task drains the queue, posts each completion to a
//! [`GradeEndpoint`] and keeps the [`ScoreBoard`] current.

mod http;

pub use http::HttpEndpoint;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::grader::{CompletionSink, GraderKind};
use crate::score::ScoreBoard;

/// Somewhere a grader's completion can be posted
#[async_trait]
pub trait GradeEndpoint: Send + Sync {
    /// Post a completion; returns the score the backend assigned, if any.
    async fn send_grade(&self, grader: GraderKind) -> Result<Option<f64>>;
}

#[async_trait]
impl<T: GradeEndpoint + ?Sized> GradeEndpoint for Box<T> {
    async fn send_grade(&self, grader: GraderKind) -> Result<Option<f64>> {
        (**self).send_grade(grader).await
    }
}

/// Endpoint that posts nothing and awards a fixed score
#[derive(Debug, Clone, Copy)]
pub struct DryRunEndpoint {
    score: f64,
}

impl DryRunEndpoint {
    #[must_use]
    pub const fn new(score: f64) -> Self {
        Self { score }
    }
}

#[async_trait]
impl GradeEndpoint for DryRunEndpoint {
    async fn send_grade(&self, grader: GraderKind) -> Result<Option<f64>> {
        info!("[dry run] Would post grade for {}", grader);
        Ok(Some(self.score))
    }
}

/// A grader's completion, as queued for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub session: Uuid,
    pub grader: GraderKind,
    pub completed_at: DateTime<Utc>,
}

/// Completion sink that forwards to a reporter task over a channel
#[derive(Debug, Clone)]
pub struct ReportQueue {
    session: Uuid,
    tx: mpsc::UnboundedSender<CompletionReport>,
}

impl ReportQueue {
    /// Create a queue and the receiving end the reporter drains
    #[must_use]
    pub fn channel(session: Uuid) -> (Self, mpsc::UnboundedReceiver<CompletionReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { session, tx }, rx)
    }
}

impl CompletionSink for ReportQueue {
    fn report_complete(&mut self, grader: GraderKind) {
        let report = CompletionReport {
            session: self.session,
            grader,
            completed_at: Utc::now(),
        };
        if self.tx.send(report).is_err() {
            warn!("Reporter is gone, dropping completion for {}", grader);
        }
    }
}

/// Posts completions and tracks what the backend made of them
#[derive(Debug)]
pub struct GradeReporter<E> {
    session: Uuid,
    endpoint: E,
    board: ScoreBoard,
}

impl<E: GradeEndpoint> GradeReporter<E> {
    pub const fn new(session: Uuid, endpoint: E, board: ScoreBoard) -> Self {
        Self {
            session,
            endpoint,
            board,
        }
    }

    /// Deliver queued reports until every queue handle has been dropped
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<CompletionReport>) -> Self {
        while let Some(report) = rx.recv().await {
            self.deliver(report.grader).await;
        }
        self
    }

    /// Post one completion and record the outcome
    pub async fn deliver(&mut self, grader: GraderKind) -> bool {
        let outcome = self.endpoint.send_grade(grader).await;
        self.record(grader, outcome)
    }

    /// Re-send completions that failed earlier, all at once.
    ///
    /// Returns how many are still undelivered.
    pub async fn retry_failed(&mut self) -> usize {
        let pending = self.board.pending_retries();
        if pending.is_empty() {
            return 0;
        }

        info!("[{}] Retrying {} failed report(s)", self.session, pending.len());
        let outcomes =
            futures::future::join_all(pending.iter().map(|grader| self.endpoint.send_grade(*grader)))
                .await;

        for (grader, outcome) in pending.into_iter().zip(outcomes) {
            self.record(grader, outcome);
        }

        self.board.pending_retries().len()
    }

    fn record(&mut self, grader: GraderKind, outcome: Result<Option<f64>>) -> bool {
        match outcome {
            Ok(score) => {
                info!("[{}] Grade accepted for {}", self.session, grader);
                self.board.record_success(grader, score);
                true
            }
            Err(e) => {
                error!("[{}] Failed to report grade for {}: {}", self.session, grader, e);
                self.board.record_failure(grader);
                false
            }
        }
    }

    #[must_use]
    pub const fn board(&self) -> &ScoreBoard {
        &self.board
    }

    #[must_use]
    pub fn into_board(self) -> ScoreBoard {
        self.board
    }
}
