//! One viewer's grading session for one video
//!
//! Ties the video's graders to a report queue and a reporter task. A video
//! that already carries a score skips grading entirely and just shows it.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::grader::{
    GraderCollection, GraderKind, GraderSettings, PlaybackEvent, SamplingPolicy,
};
use crate::report::{GradeEndpoint, GradeReporter, ReportQueue};
use crate::score::{parse_score, ScoreBoard};
use crate::store::StoredScore;

/// Grading settings of one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoGrading {
    #[serde(alias = "videoId")]
    pub video_id: String,

    #[serde(default, alias = "hasScore")]
    pub has_score: bool,

    #[serde(default = "default_max_score", alias = "maxScore")]
    pub max_score: f64,

    /// Score the viewer already earned, as sent by the backend
    #[serde(default)]
    pub score: Option<String>,

    #[serde(default, alias = "gradeUrl")]
    pub grade_url: Option<String>,

    #[serde(default)]
    pub graders: BTreeMap<String, GraderSettings>,
}

const fn default_max_score() -> f64 {
    1.0
}

impl VideoGrading {
    /// Load a video's settings from a JSON file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let video: Self = serde_json::from_str(&contents)?;
        Ok(video)
    }

    /// Previously earned score, if the backend sent a usable one
    #[must_use]
    pub fn earned_score(&self) -> Option<f64> {
        self.score.as_deref().and_then(parse_score)
    }

    /// Mark graders the store already knows about as satisfied
    fn apply_stored(&mut self, stored: &StoredScore) {
        for kind in &stored.graded {
            if let Some(entry) = self.graders.get_mut(kind.backend_name()) {
                entry.grader_status = true;
            }
        }
        if self.score.is_none() {
            self.score = stored.score.map(|score| score.to_string());
        }
    }
}

enum Reporter<E> {
    Running(JoinHandle<GradeReporter<E>>),
    Idle(GradeReporter<E>),
}

/// Live grading session
pub struct GradingSession<E> {
    id: Uuid,
    video: VideoGrading,
    collection: GraderCollection<ReportQueue>,
    reporter: Reporter<E>,
}

impl<E: GradeEndpoint + 'static> GradingSession<E> {
    /// Start grading `video`, posting completions to `endpoint`.
    ///
    /// Must be called inside a tokio runtime; the reporter runs as a task.
    pub fn start(
        mut video: VideoGrading,
        endpoint: E,
        policy: SamplingPolicy,
        stored: Option<&StoredScore>,
    ) -> Result<Self> {
        if video.max_score.is_nan() || video.max_score < 0.0 {
            return Err(Error::invalid_grader(format!(
                "max_score must be a non-negative number, got {}",
                video.max_score
            )));
        }

        if let Some(stored) = stored {
            video.apply_stored(stored);
        }

        let id = Uuid::new_v4();
        let mut board = ScoreBoard::new(video.max_score);

        if let Some(score) = video.earned_score() {
            info!("[{}] Video {} already scored: {}", id, video.video_id, score);
            board = board.with_score(score);
            return Ok(Self {
                id,
                video,
                collection: GraderCollection::empty(),
                reporter: Reporter::Idle(GradeReporter::new(id, endpoint, board)),
            });
        }

        let (queue, rx) = ReportQueue::channel(id);
        let collection =
            GraderCollection::from_settings(video.has_score, &video.graders, &queue, policy)?;
        drop(queue);

        info!(
            "[{}] Grading video {} with {} grader(s): {:?}",
            id,
            video.video_id,
            collection.len(),
            collection.kinds()
        );

        let board = board.with_graders(collection.kinds());
        let reporter = GradeReporter::new(id, endpoint, board);
        let reporter = Reporter::Running(tokio::spawn(reporter.run(rx)));

        Ok(Self {
            id,
            video,
            collection,
            reporter,
        })
    }

    /// Deliver a playback event that arrived at `at`
    pub fn observe_at(&mut self, event: PlaybackEvent, at: Instant) {
        self.collection.observe_at(event, at);
    }

    /// Deliver a playback event that arrived now
    pub fn observe(&mut self, event: PlaybackEvent) {
        self.collection.observe(event);
    }

    /// Whether every active grader has completed
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.collection.is_complete()
    }

    /// Kinds of graders still running or completed in this session
    #[must_use]
    pub fn grader_kinds(&self) -> Vec<GraderKind> {
        self.collection.kinds()
    }

    /// Watched share per percent grader
    #[must_use]
    pub fn watched(&self) -> Vec<(GraderKind, f64)> {
        self.collection
            .iter()
            .filter_map(|grader| grader.watched_percent().map(|pct| (grader.kind(), pct)))
            .collect()
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn video(&self) -> &VideoGrading {
        &self.video
    }

    /// End the session: drop the graders, let the reporter drain the queue,
    /// and hand the reporter back for retries and the final board.
    pub async fn finish(self) -> Result<GradeReporter<E>> {
        drop(self.collection);

        match self.reporter {
            Reporter::Idle(reporter) => Ok(reporter),
            Reporter::Running(handle) => handle
                .await
                .map_err(|e| Error::other(format!("reporter task failed: {e}"))),
        }
    }
}
