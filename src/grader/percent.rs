//! Percentage-watched grader

use std::time::Instant;

use tracing::{debug, info};

use super::timeline::{BucketPlan, SampleThrottle, SamplingPolicy, Timeline};
use super::{CompletionSink, GraderKind, PlaybackEvent};
use crate::types::{Milliseconds, Percent};

/// Bookkeeping that exists only while samples are being collected
#[derive(Debug)]
struct Tracking {
    plan: BucketPlan,
    timeline: Timeline,
    throttle: SampleThrottle<usize>,
}

#[derive(Debug)]
enum Phase {
    NotStarted,
    InProgress(Tracking),
    Completed,
}

/// Credits a viewer once `threshold` percent of the timeline has been seen.
///
/// `NotStarted -> InProgress` on the first play, `InProgress -> Completed`
/// when the threshold is reached or playback ends. The sink hears about
/// completion exactly once; every event after that is ignored.
#[derive(Debug)]
pub struct WatchProgressGrader<S> {
    threshold: Percent,
    policy: SamplingPolicy,
    phase: Phase,
    watched_percent: f64,
    sink: S,
}

impl<S: CompletionSink> WatchProgressGrader<S> {
    /// Create a grader. An `already_graded` grader starts out completed and
    /// never reports.
    pub fn new(threshold: Percent, already_graded: bool, sink: S) -> Self {
        Self {
            threshold,
            policy: SamplingPolicy::default(),
            phase: if already_graded {
                Phase::Completed
            } else {
                Phase::NotStarted
            },
            watched_percent: 0.0,
            sink,
        }
    }

    /// Override the sampling policy (minimum interval and resolution)
    #[must_use]
    pub fn with_policy(mut self, policy: SamplingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Feed any playback event that arrived at `at`
    pub fn observe_at(&mut self, event: PlaybackEvent, at: Instant) {
        match event {
            PlaybackEvent::Play { duration_secs } => self.on_play(duration_secs),
            PlaybackEvent::Progress { position_secs } => self.on_progress_at(position_secs, at),
            PlaybackEvent::Ended => self.on_ended(),
        }
    }

    /// Start the session. Only the first call has any effect.
    pub fn on_play(&mut self, duration_secs: f64) {
        if !matches!(self.phase, Phase::NotStarted) {
            return;
        }

        if self.threshold.is_zero() {
            self.complete("zero threshold");
            return;
        }

        let Some(plan) = BucketPlan::for_duration(duration_secs, &self.policy) else {
            self.complete("media has no usable duration");
            return;
        };

        debug!(
            "Tracking {} buckets over {:.1}s, one sample per {}",
            plan.bucket_count(),
            duration_secs,
            Milliseconds::from(plan.sample_interval())
        );

        self.phase = Phase::InProgress(Tracking {
            plan,
            timeline: Timeline::new(plan.bucket_count()),
            throttle: SampleThrottle::new(plan.sample_interval()),
        });
    }

    /// Record a position sample arriving now
    pub fn on_progress(&mut self, position_secs: f64) {
        self.on_progress_at(position_secs, Instant::now());
    }

    /// Record a position sample arriving at `at`
    pub fn on_progress_at(&mut self, position_secs: f64, at: Instant) {
        let Phase::InProgress(tracking) = &mut self.phase else {
            return;
        };

        let Some(bucket) = tracking.plan.bucket_for(position_secs) else {
            return;
        };

        let mut marked = false;
        for bucket in tracking.throttle.offer(at, bucket).into_iter().flatten() {
            marked |= tracking.timeline.mark(bucket);
        }
        if !marked {
            return;
        }

        self.watched_percent = tracking.timeline.watched_percent();
        if tracking.timeline.reaches(self.threshold.get()) {
            self.complete("threshold reached");
        }
    }

    /// Playback finished: complete regardless of how much was sampled
    pub fn on_ended(&mut self) {
        self.complete("playback ended");
    }

    /// Whether the grader has reached its terminal state
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.phase, Phase::Completed)
    }

    /// Observed share of the timeline on the 0-100 scale
    #[must_use]
    pub const fn watched_percent(&self) -> f64 {
        self.watched_percent
    }

    /// Required share of the timeline
    #[must_use]
    pub const fn threshold(&self) -> Percent {
        self.threshold
    }

    /// Borrow the sink
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    fn complete(&mut self, reason: &str) {
        if self.is_complete() {
            return;
        }
        self.phase = Phase::Completed;

        info!(
            "Percent grader complete ({}): {:.0}% watched, threshold {}",
            reason, self.watched_percent, self.threshold
        );
        self.sink.report_complete(GraderKind::WatchUntilPercent);
    }
}
