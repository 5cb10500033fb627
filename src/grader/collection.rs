//! Per-video set of active graders

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    CompletionSink, Grader, GraderKind, PlaybackEvent, SamplingPolicy, WatchProgressGrader,
    WatchUntilEnd,
};
use crate::error::{Error, Result};
use crate::types::Percent;

/// Value attached to a grader entry: a flag for the end grader, a
/// percentage for the percent grader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraderValue {
    Flag(bool),
    Amount(u64),
}

/// Grading settings for one grader of one video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraderSettings {
    /// The grader has already been satisfied for this viewer
    #[serde(default, alias = "graderStatus")]
    pub grader_status: bool,

    #[serde(alias = "graderValue")]
    pub grader_value: GraderValue,
}

impl GraderSettings {
    fn threshold(&self) -> Result<Percent> {
        match self.grader_value {
            GraderValue::Amount(value) => Percent::try_from(value).map_err(Error::invalid_grader),
            GraderValue::Flag(_) => Err(Error::invalid_grader(
                "scored_on_percent needs a whole percentage, got a flag",
            )),
        }
    }
}

/// Graders active for one video, all feeding the same kind of sink.
#[derive(Debug)]
pub struct GraderCollection<S: CompletionSink> {
    graders: Vec<Grader<S>>,
}

impl<S: CompletionSink + Clone> GraderCollection<S> {
    /// Build graders from the video's settings.
    ///
    /// Unknown grader names are skipped, as are graders already satisfied.
    /// A video without a score gets no graders at all.
    pub fn from_settings(
        has_score: bool,
        settings: &BTreeMap<String, GraderSettings>,
        sink: &S,
        policy: SamplingPolicy,
    ) -> Result<Self> {
        let mut graders = Vec::new();

        if !has_score {
            return Ok(Self { graders });
        }

        for (name, entry) in settings {
            let Some(kind) = GraderKind::from_backend_name(name) else {
                warn!("Ignoring unknown grader '{}'", name);
                continue;
            };

            if entry.grader_status {
                debug!("Grader {} already satisfied, skipping", kind);
                continue;
            }

            let grader = match kind {
                GraderKind::WatchUntilEnd => Grader::UntilEnd(WatchUntilEnd::new(false, sink.clone())),
                GraderKind::WatchUntilPercent => Grader::UntilPercent(
                    WatchProgressGrader::new(entry.threshold()?, false, sink.clone())
                        .with_policy(policy),
                ),
            };
            graders.push(grader);
        }

        Ok(Self { graders })
    }
}

impl<S: CompletionSink> GraderCollection<S> {
    /// A collection with no graders
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            graders: Vec::new(),
        }
    }

    /// Deliver an event that arrived at `at` to every grader
    pub fn observe_at(&mut self, event: PlaybackEvent, at: Instant) {
        for grader in &mut self.graders {
            grader.observe_at(event, at);
        }
    }

    /// Deliver an event that arrived now to every grader
    pub fn observe(&mut self, event: PlaybackEvent) {
        self.observe_at(event, Instant::now());
    }

    /// Whether every grader has completed
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.graders.iter().all(Grader::is_complete)
    }

    /// Kinds of the active graders, in order
    #[must_use]
    pub fn kinds(&self) -> Vec<GraderKind> {
        self.graders.iter().map(Grader::kind).collect()
    }

    /// Iterate over the active graders
    pub fn iter(&self) -> impl Iterator<Item = &Grader<S>> {
        self.graders.iter()
    }

    /// Number of active graders
    #[must_use]
    pub fn len(&self) -> usize {
        self.graders.len()
    }

    /// Whether no grader is active
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grader::testing::RecordingSink;

    fn settings(json: &str) -> BTreeMap<String, GraderSettings> {
        serde_json::from_str(json).unwrap()
    }

    fn both() -> BTreeMap<String, GraderSettings> {
        settings(
            r#"{
                "scored_on_end": {"grader_status": false, "grader_value": true},
                "scored_on_percent": {"grader_status": false, "grader_value": 2}
            }"#,
        )
    }

    #[test]
    fn test_builds_both_graders() {
        let sink = RecordingSink::default();
        let collection =
            GraderCollection::from_settings(true, &both(), &sink, SamplingPolicy::default())
                .unwrap();
        assert_eq!(
            collection.kinds(),
            vec![GraderKind::WatchUntilEnd, GraderKind::WatchUntilPercent]
        );
        assert!(!collection.is_complete());
    }

    #[test]
    fn test_no_score_means_no_graders() {
        let sink = RecordingSink::default();
        let collection =
            GraderCollection::from_settings(false, &both(), &sink, SamplingPolicy::default())
                .unwrap();
        assert!(collection.is_empty());
        assert!(collection.is_complete());
    }

    #[test]
    fn test_skips_satisfied_and_unknown_graders() {
        let sink = RecordingSink::default();
        let graders = settings(
            r#"{
                "scored_on_end": {"grader_status": true, "grader_value": true},
                "scored_on_percent": {"grader_value": 50},
                "scored_on_quiz": {"grader_value": 1}
            }"#,
        );
        let collection =
            GraderCollection::from_settings(true, &graders, &sink, SamplingPolicy::default())
                .unwrap();
        assert_eq!(collection.kinds(), vec![GraderKind::WatchUntilPercent]);
    }

    #[test]
    fn test_accepts_camel_case_entries() {
        let sink = RecordingSink::default();
        let graders = settings(
            r#"{
                "scored_on_end": {"graderStatus": true, "graderValue": true},
                "scored_on_percent": {"graderStatus": false, "graderValue": 50}
            }"#,
        );
        let collection =
            GraderCollection::from_settings(true, &graders, &sink, SamplingPolicy::default())
                .unwrap();
        assert_eq!(collection.kinds(), vec![GraderKind::WatchUntilPercent]);
    }

    #[test]
    fn test_rejects_bad_percent_values() {
        let sink = RecordingSink::default();
        for json in [
            r#"{"scored_on_percent": {"grader_value": 150}}"#,
            r#"{"scored_on_percent": {"grader_value": true}}"#,
        ] {
            let result = GraderCollection::from_settings(
                true,
                &settings(json),
                &sink,
                SamplingPolicy::default(),
            );
            assert!(matches!(result, Err(Error::InvalidGrader(_))), "{json}");
        }
    }

    #[test]
    fn test_percent_grader_completes_before_end() {
        let sink = RecordingSink::default();
        let mut collection =
            GraderCollection::from_settings(true, &both(), &sink, SamplingPolicy::default())
                .unwrap();

        let base = Instant::now();
        collection.observe_at(PlaybackEvent::Play { duration_secs: 100.0 }, base);
        for (i, position) in [0.9, 1.1, 1.5, 2.1].into_iter().enumerate() {
            let at = base + std::time::Duration::from_secs(2) * u32::try_from(i).unwrap();
            collection.observe_at(PlaybackEvent::Progress { position_secs: position }, at);
        }

        assert_eq!(sink.reports(), vec![GraderKind::WatchUntilPercent]);
        assert!(!collection.is_complete());

        collection.observe(PlaybackEvent::Ended);
        collection.observe(PlaybackEvent::Ended);
        assert!(collection.is_complete());
        assert_eq!(
            sink.reports(),
            vec![GraderKind::WatchUntilPercent, GraderKind::WatchUntilEnd]
        );
    }
}
