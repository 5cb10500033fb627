//! Earned-score persistence
//!
//! Scores live in a single JSON file keyed by video id. Only reports the
//! backend accepted ever reach this file.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::grader::GraderKind;

/// What a viewer has earned on one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredScore {
    /// Latest score from the backend, if it sent one
    pub score: Option<f64>,

    /// Graders the backend has accepted
    #[serde(default)]
    pub graded: BTreeSet<GraderKind>,

    pub updated_at: DateTime<Utc>,
}

/// JSON-file store of earned scores
#[derive(Debug)]
pub struct ScoreStore {
    path: PathBuf,
    scores: BTreeMap<String, StoredScore>,
}

impl ScoreStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let scores = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };

        debug!("Loaded {} stored score(s) from {:?}", scores.len(), path);
        Ok(Self { path, scores })
    }

    /// Write the store back to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(&self.scores)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, video_id: &str) -> Option<&StoredScore> {
        self.scores.get(video_id)
    }

    /// Merge newly accepted graders and score into a video's entry
    pub fn record(&mut self, video_id: &str, score: Option<f64>, graded: &BTreeSet<GraderKind>) {
        let entry = self
            .scores
            .entry(video_id.to_string())
            .or_insert_with(|| StoredScore {
                score: None,
                graded: BTreeSet::new(),
                updated_at: Utc::now(),
            });

        if score.is_some() {
            entry.score = score;
        }
        entry.graded.extend(graded.iter().copied());
        entry.updated_at = Utc::now();
    }

    /// Forget a video; returns whether it was stored
    pub fn remove(&mut self, video_id: &str) -> bool {
        self.scores.remove(video_id).is_some()
    }

    /// Iterate over stored videos in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoredScore)> {
        self.scores.iter().map(|(id, score)| (id.as_str(), score))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded(kinds: &[GraderKind]) -> BTreeSet<GraderKind> {
        kinds.iter().copied().collect()
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScoreStore::load(dir.path().join("scores.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_record_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scores.json");

        let mut store = ScoreStore::load(&path).unwrap();
        store.record("intro", Some(0.5), &graded(&[GraderKind::WatchUntilPercent]));
        store.save().unwrap();

        let reloaded = ScoreStore::load(&path).unwrap();
        let entry = reloaded.get("intro").unwrap();
        assert_eq!(entry.score, Some(0.5));
        assert_eq!(entry.graded, graded(&[GraderKind::WatchUntilPercent]));
    }

    #[test]
    fn test_record_merges_graders_and_keeps_score() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScoreStore::load(dir.path().join("scores.json")).unwrap();

        store.record("intro", Some(1.0), &graded(&[GraderKind::WatchUntilEnd]));
        store.record("intro", None, &graded(&[GraderKind::WatchUntilPercent]));

        let entry = store.get("intro").unwrap();
        assert_eq!(entry.score, Some(1.0));
        assert_eq!(
            entry.graded,
            graded(&[GraderKind::WatchUntilEnd, GraderKind::WatchUntilPercent])
        );
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScoreStore::load(dir.path().join("scores.json")).unwrap();
        store.record("intro", Some(1.0), &BTreeSet::new());
        assert!(store.remove("intro"));
        assert!(!store.remove("intro"));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ScoreStore::load(&path),
            Err(crate::error::Error::Json(_))
        ));
    }
}
