//! # Watch Grader
//!
//! Video watch-progress grading.
//!
//! This crate provides:
//! - Graders that turn playback events into a one-shot "watched" decision
//! - A non-blocking report queue and an async reporter posting grades
//! - Score and status bookkeeping, with retry of failed reports
//! - JSON persistence of earned scores
//! - Replay of recorded playback event logs

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod grader;
pub mod report;
pub mod score;
pub mod session;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use grader::{CompletionSink, GraderKind, PlaybackEvent, WatchProgressGrader};
pub use session::{GradingSession, VideoGrading};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "watch-grader";
