//! Watch Grader - Main entry point
//!
//! Replays recorded playback through a grading session and reports the
//! grade, and manages configuration and stored scores.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use watch_grader::config::Config;
use watch_grader::display;
use watch_grader::error::{Error, Result};
use watch_grader::events::{read_event_log, TimedEvent};
use watch_grader::report::{DryRunEndpoint, GradeEndpoint, HttpEndpoint};
use watch_grader::session::{GradingSession, VideoGrading};
use watch_grader::store::ScoreStore;

#[derive(Parser)]
#[command(name = "watch-grader")]
#[command(author, version, about = "Grade video watch progress")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "WATCH_GRADER_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a playback event log through a grading session
    Replay {
        /// Video grading settings (JSON)
        video: PathBuf,

        /// Playback event log (JSON lines)
        events: PathBuf,

        /// Log grades instead of posting them
        #[arg(long)]
        dry_run: bool,

        /// Wait between events as recorded instead of replaying instantly
        #[arg(long)]
        realtime: bool,

        /// Extra attempts for reports that failed
        #[arg(long, default_value = "0")]
        retries: u32,
    },

    /// Show or edit configuration
    Config {
        /// Print current configuration
        #[arg(long)]
        show: bool,

        /// Create default configuration file
        #[arg(long)]
        init: bool,
    },

    /// Show or clear stored scores
    Scores {
        /// Forget the stored score of a video
        #[arg(long)]
        clear: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration
    let config = if let Some(ref path) = cli.config {
        Config::load_from(path)?
    } else {
        Config::load()?
    };
    config.validate()?;

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(config.general.log_level.to_lowercase())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Some(Commands::Replay {
            video,
            events,
            dry_run,
            realtime,
            retries,
        }) => run_replay(&config, &video, &events, dry_run, realtime, retries).await,

        Some(Commands::Config { show, init }) => {
            if init {
                let default_config = Config::default();
                default_config.save()?;
                println!(
                    "Created default configuration at {}",
                    Config::config_path()?.display()
                );
            } else if show {
                let contents = toml::to_string_pretty(&config)?;
                println!("{contents}");
            } else {
                println!("Configuration path: {}", Config::config_path()?.display());
            }
            Ok(())
        }

        Some(Commands::Scores { clear }) => {
            let mut store = ScoreStore::load(config.scores_path()?)?;
            if let Some(video_id) = clear {
                if store.remove(&video_id) {
                    store.save()?;
                    println!("Cleared stored score for {video_id}");
                } else {
                    println!("No stored score for {video_id}");
                }
            } else {
                display::display_stored_scores(&store);
            }
            Ok(())
        }

        None => {
            // Default: list stored scores
            let store = ScoreStore::load(config.scores_path()?)?;
            display::display_stored_scores(&store);
            Ok(())
        }
    }
}

async fn run_replay(
    config: &Config,
    video_path: &Path,
    events_path: &Path,
    dry_run: bool,
    realtime: bool,
    retries: u32,
) -> Result<()> {
    let video = VideoGrading::load_from(video_path)?;
    let events = read_event_log(events_path)?;
    let mut store = ScoreStore::load(config.scores_path()?)?;

    let endpoint: Box<dyn GradeEndpoint> = if dry_run {
        Box::new(DryRunEndpoint::new(video.max_score))
    } else {
        let url = video.grade_url.clone().ok_or_else(|| {
            Error::config(format!(
                "video {} has no grade_url; use --dry-run to replay without posting",
                video.video_id
            ))
        })?;
        Box::new(HttpEndpoint::new(url, &config.report)?)
    };

    let video_id = video.video_id.clone();
    let mut session = GradingSession::start(
        video,
        endpoint,
        config.grading.sampling_policy(),
        store.get(&video_id),
    )?;

    tracing::info!(
        "Replaying {} event(s) for {} (session {})",
        events.len(),
        video_id,
        session.id()
    );

    if realtime {
        tokio::select! {
            () = replay_realtime(&mut session, &events) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal, discarding remaining events");
            }
        }
    } else {
        let base = Instant::now();
        for timed in &events {
            session.observe_at(timed.event, timed.instant_from(base));
        }
    }

    let graders = session.grader_kinds();
    let watched = session.watched();
    let mut reporter = session.finish().await?;

    for attempt in 1..=retries {
        if reporter.board().pending_retries().is_empty() {
            break;
        }
        let remaining = reporter.retry_failed().await;
        tracing::info!("Retry {}/{}: {} report(s) still undelivered", attempt, retries, remaining);
    }

    let board = reporter.board();
    if !board.graded().is_empty() {
        store.record(&video_id, board.score(), board.graded());
        store.save()?;
        tracing::info!("Saved score for {} to {:?}", video_id, store.path());
    }

    display::display_session(&video_id, &graders, &watched, board);
    Ok(())
}

async fn replay_realtime<E>(session: &mut GradingSession<E>, events: &[TimedEvent])
where
    E: GradeEndpoint + 'static,
{
    let start = tokio::time::Instant::now();
    for timed in events {
        tokio::time::sleep_until(start + timed.at.to_duration()).await;
        session.observe(timed.event);
    }
}
