//! Display utilities for formatting grading output.
//!
//! Shared formatting functions used by the CLI to show a session's result
//! and the stored scores in the terminal.
//!
//! # Functions
//!
//! - [`make_bar`] - Create visual bar charts for watched percentages
//! - [`print_section`] / [`print_section_simple`] - Print section headers
//! - [`display_session`] / [`display_stored_scores`] - Display formatted results

use crate::grader::GraderKind;
use crate::score::{format_points, ScoreBoard};
use crate::store::ScoreStore;

/// Create a visual bar for a percentage.
///
/// Uses Unicode block characters to create a proportional bar chart.
///
/// # Examples
///
/// ```
/// use watch_grader::display::make_bar;
///
/// assert_eq!(make_bar(50.0, 10), "█████░░░░░");
/// assert_eq!(make_bar(0.0, 4), "░░░░");
/// assert_eq!(make_bar(250.0, 4), "████");
/// ```
#[must_use]
pub fn make_bar(percent: f64, width: usize) -> String {
    let ratio = if percent.is_finite() {
        (percent / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    };
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let filled = (ratio * width as f64) as usize;
    let empty = width.saturating_sub(filled);
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

/// Print a section header with equals signs.
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(50));
    println!("  {title}");
    println!("{}", "=".repeat(50));
}

/// Print a simple section header with dashes.
pub fn print_section_simple(title: &str) {
    println!("\n{title}");
    println!("{}", "-".repeat(30));
}

/// Display the outcome of a grading session.
pub fn display_session(
    video_id: &str,
    graders: &[GraderKind],
    watched: &[(GraderKind, f64)],
    board: &ScoreBoard,
) {
    print_section(&format!("VIDEO {video_id}"));

    if graders.is_empty() {
        println!("  No active graders");
    } else {
        print_section_simple("GRADERS");
        for kind in graders {
            match watched.iter().find(|(k, _)| k == kind) {
                Some((_, percent)) => println!(
                    "  {:<20} {} {:>5.1}% watched",
                    kind.backend_name(),
                    make_bar(*percent, 20),
                    percent
                ),
                None => println!("  {:<20}", kind.backend_name()),
            }
        }
    }

    print_section_simple("RESULT");
    println!("  {}", board.progress_text());
    if let Some(status) = board.status_text() {
        println!("  {status}");
    }
    let pending = board.pending_retries();
    if !pending.is_empty() {
        let names: Vec<_> = pending.iter().map(|k| k.backend_name()).collect();
        println!("  Undelivered: {}", names.join(", "));
    }
}

/// Display every stored score.
pub fn display_stored_scores(store: &ScoreStore) {
    print_section_simple(&format!("STORED SCORES ({})", store.len()));

    if store.is_empty() {
        println!("  Nothing graded yet.");
        return;
    }

    for (video_id, stored) in store.iter() {
        let score = stored
            .score
            .map_or_else(|| "-".to_string(), format_points);
        let graders: Vec<_> = stored.graded.iter().map(|k| k.backend_name()).collect();
        println!(
            "  {:<24} {:>6}  {:<36} {}",
            video_id,
            score,
            graders.join(", "),
            stored.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}
