//! bookcast - audiobooks as podcasts
//!
//! Splits a directory of audiobook files into fixed-length episodes, cutting
//! at silences where possible, and publishes them with an RSS feed.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
pub mod book;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
#[cfg(feature = "cli")]
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod feed;
pub mod logging;
pub mod pipeline;
pub mod planner;

// Core seams
pub use exec::{CommandExecutor, CommandOutput, SystemCommandExecutor};

// Planning
pub use planner::{
    AnalyzedFile, AudioFile, EpisodePlan, FinalEpisode, PlannerConfig, SegmentPlanner,
    SilenceInterval, SnapWindow, SplitRange, plan_episodes,
};

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineConfig, PipelineMode};
pub use pipeline::{FailurePolicy, PublishedEpisode, RunEvent, RunReport};

// Entry points
pub use app::{BookPlan, Conversion, ConvertRequest, convert, plan};
pub use book::{BookMeta, BookOverrides};

// Error handling
pub use error::{BookcastError, Result};

// Config
pub use config::Config;

// Station framework (for advanced users)
pub use pipeline::error::{ErrorReporter, StationError};
pub use pipeline::station::Station;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
