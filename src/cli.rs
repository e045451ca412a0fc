//! Command-line interface for bookcast
//!
//! Provides argument parsing using clap derive macros.

use crate::book::BookOverrides;
use crate::config::Config;
use crate::pipeline::{FailurePolicy, PipelineMode};
use crate::planner::FinalEpisode;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Turn an audiobook into a podcast
#[derive(Parser, Debug)]
#[command(
    name = "bookcast",
    version,
    about = "Turn an audiobook directory into podcast episodes and a feed",
    subcommand_negates_reqs = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: progress details, -vv: debug, -vvv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Directory holding the audiobook files
    #[arg(long, value_name = "DIR", required = true)]
    pub src: Option<PathBuf>,

    /// Directory the book's episode directory is created in
    #[arg(long, value_name = "DIR", required = true)]
    pub dst: Option<PathBuf>,

    #[command(flatten)]
    pub book: BookArgs,

    #[command(flatten)]
    pub tuning: TuningArgs,

    /// Run the pool pipeline instead of the staged one
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<ModeArg>,

    /// Number of pool workers (default: twice the core count)
    #[arg(long, short = 'w', value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,

    /// Keep going when an episode fails and report the failures at the end
    #[arg(long)]
    pub skip_failed: bool,

    /// VBR quality for the encoded episodes, 0 (best) to 9 (smallest)
    #[arg(long, value_name = "Q", value_parser = clap::value_parser!(u8).range(0..=9))]
    pub quality: Option<u8>,
}

/// Book identity overrides
#[derive(Args, Debug, Default, Clone)]
pub struct BookArgs {
    /// Short name of the book, used for the output directory and file names
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Book title (default: album tag of the first file)
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Book author (default: artist tag of the first file)
    #[arg(long, value_name = "AUTHOR")]
    pub author: Option<String>,
}

impl BookArgs {
    pub fn overrides(&self) -> BookOverrides {
        BookOverrides {
            id: self.name.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
        }
    }
}

/// Planning parameters shared by conversion and dry runs
#[derive(Args, Debug, Default, Clone)]
pub struct TuningArgs {
    /// Episode length (default: 10m). Examples: 600, 15m, 1h30m
    #[arg(long, short = 'l', value_name = "DURATION", value_parser = parse_episode_secs)]
    pub episode_length: Option<u64>,

    /// Move cuts into nearby silences
    #[arg(long)]
    pub silence: bool,

    /// Extension of the audio files to pick up (default: mp3)
    #[arg(long, value_name = "EXT")]
    pub extension: Option<String>,

    /// What to do with a final episode shorter than the episode length
    #[arg(long, value_enum, value_name = "POLICY")]
    pub final_episode: Option<FinalEpisodeArg>,
}

impl TuningArgs {
    /// Writes the given flags over the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(secs) = self.episode_length {
            config.episodes.length_secs = secs;
        }
        if self.silence {
            config.silence.enabled = true;
        }
        if let Some(ext) = &self.extension {
            config.episodes.extension = ext.clone();
        }
        if let Some(policy) = self.final_episode {
            config.episodes.final_episode = policy.into();
        }
    }
}

impl Cli {
    /// Writes every conversion flag over the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        self.tuning.apply(config);
        if let Some(mode) = self.mode {
            config.pipeline.mode = mode.into();
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = Some(workers as usize);
        }
        if self.skip_failed {
            config.pipeline.on_error = FailurePolicy::SkipEpisode;
        }
        if let Some(quality) = self.quality {
            config.encode.quality = quality;
        }
    }
}

/// Pipeline topology
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// One thread per stage, connected by bounded channels
    Staged,
    /// Workers running both stages per episode
    Pool,
}

impl From<ModeArg> for PipelineMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Staged => PipelineMode::Staged,
            ModeArg::Pool => PipelineMode::Pool,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalEpisodeArg {
    /// Publish it as its own, shorter episode
    Standalone,
    /// Append it to the episode before
    MergeIntoPrevious,
}

impl From<FinalEpisodeArg> for FinalEpisode {
    fn from(policy: FinalEpisodeArg) -> Self {
        match policy {
            FinalEpisodeArg::Standalone => FinalEpisode::Standalone,
            FinalEpisodeArg::MergeIntoPrevious => FinalEpisode::MergeIntoPrevious,
        }
    }
}

/// Parse an episode length into whole seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `5m`, `2h`), and compound (`1h30m`, `2m30s`).
fn parse_episode_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    // Bare number → seconds
    let secs = match s.parse::<u64>() {
        Ok(secs) => secs,
        Err(_) => humantime::parse_duration(s)
            .map(|d| d.as_secs())
            .map_err(|e| e.to_string())?,
    };
    if secs == 0 {
        return Err("episode length must be at least one second".to_string());
    }
    Ok(secs)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show how the book would be split, without producing any audio
    Plan {
        /// Directory holding the audiobook files
        #[arg(long, value_name = "DIR")]
        src: PathBuf,

        #[command(flatten)]
        book: BookArgs,

        #[command(flatten)]
        tuning: TuningArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that ffmpeg and ffprobe are available
    Check,

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Dump,
    /// Print the default configuration file location
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert_command() {
        let cli = Cli::try_parse_from(["bookcast", "--src", "/books/dune", "--dst", "/srv/pod"])
            .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.src, Some(PathBuf::from("/books/dune")));
        assert_eq!(cli.dst, Some(PathBuf::from("/srv/pod")));
        assert!(cli.book.name.is_none());
        assert!(cli.tuning.episode_length.is_none());
        assert!(!cli.tuning.silence);
        assert!(cli.mode.is_none());
        assert!(cli.workers.is_none());
        assert!(!cli.skip_failed);
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_convert_requires_src_and_dst() {
        let err = Cli::try_parse_from(["bookcast", "--src", "/books/dune"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_parse_verbose_double() {
        let cli = Cli::try_parse_from(["bookcast", "-vv", "check"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_all_conversion_flags() {
        let cli = Cli::try_parse_from([
            "bookcast",
            "--src",
            "in",
            "--dst",
            "out",
            "--name",
            "dune",
            "--title",
            "Dune",
            "--author",
            "Frank Herbert",
            "--episode-length",
            "15m",
            "--silence",
            "--final-episode",
            "merge-into-previous",
            "--mode",
            "pool",
            "-w",
            "3",
            "--skip-failed",
            "--quality",
            "4",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.episodes.length_secs, 900);
        assert!(config.silence.enabled);
        assert_eq!(config.episodes.final_episode, FinalEpisode::MergeIntoPrevious);
        assert_eq!(config.pipeline.mode, PipelineMode::Pool);
        assert_eq!(config.pipeline.workers, Some(3));
        assert_eq!(config.pipeline.on_error, FailurePolicy::SkipEpisode);
        assert_eq!(config.encode.quality, 4);

        let overrides = cli.book.overrides();
        assert_eq!(overrides.id.as_deref(), Some("dune"));
        assert_eq!(overrides.author.as_deref(), Some("Frank Herbert"));
    }

    #[test]
    fn test_unset_flags_leave_config_alone() {
        let cli = Cli::try_parse_from(["bookcast", "--src", "in", "--dst", "out"]).unwrap();
        let mut config = Config::default();
        config.pipeline.on_error = FailurePolicy::SkipEpisode;
        cli.apply(&mut config);
        assert_eq!(config.pipeline.on_error, FailurePolicy::SkipEpisode);
        assert_eq!(config.episodes.length_secs, 600);
    }

    #[test]
    fn test_parse_episode_secs() {
        assert_eq!(parse_episode_secs("600"), Ok(600));
        assert_eq!(parse_episode_secs("15m"), Ok(900));
        assert_eq!(parse_episode_secs("1h30m"), Ok(5400));
        assert!(parse_episode_secs("0").is_err());
        assert!(parse_episode_secs("soon").is_err());
    }

    #[test]
    fn test_workers_must_be_positive() {
        let result =
            Cli::try_parse_from(["bookcast", "--src", "in", "--dst", "out", "--workers", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from([
            "bookcast",
            "plan",
            "--src",
            "/books/dune",
            "--silence",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Plan {
                src, tuning, json, ..
            }) => {
                assert_eq!(src, PathBuf::from("/books/dune"));
                assert!(tuning.silence);
                assert!(json);
            }
            other => panic!("Expected Plan command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_check_without_src() {
        let cli = Cli::try_parse_from(["bookcast", "check"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Check)));
    }

    #[test]
    fn test_parse_config_dump() {
        let cli = Cli::try_parse_from(["bookcast", "config", "dump"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Dump
            })
        ));
    }

    #[test]
    fn test_global_options_after_command() {
        let cli =
            Cli::try_parse_from(["bookcast", "check", "--config", "/tmp/config.toml", "-q"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/config.toml")));
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["bookcast", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Completions { shell: Shell::Bash })
        ));
    }

    #[test]
    fn test_invalid_command_returns_error() {
        let err = Cli::try_parse_from(["bookcast", "invalid"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["bookcast", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
