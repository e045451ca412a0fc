use crate::audio::SilenceConfig;
use crate::defaults;
use crate::error::{BookcastError, Result};
use crate::feed::FeedOptions;
use crate::pipeline::{FailurePolicy, PipelineConfig, PipelineMode};
use crate::planner::{FinalEpisode, PlannerConfig, SnapWindow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub episodes: EpisodesConfig,
    pub silence: SilenceSection,
    pub encode: EncodeConfig,
    pub pipeline: PipelineSection,
    pub tools: ToolsConfig,
    pub feed: FeedConfig,
}

/// Episode segmentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EpisodesConfig {
    pub length_secs: u64,
    /// Extension of the source files, without the dot.
    pub extension: String,
    pub final_episode: FinalEpisode,
}

/// Silence detection and cut snapping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SilenceSection {
    pub enabled: bool,
    pub noise_floor_db: f64,
    pub min_duration_secs: f64,
    pub min_tolerance_secs: f64,
    pub max_tolerance_secs: f64,
}

/// Re-encoding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncodeConfig {
    /// LAME VBR quality, 0 (best) to 9 (smallest).
    pub quality: u8,
}

/// Concurrency and failure handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSection {
    pub mode: PipelineMode,
    pub on_error: FailurePolicy,
    /// Pool size; twice the core count when unset.
    pub workers: Option<usize>,
    /// Files analysed ahead of the planner; the core count when unset.
    pub analysis_workers: Option<usize>,
    pub channel_buffer: usize,
    /// Scratch directory for intermediate files; the system temp dir when unset.
    pub temp_dir: Option<PathBuf>,
}

/// External tool locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
}

/// Feed publishing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub domain: String,
    pub language: String,
    pub description: String,
}

impl Default for EpisodesConfig {
    fn default() -> Self {
        Self {
            length_secs: defaults::EPISODE_LENGTH_SECS,
            extension: defaults::AUDIO_EXTENSION.to_string(),
            final_episode: FinalEpisode::default(),
        }
    }
}

impl Default for SilenceSection {
    fn default() -> Self {
        Self {
            enabled: false,
            noise_floor_db: defaults::NOISE_FLOOR_DB,
            min_duration_secs: defaults::MIN_SILENCE_SECS,
            min_tolerance_secs: defaults::MIN_TOLERANCE_SECS,
            max_tolerance_secs: defaults::MAX_TOLERANCE_SECS,
        }
    }
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            quality: defaults::ENCODE_QUALITY,
        }
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            mode: PipelineMode::default(),
            on_error: FailurePolicy::default(),
            workers: None,
            analysis_workers: None,
            channel_buffer: defaults::CHANNEL_BUFFER,
            temp_dir: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: defaults::FFMPEG.to_string(),
            ffprobe: defaults::FFPROBE.to_string(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        let options = FeedOptions::default();
        Self {
            base_url: options.base_url,
            domain: options.domain,
            language: options.language,
            description: options.description,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BookcastError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                BookcastError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(BookcastError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - BOOKCAST_FFMPEG → tools.ffmpeg
    /// - BOOKCAST_FFPROBE → tools.ffprobe
    /// - BOOKCAST_FEED_URL → feed.base_url
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(ffmpeg) = std::env::var("BOOKCAST_FFMPEG")
            && !ffmpeg.is_empty()
        {
            self.tools.ffmpeg = ffmpeg;
        }

        if let Ok(ffprobe) = std::env::var("BOOKCAST_FFPROBE")
            && !ffprobe.is_empty()
        {
            self.tools.ffprobe = ffprobe;
        }

        if let Ok(url) = std::env::var("BOOKCAST_FEED_URL")
            && !url.is_empty()
        {
            self.feed.base_url = url;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/bookcast/config.toml on Linux, `None` when the
    /// platform has no config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bookcast").join("config.toml"))
    }

    /// Rejects values the planner or the encoder cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.episodes.length_secs == 0 {
            return Err(invalid("episodes.length_secs", "must be greater than zero"));
        }
        if self.episodes.extension.trim_start_matches('.').is_empty() {
            return Err(invalid("episodes.extension", "must not be empty"));
        }

        let silence = &self.silence;
        if !(silence.min_duration_secs.is_finite() && silence.min_duration_secs > 0.0) {
            return Err(invalid("silence.min_duration_secs", "must be positive"));
        }
        if !(silence.min_tolerance_secs.is_finite() && silence.min_tolerance_secs >= 0.0) {
            return Err(invalid("silence.min_tolerance_secs", "must not be negative"));
        }
        if !(silence.max_tolerance_secs.is_finite()
            && silence.max_tolerance_secs > silence.min_tolerance_secs)
        {
            return Err(invalid(
                "silence.max_tolerance_secs",
                "must be greater than silence.min_tolerance_secs",
            ));
        }
        if !silence.noise_floor_db.is_finite() || silence.noise_floor_db > 0.0 {
            return Err(invalid("silence.noise_floor_db", "must be at most 0 dB"));
        }
        for (key, secs) in [
            ("silence.min_duration_secs", silence.min_duration_secs),
            ("silence.max_tolerance_secs", silence.max_tolerance_secs),
        ] {
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(invalid(key, "is out of range"));
            }
        }

        if self.encode.quality > 9 {
            return Err(invalid("encode.quality", "must be between 0 and 9"));
        }
        if self.pipeline.workers == Some(0) {
            return Err(invalid("pipeline.workers", "must be greater than zero"));
        }
        if self.pipeline.analysis_workers == Some(0) {
            return Err(invalid("pipeline.analysis_workers", "must be greater than zero"));
        }
        if self.pipeline.channel_buffer == 0 {
            return Err(invalid("pipeline.channel_buffer", "must be greater than zero"));
        }
        if self.tools.ffmpeg.is_empty() || self.tools.ffprobe.is_empty() {
            return Err(invalid("tools", "tool paths must not be empty"));
        }
        Ok(())
    }

    pub fn episode_length(&self) -> Duration {
        Duration::from_secs(self.episodes.length_secs)
    }

    pub fn extension(&self) -> &str {
        self.episodes.extension.trim_start_matches('.')
    }

    pub fn planner_config(&self) -> PlannerConfig {
        let config = PlannerConfig::new(self.episode_length())
            .with_final_episode(self.episodes.final_episode);
        if self.silence.enabled {
            config.with_snap(SnapWindow::from_secs_f64(
                self.silence.min_tolerance_secs,
                self.silence.max_tolerance_secs,
            ))
        } else {
            config
        }
    }

    /// Detector settings, or `None` when snapping is off.
    pub fn silence_config(&self) -> Option<SilenceConfig> {
        self.silence.enabled.then(|| SilenceConfig {
            noise_floor_db: self.silence.noise_floor_db,
            min_duration: saturating_secs(self.silence.min_duration_secs),
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            mode: self.pipeline.mode,
            on_error: self.pipeline.on_error,
            workers: self.pipeline.workers.unwrap_or_else(defaults::pool_workers),
            channel_buffer: self.pipeline.channel_buffer,
            quality: self.encode.quality,
            ffmpeg: self.tools.ffmpeg.clone(),
            ffprobe: self.tools.ffprobe.clone(),
            temp_dir: self.pipeline.temp_dir.clone(),
        }
    }

    pub fn analysis_workers(&self) -> usize {
        self.pipeline
            .analysis_workers
            .unwrap_or_else(defaults::analysis_workers)
    }

    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            base_url: self.feed.base_url.clone(),
            domain: self.feed.domain.clone(),
            language: self.feed.language.clone(),
            description: self.feed.description.clone(),
        }
    }
}

/// Non-negative seconds, capped at `Duration::MAX`.
fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

fn invalid(key: &str, message: &str) -> BookcastError {
    BookcastError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
