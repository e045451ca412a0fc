//! Silence detection through ffmpeg's `silencedetect` filter.

use crate::error::Result;
use crate::exec::{CommandExecutor, path_arg};
use crate::planner::SilenceInterval;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const START_MARKER: &str = "silence_start:";
const END_MARKER: &str = "silence_end:";
const DURATION_MARKER: &str = "silence_duration:";

/// Detector thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceConfig {
    /// Level below which audio counts as silent, in dB.
    pub noise_floor_db: f64,
    /// Shortest gap worth reporting.
    pub min_duration: Duration,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            noise_floor_db: crate::defaults::NOISE_FLOOR_DB,
            min_duration: Duration::from_secs_f64(crate::defaults::MIN_SILENCE_SECS),
        }
    }
}

impl SilenceConfig {
    fn filter(&self) -> String {
        format!(
            "silencedetect=noise={}dB:d={}",
            self.noise_floor_db,
            self.min_duration.as_secs_f64()
        )
    }
}

#[derive(Clone)]
pub struct SilenceDetector {
    executor: Arc<dyn CommandExecutor>,
    ffmpeg: String,
    config: SilenceConfig,
}

impl SilenceDetector {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        ffmpeg: impl Into<String>,
        config: SilenceConfig,
    ) -> Self {
        Self {
            executor,
            ffmpeg: ffmpeg.into(),
            config,
        }
    }

    /// Silent stretches of `path`, ordered by start.
    pub fn detect(&self, path: &Path) -> Result<Vec<SilenceInterval>> {
        let filter = self.config.filter();
        let output = self.executor.execute(
            &self.ffmpeg,
            &[
                "-hide_banner",
                "-nostats",
                "-i",
                path_arg(path)?,
                "-af",
                &filter,
                "-f",
                "null",
                "-",
            ],
        )?;

        let silences = parse_silence_log(&output.stderr);
        debug!(file = %path.display(), count = silences.len(), "silences detected");
        Ok(silences)
    }
}

/// Pairs `silence_start` / `silence_end` markers from a silencedetect log.
///
/// A start without a following end (silence running to the end of the file)
/// is dropped. An end without an open start is ignored. Unparseable numbers
/// are skipped.
pub fn parse_silence_log(log: &str) -> Vec<SilenceInterval> {
    let mut silences = Vec::new();
    let mut open: Option<Duration> = None;

    for line in log.lines() {
        if let Some(start) = value_after(line, START_MARKER) {
            open = Some(start);
        } else if let Some(end) = value_after(line, END_MARKER) {
            let Some(start) = open.take() else {
                continue;
            };
            let duration = value_after(line, DURATION_MARKER)
                .unwrap_or_else(|| end.saturating_sub(start));
            silences.push(SilenceInterval::new(start, end.max(start), duration));
        }
    }

    silences.sort_by_key(|s| s.start);
    silences
}

/// Seconds following `marker` on `line`, clamped at zero. Values a
/// `Duration` cannot hold count as unparseable.
fn value_after(line: &str, marker: &str) -> Option<Duration> {
    let index = line.find(marker)?;
    let token = line[index + marker.len()..].split_whitespace().next()?;
    let seconds: f64 = token.parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    Duration::try_from_secs_f64(seconds.max(0.0)).ok()
}
