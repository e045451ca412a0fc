//! Merge stage: cut each range losslessly, then concatenate the clips.

use crate::error::{BookcastError, Result};
use crate::exec::{CommandExecutor, path_arg};
use crate::pipeline::error::{FailurePolicy, StationError};
use crate::pipeline::{scratch_file, scratch_named};
use crate::pipeline::station::Station;
use crate::pipeline::types::MergedEpisode;
use crate::planner::{EpisodePlan, SplitRange};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempPath;
use tracing::debug;

#[derive(Clone)]
pub struct MergeStation {
    executor: Arc<dyn CommandExecutor>,
    ffmpeg: String,
    on_error: FailurePolicy,
    temp_dir: Option<PathBuf>,
}

impl MergeStation {
    pub fn new(executor: Arc<dyn CommandExecutor>, ffmpeg: impl Into<String>) -> Self {
        Self {
            executor,
            ffmpeg: ffmpeg.into(),
            on_error: FailurePolicy::default(),
            temp_dir: None,
        }
    }

    pub fn with_policy(mut self, on_error: FailurePolicy) -> Self {
        self.on_error = on_error;
        self
    }

    /// Creates scratch files in `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Produces the merged file for `plan`.
    ///
    /// Clips and the concat manifest are deleted when this returns,
    /// whether it succeeded or not.
    pub fn merge(&self, plan: &EpisodePlan) -> Result<MergedEpisode> {
        if plan.ranges.is_empty() {
            return Err(BookcastError::Other(format!(
                "episode {} has no ranges",
                plan.position
            )));
        }

        let clips = plan
            .ranges
            .iter()
            .map(|range| self.extract(range))
            .collect::<Result<Vec<_>>>()?;

        let manifest = self.write_manifest(&clips)?;
        let merged = scratch_file(self.temp_dir.as_deref(), ".mp3")?;

        self.executor.execute(
            &self.ffmpeg,
            &[
                "-y",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                path_arg(&manifest)?,
                "-f",
                "mp3",
                "-c",
                "copy",
                path_arg(&merged)?,
            ],
        )?;

        debug!(
            position = plan.position,
            clips = clips.len(),
            "episode merged"
        );

        Ok(MergedEpisode {
            position: plan.position,
            file: merged,
        })
    }

    fn extract(&self, range: &SplitRange) -> Result<TempPath> {
        let clip = scratch_file(self.temp_dir.as_deref(), ".mp3")?;
        let from = format_timestamp(range.from);
        let to = format_timestamp(range.to);

        self.executor.execute(
            &self.ffmpeg,
            &[
                "-y",
                "-i",
                path_arg(range.source.path())?,
                "-acodec",
                "copy",
                "-f",
                "mp3",
                "-ss",
                &from,
                "-to",
                &to,
                "-write_xing",
                "0",
                path_arg(&clip)?,
            ],
        )?;
        Ok(clip)
    }

    fn write_manifest(&self, clips: &[TempPath]) -> Result<TempPath> {
        let mut file = scratch_named(self.temp_dir.as_deref(), ".txt")?;
        for clip in clips {
            writeln!(file, "{}", manifest_line(clip))?;
        }
        file.flush()?;
        Ok(file.into_temp_path())
    }
}

impl Station for MergeStation {
    type Input = EpisodePlan;
    type Output = MergedEpisode;

    fn process(&mut self, plan: EpisodePlan) -> std::result::Result<MergedEpisode, StationError> {
        self.merge(&plan)
            .map_err(|e| self.on_error.station_error(plan.position, &e))
    }

    fn name(&self) -> &'static str {
        "Merge"
    }
}

/// Seconds with microsecond precision, as ffmpeg's `-ss`/`-to` accept.
pub fn format_timestamp(at: Duration) -> String {
    format!("{}.{:06}", at.as_secs(), at.subsec_micros())
}

/// One `file '<path>'` entry of a concat-demuxer manifest.
fn manifest_line(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{}'", escaped)
}
