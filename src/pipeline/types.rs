//! Data passed between the pipeline stages.

use crate::pipeline::error::EpisodeFailure;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tempfile::TempPath;

/// Output of the merge stage: one concatenated, not yet re-encoded episode.
///
/// Dropping it deletes the file.
#[derive(Debug)]
pub struct MergedEpisode {
    pub position: usize,
    pub file: TempPath,
}

impl MergedEpisode {
    pub fn path(&self) -> &Path {
        &self.file
    }
}

/// Output of the compress stage: the final encoded episode in a temp file.
#[derive(Debug)]
pub struct MaterializedEpisode {
    pub position: usize,
    pub file: TempPath,
    pub duration: Duration,
    pub size_bytes: u64,
}

impl MaterializedEpisode {
    pub fn path(&self) -> &Path {
        &self.file
    }
}

/// An episode copied into the destination directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedEpisode {
    pub position: usize,
    pub title: String,
    /// Relative to the book directory.
    pub file_name: String,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub size_bytes: u64,
}

/// Outcome of one pipeline run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    /// Sorted by position.
    pub published: Vec<PublishedEpisode>,
    /// Episodes lost under the skip policy, sorted by position.
    pub failed: Vec<EpisodeFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_positions(&self) -> Vec<usize> {
        self.failed.iter().map(|f| f.position).collect()
    }

    pub fn total_duration(&self) -> Duration {
        self.published.iter().map(|e| e.duration).sum()
    }
}

/// Progress notifications for front ends.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Planned { position: usize },
    Published(PublishedEpisode),
    Failed { position: usize, message: String },
}

pub(crate) mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}
