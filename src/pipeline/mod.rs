//! Episode production pipeline.
//!
//! Plans flow through a merge station and a compress station, each on its
//! own thread and connected by bounded crossbeam channels for backpressure,
//! or through a pool of workers that run both stages per episode. A single
//! consumer publishes the results in position order.

pub mod compress;
pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod pool;
pub mod publish;
pub mod station;
pub mod types;

pub use compress::CompressStation;
pub use error::{EpisodeFailure, ErrorReporter, FailureLog, FailurePolicy, LogReporter, StationError};
pub use merge::MergeStation;
pub use orchestrator::{Pipeline, PipelineConfig, PipelineMode};
pub use publish::Publisher;
pub use station::{Station, StationRunner};
pub use types::{MaterializedEpisode, MergedEpisode, PublishedEpisode, RunEvent, RunReport};

use std::io;
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};

/// Open scratch file, deleted on drop.
pub(crate) fn scratch_named(dir: Option<&Path>, suffix: &str) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(crate::defaults::TEMP_PREFIX).suffix(suffix);
    match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
}

/// Closed scratch file for a tool to overwrite, deleted on drop.
pub(crate) fn scratch_file(dir: Option<&Path>, suffix: &str) -> io::Result<TempPath> {
    scratch_named(dir, suffix).map(NamedTempFile::into_temp_path)
}
