//! Data types shared by the analysis adapters, the planner and the pipeline.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// One source recording.
///
/// The duration is filled in once by the probe and never changes afterwards.
#[derive(Debug, Default)]
pub struct AudioFile {
    path: PathBuf,
    duration: OnceLock<Duration>,
}

impl AudioFile {
    /// Creates a file whose duration is not known yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration: OnceLock::new(),
        }
    }

    /// Creates a file with an already known duration.
    pub fn with_duration(path: impl Into<PathBuf>, duration: Duration) -> Self {
        let file = Self::new(path);
        file.record_duration(duration);
        file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Probed duration, if any.
    pub fn duration(&self) -> Option<Duration> {
        self.duration.get().copied()
    }

    /// Stores the probed duration. The first recorded value wins.
    pub fn record_duration(&self, duration: Duration) -> Duration {
        *self.duration.get_or_init(|| duration)
    }
}

/// A quiet stretch inside one file, as reported by the silence detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceInterval {
    pub start: Duration,
    pub end: Duration,
    pub duration: Duration,
}

impl SilenceInterval {
    pub fn new(start: Duration, end: Duration, duration: Duration) -> Self {
        Self {
            start,
            end,
            duration,
        }
    }

    /// Middle of the gap, the preferred cut point.
    pub fn midpoint(&self) -> Duration {
        self.start + self.duration / 2
    }
}

/// A file together with everything the planner needs to know about it.
#[derive(Debug, Clone)]
pub struct AnalyzedFile {
    pub file: Arc<AudioFile>,
    pub duration: Duration,
    /// Ordered by start. Empty when silence detection is disabled.
    pub silences: Vec<SilenceInterval>,
}

impl AnalyzedFile {
    pub fn new(file: Arc<AudioFile>, duration: Duration, silences: Vec<SilenceInterval>) -> Self {
        Self {
            file,
            duration,
            silences,
        }
    }
}

/// Half-open interval `[from, to)` of one source file.
#[derive(Debug, Clone)]
pub struct SplitRange {
    pub source: Arc<AudioFile>,
    pub from: Duration,
    pub to: Duration,
}

impl SplitRange {
    pub fn new(source: Arc<AudioFile>, from: Duration, to: Duration) -> Self {
        Self { source, from, to }
    }

    pub fn len(&self) -> Duration {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.to <= self.from
    }

    /// True when `next` continues this range in the same file without a gap.
    pub fn is_continued_by(&self, next: &SplitRange) -> bool {
        Arc::ptr_eq(&self.source, &next.source) && self.to == next.from
    }
}

impl PartialEq for SplitRange {
    fn eq(&self, other: &Self) -> bool {
        self.source.path() == other.source.path() && self.from == other.from && self.to == other.to
    }
}

/// The ranges whose concatenation forms one output episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodePlan {
    /// 1-based, strictly increasing in emission order.
    pub position: usize,
    pub ranges: Vec<SplitRange>,
}

impl EpisodePlan {
    pub fn new(position: usize, ranges: Vec<SplitRange>) -> Self {
        Self { position, ranges }
    }

    /// Sum of all range lengths.
    pub fn total(&self) -> Duration {
        self.ranges.iter().map(SplitRange::len).sum()
    }

    /// Appends ranges, joining a range that directly continues the last one.
    pub fn extend(&mut self, ranges: Vec<SplitRange>) {
        for range in ranges {
            match self.ranges.last_mut() {
                Some(last) if last.is_continued_by(&range) => last.to = range.to,
                _ => self.ranges.push(range),
            }
        }
    }
}
