//! Episode segmentation: packs an ordered stream of files into episodes.
//!
//! The planner walks the files in enumeration order and carries a duration
//! "debt" across file boundaries: when a file ends before the open episode is
//! full, the next file pays the remainder first. Cut points inside a file can
//! optionally be moved into nearby silence.

use crate::error::Result;
use crate::planner::snap::{SnapWindow, aligned_cut};
use crate::planner::types::{AnalyzedFile, AudioFile, EpisodePlan, SplitRange};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What to do with the last, usually shorter, episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalEpisode {
    /// Publish it as an episode of its own.
    #[default]
    Standalone,
    /// Append its ranges to the episode before it.
    MergeIntoPrevious,
}

/// Planner settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Target episode length `L`.
    pub episode_length: Duration,
    /// Silence snapping window; `None` cuts at nominal points only.
    pub snap: Option<SnapWindow>,
    pub final_episode: FinalEpisode,
}

impl PlannerConfig {
    pub fn new(episode_length: Duration) -> Self {
        Self {
            episode_length,
            snap: None,
            final_episode: FinalEpisode::Standalone,
        }
    }

    pub fn with_snap(mut self, window: SnapWindow) -> Self {
        self.snap = Some(window);
        self
    }

    pub fn with_final_episode(mut self, final_episode: FinalEpisode) -> Self {
        self.final_episode = final_episode;
        self
    }
}

/// Lazy sequence of episode plans over a stream of analyzed files.
///
/// Files are pulled only when the plans produced so far have been consumed.
/// An analysis error is yielded once and ends the sequence.
pub struct SegmentPlanner<I> {
    files: I,
    config: PlannerConfig,
    /// Duration still owed to the open episode; always in `[0, L)`.
    debt: Duration,
    /// Ranges of the episode being filled.
    open: Vec<SplitRange>,
    /// Closed plans waiting to be yielded.
    ready: VecDeque<EpisodePlan>,
    /// Last closed plan, held back while the final episode may still merge into it.
    held: Option<EpisodePlan>,
    next_position: usize,
    finished: bool,
}

impl<I> SegmentPlanner<I>
where
    I: Iterator<Item = Result<AnalyzedFile>>,
{
    pub fn new(files: I, config: PlannerConfig) -> Self {
        Self {
            files,
            config,
            debt: Duration::ZERO,
            open: Vec::new(),
            ready: VecDeque::new(),
            held: None,
            next_position: 1,
            finished: false,
        }
    }

    /// Current debt. Exposed for diagnostics and tests.
    pub fn debt(&self) -> Duration {
        self.debt
    }

    fn consume(&mut self, analyzed: &AnalyzedFile) {
        let length = self.config.episode_length;
        let duration = analyzed.duration;
        let file = &analyzed.file;
        let mut cursor = Duration::ZERO;

        if !self.debt.is_zero() {
            if self.debt <= duration {
                let cut = self.cut_point(analyzed, Duration::ZERO, self.debt);
                self.push_range(file, Duration::ZERO, cut);
                self.close_episode();
                cursor = cut;
                self.debt = Duration::ZERO;
            } else {
                self.push_range(file, Duration::ZERO, duration);
                self.debt -= duration;
                return;
            }
        }

        while cursor + length < duration {
            let cut = self.cut_point(analyzed, cursor, cursor + length);
            self.push_range(file, cursor, cut);
            self.close_episode();
            cursor = cut;
        }

        self.push_range(file, cursor, duration);
        let filled = duration - cursor;
        if filled >= length {
            self.close_episode();
            self.debt = Duration::ZERO;
        } else if self.open.is_empty() {
            self.debt = Duration::ZERO;
        } else {
            self.debt = length - filled;
        }
    }

    /// Cut for `nominal`, kept strictly after `lower` and inside the file.
    fn cut_point(&self, analyzed: &AnalyzedFile, lower: Duration, nominal: Duration) -> Duration {
        let Some(window) = self.config.snap else {
            return nominal;
        };
        match aligned_cut(nominal, &analyzed.silences, window) {
            Some(cut) if cut > lower && cut <= analyzed.duration => cut,
            _ => {
                debug!(
                    file = %analyzed.file.path().display(),
                    at = nominal.as_secs_f64(),
                    "no silence near cut point, cutting unaligned"
                );
                nominal
            }
        }
    }

    fn push_range(&mut self, file: &Arc<AudioFile>, from: Duration, to: Duration) {
        if to > from {
            self.open.push(SplitRange::new(file.clone(), from, to));
        }
    }

    fn close_episode(&mut self) {
        let ranges = mem::take(&mut self.open);
        if ranges.is_empty() {
            return;
        }
        let plan = EpisodePlan::new(self.next_position, ranges);
        self.next_position += 1;

        match self.config.final_episode {
            FinalEpisode::Standalone => self.ready.push_back(plan),
            FinalEpisode::MergeIntoPrevious => {
                if let Some(previous) = self.held.replace(plan) {
                    self.ready.push_back(previous);
                }
            }
        }
    }

    fn finish(&mut self) {
        let tail = mem::take(&mut self.open);
        if !tail.is_empty() {
            match (self.config.final_episode, self.held.as_mut()) {
                (FinalEpisode::MergeIntoPrevious, Some(previous)) => previous.extend(tail),
                _ => {
                    self.open = tail;
                    self.close_episode();
                }
            }
        }
        if let Some(previous) = self.held.take() {
            self.ready.push_back(previous);
        }
        self.debt = Duration::ZERO;
        self.finished = true;
    }
}

impl<I> Iterator for SegmentPlanner<I>
where
    I: Iterator<Item = Result<AnalyzedFile>>,
{
    type Item = Result<EpisodePlan>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(plan) = self.ready.pop_front() {
                return Some(Ok(plan));
            }
            if self.finished {
                return None;
            }
            match self.files.next() {
                Some(Ok(analyzed)) => self.consume(&analyzed),
                Some(Err(e)) => {
                    self.finished = true;
                    self.open.clear();
                    self.held = None;
                    return Some(Err(e));
                }
                None => self.finish(),
            }
        }
    }
}

/// Plans a fully known set of files in one go.
pub fn plan_episodes(
    files: impl IntoIterator<Item = AnalyzedFile>,
    config: PlannerConfig,
) -> Vec<EpisodePlan> {
    SegmentPlanner::new(files.into_iter().map(Ok), config)
        .filter_map(Result::ok)
        .collect()
}
