//! Episode planning.
//!
//! Turns the ordered, analyzed source files into a lazy sequence of
//! `EpisodePlan`s. The planner is strictly sequential: its debt and cursor
//! state depend on every file before the current one.

pub mod segmenter;
pub mod snap;
pub mod types;

pub use segmenter::{FinalEpisode, PlannerConfig, SegmentPlanner, plan_episodes};
pub use snap::{SnapWindow, aligned_cut, snap};
pub use types::{AnalyzedFile, AudioFile, EpisodePlan, SilenceInterval, SplitRange};
