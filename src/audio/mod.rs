//! Adapters around the source recordings: enumeration, probing, silence
//! detection and tag reading. All tool invocations go through
//! [`CommandExecutor`](crate::exec::CommandExecutor).

pub mod analysis;
pub mod files;
pub mod probe;
pub mod silence;
pub mod tags;

pub use analysis::{Analyzer, OrderedAnalysis};
pub use files::{AudioFiles, list_audio_files};
pub use probe::{DurationProbe, parse_duration_output};
pub use silence::{SilenceConfig, SilenceDetector, parse_silence_log};
pub use tags::{BookTags, parse_ffmetadata, read_tags};
