//! Default configuration constants for bookcast.
//!
//! Shared between the config file defaults, the CLI and the library entry
//! points so that all of them agree on what an unconfigured run does.

/// Target episode length in seconds.
///
/// Ten minutes keeps episodes short enough for a commute while not flooding
/// the feed with hundreds of items for a typical book.
pub const EPISODE_LENGTH_SECS: u64 = 600;

/// File extension (without the dot) of the source recordings.
pub const AUDIO_EXTENSION: &str = "mp3";

/// Noise floor in dB below which audio counts as silence.
pub const NOISE_FLOOR_DB: f64 = -30.0;

/// Minimum silence length in seconds reported by the silence detector.
pub const MIN_SILENCE_SECS: f64 = 0.5;

/// Lower bound of the snap window in seconds.
///
/// Silences starting closer than this to the nominal cut are ignored.
pub const MIN_TOLERANCE_SECS: f64 = 0.1;

/// Upper bound of the snap window in seconds.
pub const MAX_TOLERANCE_SECS: f64 = 5.0;

/// LAME VBR quality passed as `-qscale:a` (0 = best, 9 = smallest).
pub const ENCODE_QUALITY: u8 = 9;

/// Bounded channel capacity between pipeline stations.
pub const CHANNEL_BUFFER: usize = 2;

/// Executable used for extraction, concatenation and encoding.
pub const FFMPEG: &str = "ffmpeg";

/// Executable used for duration probing.
pub const FFPROBE: &str = "ffprobe";

/// Prefix of every temporary file the pipeline creates.
pub const TEMP_PREFIX: &str = "bookcast_";

/// Title used when neither the CLI nor the first file provide one.
pub const BOOK_TITLE: &str = "< Title >";

/// Author used when neither the CLI nor the first file provide one.
pub const BOOK_AUTHOR: &str = "< Book Author >";

/// Base URL episodes are published under.
pub const FEED_BASE_URL: &str = "http://localhost:8000/";

/// Domain used in `tag:` GUIDs.
pub const FEED_DOMAIN: &str = "localhost";

/// Feed language code.
pub const FEED_LANGUAGE: &str = "en";

/// Channel description.
pub const FEED_DESCRIPTION: &str = "Audiobook as a podcast";

/// Number of worker threads for the pool pipeline.
///
/// Workers spend most of their time waiting on ffmpeg, so twice the core
/// count keeps every core busy.
pub fn pool_workers() -> usize {
    num_cpus::get() * 2
}

/// Number of threads probing files ahead of the planner.
pub fn analysis_workers() -> usize {
    num_cpus::get()
}
