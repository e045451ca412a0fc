//! Duration probing through ffprobe.

use crate::error::{BookcastError, Result};
use crate::exec::{CommandExecutor, path_arg};
use crate::planner::AudioFile;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Reads the total playtime of a file with `ffprobe`.
#[derive(Clone)]
pub struct DurationProbe {
    executor: Arc<dyn CommandExecutor>,
    ffprobe: String,
}

impl DurationProbe {
    pub fn new(executor: Arc<dyn CommandExecutor>, ffprobe: impl Into<String>) -> Self {
        Self {
            executor,
            ffprobe: ffprobe.into(),
        }
    }

    /// Probes `path` unconditionally.
    pub fn probe(&self, path: &Path) -> Result<Duration> {
        let output = self.executor.execute(
            &self.ffprobe,
            &[
                "-i",
                path_arg(path)?,
                "-show_entries",
                "format=duration",
                "-v",
                "quiet",
                "-of",
                "csv",
            ],
        )?;
        parse_duration_output(&output.stdout)
    }

    /// Duration of `file`, probing only the first time.
    pub fn duration_of(&self, file: &AudioFile) -> Result<Duration> {
        if let Some(duration) = file.duration() {
            return Ok(duration);
        }
        let duration = self.probe(file.path())?;
        Ok(file.record_duration(duration))
    }
}

/// Parses ffprobe's `format,<seconds>.<fraction>` CSV line.
pub fn parse_duration_output(output: &str) -> Result<Duration> {
    let field = output
        .lines()
        .find_map(|line| line.split_once(','))
        .map(|(_, value)| value.split(',').next().unwrap_or(value).trim())
        .ok_or_else(|| parse_error(format!("missing duration field in {:?}", output.trim())))?;

    let (whole, fraction) = field.split_once('.').unwrap_or((field, ""));

    let seconds: u64 = whole
        .parse()
        .map_err(|_| parse_error(format!("non-numeric duration {:?}", field)))?;

    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(parse_error(format!("non-numeric duration {:?}", field)));
    }
    // Keep nanosecond precision; extra digits are truncated.
    let digits: String = fraction.chars().chain("000000000".chars()).take(9).collect();
    let nanos: u32 = digits
        .parse()
        .map_err(|_| parse_error(format!("non-numeric duration {:?}", field)))?;

    Ok(Duration::new(seconds, nanos))
}

fn parse_error(message: String) -> BookcastError {
    BookcastError::Parse {
        tool: "ffprobe".to_string(),
        message,
    }
}
