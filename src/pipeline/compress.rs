//! Compress stage: tag and re-encode a merged episode.

use crate::audio::DurationProbe;
use crate::book::BookMeta;
use crate::error::Result;
use crate::exec::{CommandExecutor, path_arg};
use crate::pipeline::error::{FailurePolicy, StationError};
use crate::pipeline::scratch_file;
use crate::pipeline::station::Station;
use crate::pipeline::types::{MaterializedEpisode, MergedEpisode};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct CompressStation {
    executor: Arc<dyn CommandExecutor>,
    ffmpeg: String,
    probe: DurationProbe,
    book: Arc<BookMeta>,
    quality: u8,
    on_error: FailurePolicy,
    temp_dir: Option<PathBuf>,
}

impl CompressStation {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        ffmpeg: impl Into<String>,
        probe: DurationProbe,
        book: Arc<BookMeta>,
    ) -> Self {
        Self {
            executor,
            ffmpeg: ffmpeg.into(),
            probe,
            book,
            quality: crate::defaults::ENCODE_QUALITY,
            on_error: FailurePolicy::default(),
            temp_dir: None,
        }
    }

    /// LAME VBR quality, 0 (best) to 9 (smallest).
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_policy(mut self, on_error: FailurePolicy) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Encodes `merged`; the merged file is deleted once the encoder is done.
    pub fn compress(&self, merged: MergedEpisode) -> Result<MaterializedEpisode> {
        let position = merged.position;
        let output = scratch_file(self.temp_dir.as_deref(), ".mp3")?;

        let track = format!("track={}", position);
        let album = format!("album={}", self.book.title);
        let title = format!("title=Episode{:04}", position);
        let artist = format!("artist={}", self.book.author);
        let quality = self.quality.to_string();

        self.executor.execute(
            &self.ffmpeg,
            &[
                "-y",
                "-i",
                path_arg(merged.path())?,
                "-metadata",
                &track,
                "-metadata",
                &album,
                "-metadata",
                &title,
                "-metadata",
                &artist,
                "-codec:a",
                "libmp3lame",
                "-qscale:a",
                &quality,
                "-f",
                "mp3",
                path_arg(&output)?,
            ],
        )?;
        drop(merged);

        let duration = self.probe.probe(&output)?;
        let size_bytes = fs::metadata(&output)?.len();

        info!(
            position,
            duration_secs = duration.as_secs_f64(),
            size_bytes,
            "episode encoded"
        );

        Ok(MaterializedEpisode {
            position,
            file: output,
            duration,
            size_bytes,
        })
    }
}

impl Station for CompressStation {
    type Input = MergedEpisode;
    type Output = MaterializedEpisode;

    fn process(
        &mut self,
        merged: MergedEpisode,
    ) -> std::result::Result<MaterializedEpisode, StationError> {
        let position = merged.position;
        self.compress(merged)
            .map_err(|e| self.on_error.station_error(position, &e))
    }

    fn name(&self) -> &'static str {
        "Compress"
    }
}
