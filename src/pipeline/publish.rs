//! Copies finished episodes into the book's destination directory.

use crate::book::BookMeta;
use crate::error::Result;
use crate::pipeline::types::{MaterializedEpisode, PublishedEpisode};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Publisher {
    dir: PathBuf,
    book: Arc<BookMeta>,
}

impl Publisher {
    /// Publishes into `<dst>/<book id>/`, creating it if needed.
    pub fn new(dst: &Path, book: Arc<BookMeta>) -> Result<Self> {
        let dir = dst.join(&book.id);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, book })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies the episode and deletes its temp file.
    pub fn publish(&self, episode: MaterializedEpisode) -> Result<PublishedEpisode> {
        let file_name = self.book.episode_file_name(episode.position);
        let target = self.dir.join(&file_name);

        // Temp and destination may sit on different filesystems.
        fs::copy(episode.path(), &target)?;

        info!(position = episode.position, file = %target.display(), "episode published");

        Ok(PublishedEpisode {
            position: episode.position,
            title: format!("Episode {:03}", episode.position),
            file_name,
            duration: episode.duration,
            size_bytes: episode.size_bytes,
        })
    }

    /// Removes episodes an aborted run had already published.
    pub fn retract(&self, episodes: &[PublishedEpisode]) {
        for episode in episodes {
            let path = self.dir.join(&episode.file_name);
            match fs::remove_file(&path) {
                Ok(()) => info!(position = episode.position, "episode retracted"),
                Err(e) => warn!(file = %path.display(), error = %e, "could not retract episode"),
            }
        }
    }
}
