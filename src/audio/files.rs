//! Enumeration of the source recordings.

use crate::error::{BookcastError, Result};
use crate::planner::AudioFile;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Source files of one book, in playback order.
///
/// Finite and not restartable; enumerate again to start over.
#[derive(Debug)]
pub struct AudioFiles {
    paths: std::vec::IntoIter<PathBuf>,
}

impl AudioFiles {
    /// Number of files not yet yielded.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl Iterator for AudioFiles {
    type Item = AudioFile;

    fn next(&mut self) -> Option<Self::Item> {
        self.paths.next().map(AudioFile::new)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

/// Lists every file under `root` whose extension matches `extension`.
///
/// Subdirectories are searched recursively; symlinked directories are not
/// followed. The result is sorted by full path, which is the order the
/// planner concatenates the files in.
pub fn list_audio_files(root: &Path, extension: &str) -> Result<AudioFiles> {
    if !root.is_dir() {
        return Err(BookcastError::ConfigInvalidValue {
            key: "src".to_string(),
            message: format!("{} is not a directory", root.display()),
        });
    }

    let mut paths = Vec::new();
    collect(root, extension, &mut paths)?;
    paths.sort();

    Ok(AudioFiles {
        paths: paths.into_iter(),
    })
}

fn collect(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            collect(&path, extension, out)?;
        } else if has_extension(&path, extension) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
