//! Book title and author from the source files' metadata.

use crate::error::Result;
use crate::exec::{CommandExecutor, path_arg};
use std::path::Path;

/// Tags relevant to the feed, as found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookTags {
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Dumps the global metadata of `path` and extracts album and artist.
pub fn read_tags(executor: &dyn CommandExecutor, ffmpeg: &str, path: &Path) -> Result<BookTags> {
    let output = executor.execute(
        ffmpeg,
        &["-v", "quiet", "-i", path_arg(path)?, "-f", "ffmetadata", "-"],
    )?;
    Ok(parse_ffmetadata(&output.stdout))
}

/// Parses an `;FFMETADATA1` dump. Only the global section is considered.
pub fn parse_ffmetadata(text: &str) -> BookTags {
    let mut tags = BookTags::default();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with('[') {
            // Stream and chapter sections follow the globals.
            break;
        }
        if line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = unescape(value).trim().to_string();
        if value.is_empty() {
            continue;
        }
        match key.trim().to_ascii_lowercase().as_str() {
            "album" => tags.title = Some(value),
            "artist" => tags.author = Some(value),
            _ => {}
        }
    }

    tags
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
