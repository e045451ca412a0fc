//! Feed documents describing the published episodes.

pub mod m3u;
pub mod rss;

use crate::book::BookMeta;
use crate::error::Result;
use crate::pipeline::PublishedEpisode;
use chrono::{DateTime, FixedOffset};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the feed is served from and how it describes itself.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedOptions {
    /// URL the book directories are served under.
    pub base_url: String,
    /// Authority part of the item GUIDs.
    pub domain: String,
    pub language: String,
    pub description: String,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            base_url: crate::defaults::FEED_BASE_URL.to_string(),
            domain: crate::defaults::FEED_DOMAIN.to_string(),
            language: crate::defaults::FEED_LANGUAGE.to_string(),
            description: crate::defaults::FEED_DESCRIPTION.to_string(),
        }
    }
}

impl FeedOptions {
    fn book_url(&self, book: &BookMeta) -> String {
        format!("{}/{}/", self.base_url.trim_end_matches('/'), book.id)
    }

    /// Public URL of the RSS document itself.
    pub fn self_link(&self, book: &BookMeta) -> String {
        format!("{}{}.xml", self.book_url(book), book.id)
    }

    pub fn episode_link(&self, book: &BookMeta, file_name: &str) -> String {
        format!("{}{}", self.book_url(book), file_name)
    }
}

/// Paths of the written feed files.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedFiles {
    pub rss: PathBuf,
    pub m3u: PathBuf,
}

/// Writes `<id>.xml` and `<id>.m3u` into `dir`.
pub fn write_feeds(
    dir: &Path,
    book: &BookMeta,
    episodes: &[PublishedEpisode],
    options: &FeedOptions,
    now: DateTime<FixedOffset>,
) -> Result<FeedFiles> {
    let files = FeedFiles {
        rss: dir.join(format!("{}.xml", book.id)),
        m3u: dir.join(format!("{}.m3u", book.id)),
    };
    fs::write(&files.rss, rss::render(book, episodes, options, now))?;
    fs::write(&files.m3u, m3u::render(episodes))?;
    info!(rss = %files.rss.display(), m3u = %files.m3u.display(), "feeds written");
    Ok(files)
}
