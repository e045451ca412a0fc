//! Book identity: id, title and author as they appear in the feed.

use crate::audio::BookTags;
use crate::defaults;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// Read-only book metadata shared by the compress stage and the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookMeta {
    /// Short name used for the output directory and file names.
    pub id: String,
    pub title: String,
    pub author: String,
}

/// Values given on the command line; they win over tags and defaults.
#[derive(Debug, Clone, Default)]
pub struct BookOverrides {
    pub id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
}

impl BookMeta {
    /// Resolves the metadata for the book in `src`.
    ///
    /// Precedence is overrides, then tags read from the first file, then
    /// placeholders. The id defaults to a slug of the directory name.
    pub fn resolve(src: &Path, overrides: BookOverrides, tags: BookTags) -> Self {
        let id = overrides
            .id
            .filter(|id| !id.trim().is_empty())
            .map(|id| slugify(&id))
            .unwrap_or_else(|| {
                let name = src
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                slugify(&name)
            });

        let title = overrides.title.or(tags.title).unwrap_or_else(|| {
            warn!("no title given or tagged, using {:?}", defaults::BOOK_TITLE);
            defaults::BOOK_TITLE.to_string()
        });
        let author = overrides.author.or(tags.author).unwrap_or_else(|| {
            warn!("no author given or tagged, using {:?}", defaults::BOOK_AUTHOR);
            defaults::BOOK_AUTHOR.to_string()
        });

        Self { id, title, author }
    }

    /// File name of the published episode at `position`.
    pub fn episode_file_name(&self, position: usize) -> String {
        format!("{}-{:04}.mp3", self.id, position)
    }
}

/// Lowercase ASCII slug: runs of anything else become a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("book");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Moby Dick"), "moby-dick");
        assert_eq!(slugify("  The  Hobbit (1937) "), "the-hobbit-1937");
        assert_eq!(slugify("already-slugged"), "already-slugged");
        assert_eq!(slugify("Война и мир"), "book");
        assert_eq!(slugify(""), "book");
    }

    #[test]
    fn test_resolve_prefers_overrides() {
        let meta = BookMeta::resolve(
            Path::new("/books/Moby Dick"),
            BookOverrides {
                id: Some("whale".to_string()),
                title: Some("The Whale".to_string()),
                author: Some("Melville".to_string()),
            },
            BookTags {
                title: Some("Tagged".to_string()),
                author: Some("Tagged Author".to_string()),
            },
        );
        assert_eq!(meta.id, "whale");
        assert_eq!(meta.title, "The Whale");
        assert_eq!(meta.author, "Melville");
    }

    #[test]
    fn test_resolve_falls_back_to_tags_then_placeholders() {
        let meta = BookMeta::resolve(
            Path::new("/books/Moby Dick"),
            BookOverrides::default(),
            BookTags {
                title: Some("Moby-Dick; or, The Whale".to_string()),
                author: None,
            },
        );
        assert_eq!(meta.id, "moby-dick");
        assert_eq!(meta.title, "Moby-Dick; or, The Whale");
        assert_eq!(meta.author, defaults::BOOK_AUTHOR);
    }

    #[test]
    fn test_blank_id_override_is_ignored() {
        let meta = BookMeta::resolve(
            Path::new("/books/Dune"),
            BookOverrides {
                id: Some("  ".to_string()),
                ..Default::default()
            },
            BookTags::default(),
        );
        assert_eq!(meta.id, "dune");
        assert_eq!(meta.title, defaults::BOOK_TITLE);
    }

    #[test]
    fn test_episode_file_name_is_zero_padded() {
        let meta = BookMeta {
            id: "dune".to_string(),
            title: String::new(),
            author: String::new(),
        };
        assert_eq!(meta.episode_file_name(7), "dune-0007.mp3");
        assert_eq!(meta.episode_file_name(12345), "dune-12345.mp3");
    }
}
