//! Extended M3U playlist of the published episodes.

use crate::pipeline::PublishedEpisode;

/// `#EXTM3U`, a blank line, then one file name per line.
///
/// Names are relative to the book directory the playlist is written to.
pub fn render(episodes: &[PublishedEpisode]) -> String {
    let mut playlist = String::from("#EXTM3U\n\n");
    for episode in episodes {
        playlist.push_str(&episode.file_name);
        playlist.push('\n');
    }
    playlist
}
