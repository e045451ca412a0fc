//! RSS 2.0 podcast feed with iTunes extensions.

use crate::book::BookMeta;
use crate::feed::FeedOptions;
use crate::pipeline::PublishedEpisode;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset};
use std::time::Duration;

const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
const RSS_DOCS: &str = "http://blogs.law.harvard.edu/tech/rss";
const IMAGE_SIZE: u32 = 1400;
const CATEGORY: &str = "Education";

/// Renders the feed document.
///
/// `now` is the build time; each item is dated `now` plus its position in
/// seconds so podcast clients keep the episodes in order.
pub fn render(
    book: &BookMeta,
    episodes: &[PublishedEpisode],
    options: &FeedOptions,
    now: DateTime<FixedOffset>,
) -> String {
    let self_link = options.self_link(book);
    let image = gravatar_url(&self_link);

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    line(
        &mut xml,
        0,
        &format!(
            "<rss version=\"2.0\" xmlns:content=\"{CONTENT_NS}\" xmlns:atom=\"{ATOM_NS}\" xmlns:itunes=\"{ITUNES_NS}\">"
        ),
    );
    xml.push_str("  <channel>\n");
    element(&mut xml, 4, "title", &book.title);
    element(&mut xml, 4, "link", &self_link);
    element(&mut xml, 4, "description", &options.description);
    xml.push_str("    <image>\n");
    element(&mut xml, 6, "title", &book.title);
    element(&mut xml, 6, "link", &self_link);
    element(&mut xml, 6, "url", &image);
    element(&mut xml, 6, "width", &IMAGE_SIZE.to_string());
    element(&mut xml, 6, "height", &IMAGE_SIZE.to_string());
    xml.push_str("    </image>\n");
    element(&mut xml, 4, "language", &options.language);
    element(&mut xml, 4, "lastBuildDate", &rfc822(now));
    element(&mut xml, 4, "docs", RSS_DOCS);
    line(
        &mut xml,
        4,
        &format!(
            "<atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>",
            escape(&self_link)
        ),
    );
    element(&mut xml, 4, "itunes:author", &book.author);
    line(&mut xml, 4, &format!("<itunes:category text=\"{CATEGORY}\"/>"));
    element(&mut xml, 4, "itunes:explicit", "no");

    for episode in episodes {
        let href = options.episode_link(book, &episode.file_name);
        let published = now + ChronoDuration::seconds(episode.position as i64);

        xml.push_str("    <item>\n");
        element(&mut xml, 6, "title", &episode.title);
        element(&mut xml, 6, "link", &href);
        element(
            &mut xml,
            6,
            "description",
            &format!("{} for {}", episode.title, book.title),
        );
        line(
            &mut xml,
            6,
            &format!(
                "<guid isPermaLink=\"false\">{}</guid>",
                escape(&guid(&options.domain, &book.id, episode.position, now))
            ),
        );
        line(
            &mut xml,
            6,
            &format!(
                "<enclosure url=\"{}\" length=\"{}\" type=\"audio/mpeg\"/>",
                escape(&href),
                episode.size_bytes
            ),
        );
        element(&mut xml, 6, "pubDate", &rfc822(published));
        element(&mut xml, 6, "itunes:duration", &clock(episode.duration));
        element(&mut xml, 6, "itunes:explicit", "no");
        xml.push_str("    </item>\n");
    }

    xml.push_str("  </channel>\n</rss>\n");
    xml
}

fn line(xml: &mut String, indent: usize, markup: &str) {
    xml.extend(std::iter::repeat_n(' ', indent));
    xml.push_str(markup);
    xml.push('\n');
}

fn element(xml: &mut String, indent: usize, name: &str, text: &str) {
    line(xml, indent, &format!("<{name}>{}</{name}>", escape(text)));
}

/// Escapes XML text and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// `tag:` URI (RFC 4151) identifying one episode.
pub fn guid(domain: &str, book_id: &str, position: usize, date: DateTime<FixedOffset>) -> String {
    format!(
        "tag:{},{}:{}{}",
        domain,
        date.format("%Y-%m-%d"),
        book_id,
        position
    )
}

/// RFC 822 date as RSS readers expect it.
pub fn rfc822(at: DateTime<FixedOffset>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

/// `HH:MM:SS`, rounded to the nearest second.
pub fn clock(duration: Duration) -> String {
    let total = (duration + Duration::from_millis(500)).as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Generated channel artwork, stable per feed URL.
pub fn gravatar_url(self_link: &str) -> String {
    let hash = md5::compute(self_link.as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{:x}?s={}&d=retro&r=g",
        hash, IMAGE_SIZE
    )
}
