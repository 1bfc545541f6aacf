use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::models::RawEntry;

const USER_AGENT: &str = concat!("rss-notice/", env!("CARGO_PKG_VERSION"));

/// Feed as produced by a [`FeedSource`].
///
/// `warning` carries a soft malformed-feed signal: the document parsed, but
/// something about it looked off. Callers keep going with the entries.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<RawEntry>,
    pub warning: Option<String>,
}

#[derive(Debug, Error)]
pub enum FeedSourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    HttpStatus(u16),
    #[error("could not read feed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("feed parse error: {0}")]
    Parse(#[from] parser::ParseFeedError),
    #[error("unsupported feed location: {0}")]
    UnsupportedLocation(String),
}

/// Turns a feed location into a title and an ordered list of raw entries.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn parse(&self, url: &str) -> Result<ParsedFeed, FeedSourceError>;
}

/// Production source: `http(s)://` through reqwest, `file://` URLs and plain
/// paths from disk, documents parsed with feed-rs.
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration) -> Result<Self, FeedSourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, Option<String>), FeedSourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedSourceError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), content_type))
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn parse(&self, url: &str) -> Result<ParsedFeed, FeedSourceError> {
        let (bytes, content_type) = match Location::resolve(url)? {
            Location::Remote(url) => self.download(url.as_str()).await?,
            Location::File(path) => (tokio::fs::read(&path).await?, None),
        };

        let mut parsed = parse_document(&bytes)?;
        if parsed.warning.is_none() {
            parsed.warning = content_type
                .filter(|ct| !looks_like_feed(ct))
                .map(|ct| format!("unexpected content type '{ct}'"));
        }
        Ok(parsed)
    }
}

enum Location {
    Remote(Url),
    File(PathBuf),
}

impl Location {
    fn resolve(raw: &str) -> Result<Self, FeedSourceError> {
        match Url::parse(raw) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Location::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(Location::File)
                    .map_err(|_| FeedSourceError::UnsupportedLocation(raw.to_string())),
                _ => Err(FeedSourceError::UnsupportedLocation(raw.to_string())),
            },
            // Not a URL at all; treat it as a local path.
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Location::File(PathBuf::from(raw))),
            Err(_) => Err(FeedSourceError::UnsupportedLocation(raw.to_string())),
        }
    }
}

/// Parse an RSS/Atom/JSON feed document.
pub fn parse_document(bytes: &[u8]) -> Result<ParsedFeed, FeedSourceError> {
    let feed = parser::parse(bytes)?;

    let title = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty());
    let warning = title
        .is_none()
        .then(|| "feed has no title".to_string());
    let entries = feed.entries.into_iter().map(raw_entry).collect();

    Ok(ParsedFeed {
        title,
        entries,
        warning,
    })
}

fn raw_entry(entry: Entry) -> RawEntry {
    RawEntry {
        link: permalink(&entry),
        title: entry.title.map(|t| t.content),
        author: entry.authors.first().map(|a| a.name.clone()),
        published: entry.published.or(entry.updated),
    }
}

/// The entry's `alternate` link, else its first link, else an http(s) id
/// (RSS `<guid isPermaLink="true">` items often carry no `<link>`).
fn permalink(entry: &Entry) -> Option<String> {
    let alternate = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"));
    if let Some(link) = alternate.or_else(|| entry.links.first()) {
        return Some(link.href.clone());
    }

    Url::parse(entry.id.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|_| entry.id.trim().to_string())
}

fn looks_like_feed(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ["xml", "rss", "atom", "json"].iter().any(|k| ct.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <link>https://example.com/</link>
    <description>Example</description>
    <item>
      <title>First</title>
      <link>https://example.com/first</link>
      <author>alice@example.com (Alice)</author>
      <pubDate>Tue, 24 Feb 2026 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>No link here</title>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_entries_in_document_order() {
        let parsed = parse_document(RSS.as_bytes()).expect("fixture must parse");

        assert_eq!(parsed.title.as_deref(), Some("Example Feed"));
        assert!(parsed.warning.is_none());
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(
            parsed.entries[0].link.as_deref(),
            Some("https://example.com/first")
        );
        assert_eq!(parsed.entries[0].title.as_deref(), Some("First"));
        assert!(parsed.entries[0].published.is_some());
        assert_eq!(parsed.entries[1].link, None);
    }

    #[test]
    fn untitled_feed_is_a_soft_warning() {
        let doc = r#"<rss version="2.0"><channel><item><link>https://example.com/a</link></item></channel></rss>"#;
        let parsed = parse_document(doc.as_bytes()).expect("must parse");

        assert!(parsed.title.is_none());
        assert!(parsed.warning.is_some());
        assert_eq!(parsed.entries.len(), 1);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let result = parse_document(b"this is not a feed");
        assert!(matches!(result, Err(FeedSourceError::Parse(_))));
    }

    #[test]
    fn resolves_locations() {
        assert!(matches!(
            Location::resolve("https://example.com/feed.xml"),
            Ok(Location::Remote(_))
        ));
        assert!(matches!(
            Location::resolve("feeds/local.xml"),
            Ok(Location::File(_))
        ));
        assert!(matches!(
            Location::resolve("ftp://example.com/feed.xml"),
            Err(FeedSourceError::UnsupportedLocation(_))
        ));
    }

    #[test]
    fn prefers_alternate_link_over_other_rels() {
        let doc = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Blogger Style</title>
  <id>tag:b.example.com,2026:blog-1</id>
  <updated>2026-02-24T10:00:00Z</updated>
  <entry>
    <id>tag:b.example.com,2026:post-1</id>
    <title>Post one</title>
    <updated>2026-02-24T10:00:00Z</updated>
    <link rel="replies" type="application/atom+xml" href="https://b.example.com/feeds/1/comments"/>
    <link rel="self" type="application/atom+xml" href="https://b.example.com/feeds/posts/1"/>
    <link rel="alternate" type="text/html" href="https://b.example.com/2026/02/post-one.html"/>
  </entry>
  <entry>
    <id>tag:b.example.com,2026:post-2</id>
    <title>Only an edit link</title>
    <updated>2026-02-24T10:00:00Z</updated>
    <link rel="edit" href="https://b.example.com/feeds/posts/2"/>
  </entry>
</feed>"#;
        let parsed = parse_document(doc.as_bytes()).expect("atom must parse");

        assert_eq!(
            parsed.entries[0].link.as_deref(),
            Some("https://b.example.com/2026/02/post-one.html")
        );
        assert_eq!(
            parsed.entries[1].link.as_deref(),
            Some("https://b.example.com/feeds/posts/2")
        );
    }

    #[test]
    fn permalink_guid_stands_in_for_missing_link() {
        let doc = r#"<rss version="2.0"><channel><title>Guids</title>
<item><title>G</title><guid isPermaLink="true">https://example.com/g1</guid></item>
<item><title>Opaque</title><guid isPermaLink="false">urn:uuid:1234</guid></item>
</channel></rss>"#;
        let parsed = parse_document(doc.as_bytes()).expect("must parse");

        assert_eq!(parsed.entries[0].link.as_deref(), Some("https://example.com/g1"));
        assert_eq!(parsed.entries[1].link, None);
    }

    #[test]
    fn content_type_sniffing() {
        assert!(looks_like_feed("application/rss+xml; charset=utf-8"));
        assert!(looks_like_feed("text/xml"));
        assert!(!looks_like_feed("text/html"));
    }

    #[tokio::test]
    async fn reads_feed_from_file_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feed.xml");
        std::fs::write(&path, RSS).expect("write fixture");

        let source = HttpFeedSource::new(Duration::from_secs(5)).expect("client");
        let parsed = source
            .parse(path.to_str().expect("utf-8 path"))
            .await
            .expect("file feed must parse");

        assert_eq!(parsed.entries.len(), 2);
    }
}
