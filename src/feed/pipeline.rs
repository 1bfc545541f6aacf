use chrono::{DateTime, Timelike, Utc};
use tracing::{debug, info, warn};

use crate::db::SeenStore;
use crate::error::{AppError, Result};
use crate::models::{ArticleRecord, RawEntry};

use super::fetcher::FeedSource;
use super::identity::generate_id;
use super::render::{render_notice, UNKNOWN_FEED, UNTITLED};

/// Unseen candidates from one feed parse.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub feed_title: String,
    pub candidates: Vec<ArticleRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingLink,
    InvalidLink(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingLink => write!(f, "entry has no link"),
            SkipReason::InvalidLink(link) => write!(f, "entry link {link:?} contains control characters"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Built(ArticleRecord),
    Skipped(SkipReason),
}

/// Fetch → identify → render → filter. Never writes to the store; saving the
/// returned candidates is up to the caller.
pub struct FetchPipeline<S> {
    source: S,
    store: SeenStore,
}

impl<S: FeedSource> FetchPipeline<S> {
    pub fn new(source: S, store: SeenStore) -> Self {
        Self { source, store }
    }

    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    pub async fn fetch(&self, tag: &str, feed_url: &str) -> Result<FetchResult> {
        info!(tag, url = feed_url, "fetching feed");

        let feed = self
            .source
            .parse(feed_url)
            .await
            .map_err(|source| AppError::FetchFailed {
                url: feed_url.to_string(),
                source,
            })?;

        if let Some(warning) = &feed.warning {
            warn!(tag, url = feed_url, "feed may be malformed: {}", warning);
        }

        let feed_title = feed.title.unwrap_or_else(|| UNKNOWN_FEED.to_string());

        let total = feed.entries.len();
        let mut built = Vec::with_capacity(total);
        for (index, entry) in feed.entries.into_iter().enumerate() {
            match build_candidate(entry, tag, &feed_title) {
                EntryOutcome::Built(record) => built.push(record),
                EntryOutcome::Skipped(reason) => {
                    warn!(tag, index, "skipping entry: {}", reason);
                }
            }
        }
        debug!(tag, parsed = built.len(), total, "built candidates");

        let mut candidates = Vec::with_capacity(built.len());
        for record in built {
            if self.store.is_seen(&record.id, tag).await? {
                continue;
            }
            candidates.push(record);
        }

        info!(tag, new = candidates.len(), "fetch complete");
        Ok(FetchResult {
            feed_title,
            candidates,
        })
    }
}

/// Validate one raw entry and turn it into a candidate.
pub fn build_candidate(entry: RawEntry, tag: &str, feed_title: &str) -> EntryOutcome {
    let link = match entry.link.as_deref().map(str::trim) {
        Some(link) if !link.is_empty() => link.to_string(),
        _ => return EntryOutcome::Skipped(SkipReason::MissingLink),
    };
    if link.chars().any(char::is_control) {
        return EntryOutcome::Skipped(SkipReason::InvalidLink(link));
    }

    let title = entry
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    let published = entry.published.map(normalize_timestamp);
    let markdown = render_notice(&title, &link, published, feed_title);

    EntryOutcome::Built(ArticleRecord {
        id: generate_id(&link),
        tag: tag.to_string(),
        title,
        link,
        published,
        author: entry.author.filter(|a| !a.trim().is_empty()),
        markdown,
    })
}

/// Whole-second precision, so re-fetches of the same entry compare equal.
fn normalize_timestamp(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(link: Option<&str>) -> RawEntry {
        RawEntry {
            link: link.map(ToString::to_string),
            title: Some("Hello".to_string()),
            author: Some("Alice".to_string()),
            published: None,
        }
    }

    #[test]
    fn builds_candidate_from_complete_entry() {
        let published = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::milliseconds(750);
        let raw = RawEntry {
            published: Some(published),
            ..entry(Some(" https://example.com/a "))
        };

        let EntryOutcome::Built(record) = build_candidate(raw, "news", "Daily") else {
            panic!("entry should build");
        };
        assert_eq!(record.link, "https://example.com/a");
        assert_eq!(record.id, generate_id("https://example.com/a"));
        assert_eq!(record.tag, "news");
        assert_eq!(
            record.published,
            Some(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(record.author.as_deref(), Some("Alice"));
        assert!(record.markdown.contains("📰 Daily has a new post"));
        assert!(record.markdown.contains("🔗 Link: https://example.com/a"));
    }

    #[test]
    fn missing_or_blank_link_is_skipped() {
        assert_eq!(
            build_candidate(entry(None), "news", "Daily"),
            EntryOutcome::Skipped(SkipReason::MissingLink)
        );
        assert_eq!(
            build_candidate(entry(Some("   ")), "news", "Daily"),
            EntryOutcome::Skipped(SkipReason::MissingLink)
        );
    }

    #[test]
    fn control_characters_in_link_are_skipped() {
        let outcome = build_candidate(entry(Some("https://example.com/a\nb")), "news", "Daily");
        assert!(matches!(
            outcome,
            EntryOutcome::Skipped(SkipReason::InvalidLink(_))
        ));
    }

    #[test]
    fn missing_title_and_time_use_placeholders() {
        let raw = RawEntry {
            link: Some("https://example.com/a".to_string()),
            ..RawEntry::default()
        };

        let EntryOutcome::Built(record) = build_candidate(raw, "news", "Daily") else {
            panic!("entry should build");
        };
        assert_eq!(record.title, "Untitled");
        assert!(record.published.is_none());
        assert!(record.markdown.contains("Published: unknown"));
    }
}
