use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::config::Config;
use crate::db::SeenStore;
use crate::error::{AppError, Result};
use crate::feed::{FeedSource, FetchPipeline, HttpFeedSource};
use crate::models::{
    ArticleView, CheckReport, ClearReport, SeenArticle, SourceListing, SourceView,
};

/// Max tags fetched at once by `check_all`.
const MAX_CONCURRENT_CHECKS: usize = 4;

/// Caller side of the pipeline: resolves tags, fetches, then saves.
pub struct App<S = HttpFeedSource> {
    config: Config,
    pipeline: FetchPipeline<S>,
}

impl App<HttpFeedSource> {
    pub async fn new(config: Config) -> Result<Self> {
        let store = SeenStore::open(&config.db_path).await?;
        let source = HttpFeedSource::new(config.request_timeout())
            .map_err(|e| AppError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_parts(config, source, store))
    }
}

impl<S: FeedSource> App<S> {
    pub fn with_parts(config: Config, source: S, store: SeenStore) -> Self {
        Self {
            config,
            pipeline: FetchPipeline::new(source, store),
        }
    }

    pub fn store(&self) -> &SeenStore {
        self.pipeline.store()
    }

    /// Fetch unseen articles for `tag` and, unless `dry_run`, mark them seen.
    ///
    /// Fetch and save are separate steps; if the process dies in between, the
    /// next check reports the same batch again.
    pub async fn check(&self, tag: &str, dry_run: bool) -> Result<CheckReport> {
        let source = self
            .config
            .source(tag)
            .ok_or_else(|| AppError::UnknownTag(tag.to_string()))?;

        let result = self.pipeline.fetch(tag, &source.url).await?;

        let saved_count = if dry_run {
            0
        } else {
            self.store().save(&result.candidates, tag).await?
        };

        Ok(CheckReport {
            tag: tag.to_string(),
            source_name: source.name.clone(),
            feed_title: result.feed_title,
            feed_url: source.url.clone(),
            check_time: Utc::now(),
            new_count: result.candidates.len(),
            saved_count,
            articles: result.candidates.iter().map(ArticleView::from).collect(),
            error: None,
        })
    }

    /// Check every configured tag, a few at a time. A failing tag is reported
    /// in its own entry and does not stop the others.
    pub async fn check_all(&self, dry_run: bool) -> Vec<CheckReport> {
        let mut reports: Vec<CheckReport> = stream::iter(self.config.sources.iter())
            .map(|(tag, source)| async move {
                match self.check(tag, dry_run).await {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(tag = tag.as_str(), "check failed: {}", e);
                        CheckReport::failed(tag, &source.name, &source.url, e.to_string())
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_CHECKS)
            .collect()
            .await;

        reports.sort_by(|a, b| a.tag.cmp(&b.tag));
        reports
    }

    /// `days` set: clear the most recent `days` days. Otherwise clear everything.
    pub async fn clear(&self, tag: Option<&str>, days: Option<u32>) -> Result<ClearReport> {
        let (cleared_count, message) = match days {
            Some(days) => {
                let count = self.store().clear_recent(days, tag).await?;
                let message = match tag {
                    Some(tag) => format!(
                        "cleared {count} article records from the last {days} days for tag '{tag}'"
                    ),
                    None => format!("cleared {count} article records from the last {days} days"),
                };
                (count, message)
            }
            None => {
                let count = self.store().clear_all(tag).await?;
                let message = match tag {
                    Some(tag) => format!("cleared {count} article records for tag '{tag}'"),
                    None => format!("cleared all {count} article records"),
                };
                (count, message)
            }
        };

        Ok(ClearReport {
            status: "success",
            message,
            cleared_count,
            tag: tag.map(ToString::to_string),
            days,
        })
    }

    pub fn sources(&self) -> SourceListing {
        let sources: Vec<SourceView> = self
            .config
            .sources
            .iter()
            .map(|(tag, source)| SourceView {
                tag: tag.clone(),
                name: source.name.clone(),
                url: source.url.clone(),
            })
            .collect();

        SourceListing {
            count: sources.len(),
            sources,
        }
    }

    pub async fn seen(&self, tag: &str) -> Result<Vec<SeenArticle>> {
        self.store().list(tag).await
    }
}
