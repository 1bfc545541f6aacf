use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ArticleRecord;

/// JSON body printed by `check`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub tag: String,
    pub source_name: String,
    pub feed_title: String,
    pub feed_url: String,
    pub check_time: DateTime<Utc>,
    pub new_count: usize,
    pub saved_count: usize,
    pub articles: Vec<ArticleView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckReport {
    pub fn failed(tag: &str, source_name: &str, feed_url: &str, error: String) -> Self {
        Self {
            tag: tag.to_string(),
            source_name: source_name.to_string(),
            feed_title: String::new(),
            feed_url: feed_url.to_string(),
            check_time: Utc::now(),
            new_count: 0,
            saved_count: 0,
            articles: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub id: String,
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub markdown: String,
}

impl From<&ArticleRecord> for ArticleView {
    fn from(record: &ArticleRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            link: record.link.clone(),
            published: record.published,
            author: record.author.clone(),
            markdown: record.markdown.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearReport {
    pub status: &'static str,
    pub message: String,
    pub cleared_count: usize,
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceListing {
    pub count: usize,
    pub sources: Vec<SourceView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceView {
    pub tag: String,
    pub name: String,
    pub url: String,
}
