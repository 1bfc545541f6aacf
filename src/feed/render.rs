use chrono::{DateTime, Utc};

pub const UNTITLED: &str = "Untitled";
pub const UNKNOWN_FEED: &str = "Unknown feed";
const UNKNOWN_TIME: &str = "unknown";

/// Markdown notice announcing one article.
pub fn render_notice(
    title: &str,
    link: &str,
    published: Option<DateTime<Utc>>,
    source_name: &str,
) -> String {
    let title = non_blank(title).unwrap_or(UNTITLED);
    let source_name = non_blank(source_name).unwrap_or(UNKNOWN_FEED);
    let published = published
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| UNKNOWN_TIME.to_string());

    format!(
        "📰 {source_name} has a new post\n\
         \n\
         ### {title}\n\
         \n\
         📅 Published: {published}\n\
         🔗 Link: {link}\n\
         \n\
         ---\n"
    )
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
