mod fetcher;
mod identity;
mod pipeline;
mod render;

pub use fetcher::{parse_document, FeedSource, FeedSourceError, HttpFeedSource, ParsedFeed};
pub use identity::generate_id;
pub use pipeline::{build_candidate, EntryOutcome, FetchPipeline, FetchResult, SkipReason};
pub use render::render_notice;
