//! Polls feed sources per tag, reports each article once per tag, and keeps
//! a SQLite record of what has already been reported.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod models;

pub use app::App;
pub use config::{Config, SourceConfig};
pub use db::SeenStore;
pub use error::{AppError, Result};
pub use feed::{FeedSource, FetchPipeline, FetchResult, HttpFeedSource};
