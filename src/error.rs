use thiserror::Error;

use crate::feed::FeedSourceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to fetch feed {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: FeedSourceError,
    },

    #[error("storage error: {0}")]
    Storage(#[from] tokio_rusqlite::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no feed source configured for tag '{0}'")]
    UnknownTag(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
