use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const APP_DIR: &str = "rss-notice";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Feed sources keyed by tag.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
}

fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("rss_notice.db")
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout(),
            sources: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing file at the default location is created with defaults; a
    /// missing explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    let config = Config::default();
                    config.save(&default_path)?;
                    config
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        for (tag, source) in &self.sources {
            if tag.trim().is_empty() {
                return Err(AppError::Config("source tag must not be empty".to_string()));
            }
            if source.url.trim().is_empty() {
                return Err(AppError::Config(format!("source '{tag}' has no url")));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn source(&self, tag: &str) -> Option<&SourceConfig> {
        self.sources.get(tag)
    }

    pub fn feed_url(&self, tag: &str) -> Option<&str> {
        self.source(tag).map(|s| s.url.as_str())
    }

    pub fn display_name(&self, tag: &str) -> Option<&str> {
        self.source(tag).map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
db_path = "/tmp/rss-notice/test.db"
log_level = "debug"

[sources.touzi]
name = "Investing Daily"
url = "https://example.com/touzi.xml"

[sources.tech]
name = "Tech Notes"
url = "https://example.com/tech.xml"
"#;

    #[test]
    fn parses_sources_by_tag() {
        let config = Config::from_toml(SAMPLE).unwrap();

        assert_eq!(config.db_path, "/tmp/rss-notice/test.db");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.feed_url("touzi"), Some("https://example.com/touzi.xml"));
        assert_eq!(config.display_name("tech"), Some("Tech Notes"));
        assert!(config.source("missing").is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();

        assert_eq!(config.log_level, "info");
        assert!(config.sources.is_empty());
        assert!(config.db_path.ends_with("rss_notice.db"));
    }

    #[test]
    fn blank_url_fails_validation() {
        let config = Config::from_toml(
            r#"
[sources.bad]
name = "Bad"
url = "  "
"#,
        )
        .unwrap();

        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn save_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        let config = Config::from_toml(SAMPLE).unwrap();

        config.save(&path).unwrap();
        let reloaded = Config::from_file(&path).unwrap();

        assert_eq!(reloaded.sources, config.sources);
    }
}
