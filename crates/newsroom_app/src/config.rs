use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::engine_info;
use newsroom_core::FeedConfig;
use thiserror::Error;

pub const DEFAULT_FEEDS_FILE: &str = "config/feeds.ron";

/// Problems with the feed list. All of them end the run before any feed is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read feed config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse feed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("feed config {0} lists no sources")]
    NoFeeds(PathBuf),
}

pub fn load_feed_config(path: &Path) -> Result<FeedConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: FeedConfig = ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.sources.retain(|feed| !feed.url.trim().is_empty());
    if config.sources.is_empty() {
        return Err(ConfigError::NoFeeds(path.to_path_buf()));
    }
    engine_info!("loaded {} feeds from {}", config.sources.len(), path.display());
    Ok(config)
}
