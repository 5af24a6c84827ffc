use serde::{Deserialize, Serialize};

use crate::Taxonomy;

/// One configured feed, read-only for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedDescriptor {
    pub url: String,
    pub country: Option<String>,
    pub team: Option<String>,
    pub tags: Vec<String>,
}

impl FeedDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Top-level feed configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub sources: Vec<FeedDescriptor>,
    pub taxonomy: Taxonomy,
}

/// A single parsed entry. Lives only for one pipeline iteration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub link: String,
    pub title: String,
    pub summary: String,
    /// Rich HTML body (`content:encoded` / Atom `content`), preferred over `summary`.
    pub content: Option<String>,
    /// Raw date string as found in the feed.
    pub published: Option<String>,
    pub enclosures: Vec<String>,
    pub media: Vec<String>,
    pub categories: Vec<String>,
}

impl FeedEntry {
    /// HTML the text extractor should read: rich content first, then summary.
    pub fn body_html(&self) -> &str {
        self.content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.summary)
    }
}
