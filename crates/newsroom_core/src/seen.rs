use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{clean_text, FeedEntry, Fingerprint};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    pub link: String,
    pub title: String,
    pub slug: String,
    /// Unix seconds at which the entry finished publishing.
    pub ts: i64,
}

/// Every entry whose documents were all written successfully.
///
/// Append-only: records are inserted or overwritten, never pruned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeenStore {
    #[serde(default)]
    seen: BTreeMap<Fingerprint, SeenRecord>,
}

impl SeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains_key(fingerprint)
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&SeenRecord> {
        self.seen.get(fingerprint)
    }

    pub fn insert(&mut self, fingerprint: Fingerprint, record: SeenRecord) {
        self.seen.insert(fingerprint, record);
    }

    pub fn records(&self) -> impl Iterator<Item = (&Fingerprint, &SeenRecord)> {
        self.seen.iter()
    }
}

/// Seen/unseen decisions over a store owned by someone else.
pub struct Deduplicator<'a> {
    store: &'a mut SeenStore,
    feed_url: String,
}

impl<'a> Deduplicator<'a> {
    pub fn new(store: &'a mut SeenStore) -> Self {
        Self {
            store,
            feed_url: String::new(),
        }
    }

    /// Sets the feed whose URL backs the fingerprint of link- and title-less entries.
    pub fn set_feed(&mut self, feed_url: &str) {
        self.feed_url = feed_url.to_string();
    }

    pub fn fingerprint(&self, entry: &FeedEntry) -> Fingerprint {
        Fingerprint::of(entry, &self.feed_url)
    }

    pub fn is_new(&self, entry: &FeedEntry) -> bool {
        !self.store.contains(&self.fingerprint(entry))
    }

    /// Records a fully published entry. Call only after every language's
    /// document has been written.
    pub fn mark_seen(&mut self, entry: &FeedEntry, slug: &str, ts: i64) -> Fingerprint {
        let fingerprint = self.fingerprint(entry);
        self.store.insert(
            fingerprint.clone(),
            SeenRecord {
                link: entry.link.trim().to_string(),
                title: clean_text(&entry.title),
                slug: slug.to_string(),
                ts,
            },
        );
        fingerprint
    }
}
