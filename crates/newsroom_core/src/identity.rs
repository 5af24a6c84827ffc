use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::FeedEntry;

const FINGERPRINT_HEX_LEN: usize = 24;

/// Stable identity of a feed entry across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash of the entry link, falling back to its title, then to the feed URL.
    pub fn of(entry: &FeedEntry, feed_url: &str) -> Self {
        let basis = [entry.link.trim(), entry.title.trim(), feed_url.trim()]
            .into_iter()
            .find(|candidate| !candidate.is_empty())
            .unwrap_or_default();
        Self(short_hash(basis, FINGERPRINT_HEX_LEN))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First `hex_len` lowercase hex characters of SHA-256(`input`).
pub fn short_hash(input: &str, hex_len: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex.truncate(hex_len.min(hex.len()));
    hex
}
