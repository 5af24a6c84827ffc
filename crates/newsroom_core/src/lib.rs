//! Newsroom core: pure identity, slug, fallback and metadata logic.
mod date;
mod entry;
mod fallback;
mod identity;
mod lang;
mod metadata;
mod seen;
mod slug;
mod stage;
mod tags;
mod text;

pub use date::{format_timestamp, parse_offset};
pub use entry::{FeedConfig, FeedDescriptor, FeedEntry};
pub use fallback::{
    attribution_line, ensure_attribution, fallback_body, strip_attribution, FALLBACK_EXCERPT_CHARS,
};
pub use identity::{short_hash, Fingerprint};
pub use lang::Language;
pub use metadata::{read_source_field, render_document, CoverDescriptor, PostMetadata};
pub use seen::{Deduplicator, SeenRecord, SeenStore};
pub use slug::{normalize_slug, SlugAllocator, MAX_SLUG_LEN};
pub use stage::EntryStage;
pub use tags::{TagSet, Taxonomy};
pub use text::{clean_text, source_name, truncate_chars};
