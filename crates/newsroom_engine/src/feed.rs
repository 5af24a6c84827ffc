use std::sync::Arc;

use newsroom_core::{FeedDescriptor, FeedEntry};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::decode::{decode_document, DecodeError};
use crate::{FetchError, Fetcher};

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("XML parse error: {0}")]
    Parse(String),
    #[error("document is neither RSS nor Atom")]
    NotAFeed,
}

/// Yields a feed's entries in document order.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn entries(&self, feed: &FeedDescriptor) -> Result<Vec<FeedEntry>, FeedError>;
}

pub struct HttpFeedSource {
    fetcher: Arc<dyn Fetcher>,
}

impl HttpFeedSource {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl FeedSource for HttpFeedSource {
    async fn entries(&self, feed: &FeedDescriptor) -> Result<Vec<FeedEntry>, FeedError> {
        let output = self.fetcher.fetch(&feed.url).await?;
        let decoded = decode_document(&output.bytes, output.metadata.content_type.as_deref())?;
        parse_feed(&decoded.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Link,
    Summary,
    Content,
    Published,
    Updated,
    Category,
}

fn field_for(name: &str, has_href: bool) -> Option<Field> {
    match name {
        "guid" | "id" => Some(Field::Id),
        "title" => Some(Field::Title),
        "link" if !has_href => Some(Field::Link),
        "description" | "summary" => Some(Field::Summary),
        "content:encoded" | "content" => Some(Field::Content),
        "pubDate" | "published" | "dc:date" => Some(Field::Published),
        "updated" => Some(Field::Updated),
        "category" => Some(Field::Category),
        _ => None,
    }
}

#[derive(Default)]
struct EntryBuilder {
    entry: FeedEntry,
    updated: Option<String>,
}

impl EntryBuilder {
    fn set(&mut self, field: Field, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        let entry = &mut self.entry;
        match field {
            Field::Id => entry.id = Some(value),
            Field::Title => entry.title = value,
            Field::Link => {
                if entry.link.is_empty() {
                    entry.link = value;
                }
            }
            Field::Summary => entry.summary = value,
            Field::Content => entry.content = Some(value),
            Field::Published => entry.published = Some(value),
            Field::Updated => self.updated = Some(value),
            Field::Category => entry.categories.push(value),
        }
    }

    // Attribute-carried data: Atom links and categories, enclosures, media descriptors.
    fn on_element(&mut self, name: &str, element: &BytesStart<'_>, depth: usize) {
        match name {
            "link" if depth == 1 => {
                let Some(href) = attr(element, "href") else {
                    return;
                };
                let rel = attr(element, "rel").unwrap_or_else(|| "alternate".to_string());
                match rel.as_str() {
                    "alternate" if self.entry.link.is_empty() => self.entry.link = href,
                    "enclosure" if is_image_type(attr(element, "type").as_deref()) => {
                        self.entry.enclosures.push(href)
                    }
                    _ => {}
                }
            }
            "enclosure" if depth == 1 => {
                if let Some(url) = attr(element, "url") {
                    if is_image_type(attr(element, "type").as_deref()) {
                        self.entry.enclosures.push(url);
                    }
                }
            }
            "media:content" | "media:thumbnail" => {
                let Some(url) = attr(element, "url") else {
                    return;
                };
                let medium_ok = attr(element, "medium").is_none_or(|m| m == "image");
                if medium_ok && is_image_type(attr(element, "type").as_deref()) {
                    self.entry.media.push(url);
                }
            }
            "category" if depth == 1 => {
                if let Some(term) = attr(element, "term") {
                    self.set(Field::Category, term);
                }
            }
            _ => {}
        }
    }

    fn build(self) -> FeedEntry {
        let mut entry = self.entry;
        if entry.published.is_none() {
            entry.published = self.updated;
        }
        entry
    }
}

fn is_image_type(content_type: Option<&str>) -> bool {
    content_type.is_none_or(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
}

fn attr(element: &BytesStart<'_>, key: &str) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

fn qualified_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Parse an RSS 2.0, RSS 1.0 or Atom document into entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut saw_feed_root = false;
    let mut current: Option<EntryBuilder> = None;
    // Depth below the current <item>/<entry>; its direct children sit at 1.
    let mut depth = 0usize;
    let mut capture: Option<(Field, usize)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = qualified_name(e.name().as_ref());
                match current.as_mut() {
                    None => {
                        if name == "item" || name == "entry" {
                            current = Some(EntryBuilder::default());
                            depth = 0;
                        } else if matches!(name.as_str(), "rss" | "feed" | "rdf:RDF") {
                            saw_feed_root = true;
                        }
                    }
                    Some(builder) => {
                        depth += 1;
                        builder.on_element(&name, &e, depth);
                        if capture.is_none() && depth == 1 {
                            let has_href = attr(&e, "href").is_some();
                            if let Some(field) = field_for(&name, has_href) {
                                capture = Some((field, depth));
                                text.clear();
                            }
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = qualified_name(e.name().as_ref());
                if let Some(builder) = current.as_mut() {
                    builder.on_element(&name, &e, depth + 1);
                }
            }
            Ok(Event::Text(t)) => {
                if capture.is_some() {
                    match t.unescape() {
                        Ok(value) => text.push_str(&value),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if capture.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) => {
                let name = qualified_name(e.name().as_ref());
                if current.is_none() {
                    continue;
                }
                if depth == 0 && (name == "item" || name == "entry") {
                    if let Some(builder) = current.take() {
                        entries.push(builder.build());
                    }
                    continue;
                }
                if let (Some((field, at)), Some(builder)) = (capture, current.as_mut()) {
                    if at == depth {
                        builder.set(field, std::mem::take(&mut text));
                        capture = None;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Parse(e.to_string())),
            _ => {}
        }
    }

    if !saw_feed_root {
        return Err(FeedError::NotAFeed);
    }
    Ok(entries)
}
