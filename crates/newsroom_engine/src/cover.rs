use std::fmt;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_warn};
use image::codecs::jpeg::JpegEncoder;
use newsroom_core::FeedEntry;
use url::Url;

use crate::extract::{first_inline_image, ArticlePage};
use crate::fetch::Fetcher;
use crate::storage::{StorageBackend, StorageKind};

const JPEG_QUALITY: u8 = 82;
const MAX_URL_EXTENSION_CHARS: usize = 5;

/// Where a cover candidate came from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Enclosure,
    Media,
    InlineImage,
    SocialPreview,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CandidateSource::Enclosure => "enclosure",
            CandidateSource::Media => "media",
            CandidateSource::InlineImage => "inline image",
            CandidateSource::SocialPreview => "social preview",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverCandidate {
    pub url: String,
    pub source: CandidateSource,
}

/// A stored cover image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub source_url: String,
    pub backend: StorageKind,
    /// Path or URL documents should reference.
    pub reference: String,
}

/// First cover candidate by precedence; later sources are never consulted
/// once an earlier one yields a URL.
pub fn discover_candidate(entry: &FeedEntry, article: Option<&ArticlePage>) -> Option<CoverCandidate> {
    let first = |urls: &[String]| {
        urls.iter()
            .map(|u| u.trim())
            .find(|u| !u.is_empty())
            .map(str::to_string)
    };

    let found = first(entry.enclosures.as_slice())
        .map(|url| (url, CandidateSource::Enclosure))
        .or_else(|| first(entry.media.as_slice()).map(|url| (url, CandidateSource::Media)))
        .or_else(|| {
            first_inline_image(&entry.summary)
                .or_else(|| entry.content.as_deref().and_then(first_inline_image))
                .map(|url| (url, CandidateSource::InlineImage))
        })
        .or_else(|| {
            article
                .and_then(|page| page.preview_image.clone())
                .map(|url| (url, CandidateSource::SocialPreview))
        })?;

    let (raw, source) = found;
    let url = resolve_url(&raw, &entry.link)?;
    Some(CoverCandidate { url, source })
}

/// Absolute URL for `raw`, joined onto `base` when relative.
fn resolve_url(raw: &str, base: &str) -> Option<String> {
    if let Ok(url) = Url::parse(raw) {
        return Some(url.to_string());
    }
    let base = Url::parse(base).ok()?;
    base.join(raw).ok().map(|u| u.to_string())
}

/// Finds, fetches and stores an entry's cover image.
pub struct ImageResolver {
    fetcher: Arc<dyn Fetcher>,
    backend: Arc<dyn StorageBackend>,
}

impl ImageResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, backend: Arc<dyn StorageBackend>) -> Self {
        Self { fetcher, backend }
    }

    /// Never fails the entry: every problem ends in `None` and a log line.
    pub async fn resolve(
        &self,
        entry: &FeedEntry,
        article: Option<&ArticlePage>,
        slug: &str,
    ) -> Option<CoverImage> {
        let Some(candidate) = discover_candidate(entry, article) else {
            engine_debug!("no cover candidate for {}", entry.link);
            return None;
        };
        engine_debug!("cover for {} from {}: {}", entry.link, candidate.source, candidate.url);

        let fetched = match self.fetcher.fetch(&candidate.url).await {
            Ok(output) => output,
            Err(err) => {
                engine_warn!("cover fetch failed for {}: {err}", candidate.url);
                return None;
            }
        };

        let media_type = fetched.media_type();
        let (bytes, extension, content_type) = match reencode_jpeg(&fetched.bytes) {
            Some(jpeg) => (jpeg, "jpg".to_string(), "image/jpeg".to_string()),
            None => {
                engine_debug!("cover {} not decodable, storing original bytes", candidate.url);
                let extension = original_extension(&candidate.url, media_type.as_deref());
                let content_type = media_type.unwrap_or_else(|| "application/octet-stream".to_string());
                (fetched.bytes, extension, content_type)
            }
        };

        let key = format!("{slug}-cover.{extension}");
        match self.backend.put(&key, bytes, &content_type).await {
            Ok(stored) => Some(CoverImage {
                source_url: candidate.url,
                backend: stored.kind,
                reference: stored.reference,
            }),
            Err(err) => {
                engine_warn!("storing cover {key} failed: {err}");
                None
            }
        }
    }
}

/// Decode any supported format and encode it as JPEG.
pub fn reencode_jpeg(bytes: &[u8]) -> Option<Vec<u8>> {
    let decoded = image::load_from_memory(bytes).ok()?;
    let rgb = decoded.to_rgb8();
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))
        .ok()?;
    Some(out)
}

/// Extension for bytes stored as-is: URL path first, then the media type.
fn original_extension(url: &str, media_type: Option<&str>) -> String {
    let from_path = Url::parse(url).ok().and_then(|u| {
        let last = u.path_segments()?.next_back()?.to_string();
        let (_, ext) = last.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        let valid = !ext.is_empty()
            && ext.len() <= MAX_URL_EXTENSION_CHARS
            && ext.chars().all(|c| c.is_ascii_alphanumeric());
        valid.then_some(ext)
    });
    from_path
        .or_else(|| {
            media_type
                .and_then(|mt| mt.strip_prefix("image/"))
                .map(|sub| match sub {
                    "jpeg" | "pjpeg" => "jpg".to_string(),
                    "svg+xml" => "svg".to_string(),
                    other => other.to_string(),
                })
                .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        })
        .unwrap_or_else(|| "jpg".to_string())
}
