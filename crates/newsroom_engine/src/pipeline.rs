use std::sync::Arc;

use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use futures_util::{stream, StreamExt};
use newsroom_core::{
    clean_text, format_timestamp, source_name, truncate_chars, CoverDescriptor, Deduplicator,
    EntryStage, FeedDescriptor, FeedEntry, Language, PostMetadata, SeenStore, SlugAllocator,
    TagSet,
};
use thiserror::Error;

use crate::chain::{RewriteChain, RewriteInput, RewriteResult};
use crate::decode::decode_document;
use crate::extract::{extract_article, extract_feed_text, ArticlePage};
use crate::feed::{FeedError, FeedSource, HttpFeedSource};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::cover::{CoverImage, ImageResolver};
use crate::persist::{AtomicFileWriter, PersistError};
use crate::services::{
    DeepLTranslator, RewriteService, ServiceError, TranslationService, Unconfigured,
    WorkersAiRewriter,
};
use crate::settings::{Credentials, PipelineSettings};
use crate::state::StateFile;
use crate::storage::{select_backend, LocalBackend};
use crate::writer::DocumentWriter;

const DESCRIPTION_CHARS: usize = 240;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no feeds configured")]
    NoFeeds,
}

/// Why one entry was abandoned. The entry stays unseen and is retried next run.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("writing the {language} document failed: {source}")]
    Persist {
        language: Language,
        #[source]
        source: PersistError,
    },
}

impl EntryError {
    pub fn stage(&self) -> EntryStage {
        match self {
            EntryError::Persist { .. } => EntryStage::Persisted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Published { slug: String },
    /// Neither title nor text; nothing to publish.
    Empty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub feeds_attempted: usize,
    pub feeds_failed: usize,
    pub entries_published: usize,
    pub entries_failed: usize,
    pub entries_skipped: usize,
}

/// Owns the seen store for a run and drives every entry from discovery to
/// its seen record.
pub struct Pipeline {
    settings: PipelineSettings,
    feeds: Arc<dyn FeedSource>,
    articles: Option<Arc<dyn Fetcher>>,
    images: ImageResolver,
    chain: RewriteChain,
    writer: DocumentWriter,
    state: StateFile,
    clock: Clock,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        feeds: Arc<dyn FeedSource>,
        images: ImageResolver,
        chain: RewriteChain,
    ) -> Self {
        let writer = DocumentWriter::new(settings.content_root());
        let state = StateFile::new(settings.state_path());
        Self {
            settings,
            feeds,
            articles: None,
            images,
            chain,
            writer,
            state,
            clock: Arc::new(Utc::now),
        }
    }

    /// Article pages are fetched only when a fetcher is set.
    pub fn with_article_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.articles = Some(fetcher);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Real HTTP services; features without credentials, or whose client
    /// cannot be built, degrade instead of failing.
    pub fn from_settings(settings: PipelineSettings, credentials: &Credentials) -> Self {
        let feed_fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new(FetchSettings::for_feeds()));
        let image_fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new(FetchSettings::for_images()));

        let local = Arc::new(LocalBackend::new(AtomicFileWriter::new(settings.covers_dir())));
        let backend = select_backend(credentials.storage.as_ref(), local);

        let rewriter = rewriter_or_unconfigured(
            credentials
                .generative
                .as_ref()
                .map(|creds| WorkersAiRewriter::new(creds, settings.generation_timeout)),
        );
        let translator = translator_or_unconfigured(
            credentials
                .translation
                .as_ref()
                .map(|creds| DeepLTranslator::new(creds, settings.translation_timeout)),
        );
        let chain = RewriteChain::new(
            rewriter,
            translator,
            settings.generation_timeout,
            settings.translation_timeout,
        );

        let fetch_articles = settings.fetch_articles;
        let pipeline = Self::new(
            settings,
            Arc::new(HttpFeedSource::new(feed_fetcher)),
            ImageResolver::new(image_fetcher, backend),
            chain,
        );
        if fetch_articles {
            pipeline.with_article_fetcher(Arc::new(ReqwestFetcher::new(FetchSettings::for_articles())))
        } else {
            pipeline
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// One full pass over `feeds`. The seen store is loaded once and flushed
    /// once at the end, whatever happened to individual feeds and entries.
    pub async fn run(&self, feeds: &[FeedDescriptor]) -> Result<RunSummary, PipelineError> {
        if feeds.is_empty() {
            return Err(PipelineError::NoFeeds);
        }

        let mut store = self.state.load();
        let mut summary = RunSummary::default();
        engine_info!("run starting: {} feeds, {} seen entries", feeds.len(), store.len());

        let fetched: Vec<(&FeedDescriptor, Result<Vec<FeedEntry>, FeedError>)> =
            stream::iter(feeds)
                .map(|feed| async move { (feed, self.feeds.entries(feed).await) })
                .buffered(self.settings.feed_concurrency.max(1))
                .collect()
                .await;

        for (feed, result) in fetched {
            summary.feeds_attempted += 1;
            match result {
                Ok(entries) => self.process_feed(feed, entries, &mut store, &mut summary).await,
                Err(err) => {
                    summary.feeds_failed += 1;
                    engine_warn!("feed {} failed: {err}", feed.url);
                }
            }
        }

        if let Err(err) = self.state.flush(&store) {
            engine_error!("cannot write state {}: {err}", self.state.path().display());
        }
        engine_info!(
            "run finished: {} published, {} failed, {} skipped, {}/{} feeds failed",
            summary.entries_published,
            summary.entries_failed,
            summary.entries_skipped,
            summary.feeds_failed,
            summary.feeds_attempted
        );
        Ok(summary)
    }

    async fn process_feed(
        &self,
        feed: &FeedDescriptor,
        entries: Vec<FeedEntry>,
        store: &mut SeenStore,
        summary: &mut RunSummary,
    ) {
        let mut slugs = SlugAllocator::from_existing(self.writer.existing_slugs());
        let mut dedup = Deduplicator::new(store);
        dedup.set_feed(&feed.url);

        for entry in entries.into_iter().take(self.settings.max_entries_per_feed) {
            if !dedup.is_new(&entry) {
                summary.entries_skipped += 1;
                continue;
            }
            match self.process_entry(feed, &entry, &mut slugs).await {
                Ok(EntryOutcome::Published { slug }) => {
                    let ts = (self.clock)().timestamp();
                    let fingerprint = dedup.mark_seen(&entry, &slug, ts);
                    summary.entries_published += 1;
                    engine_info!("published {slug} ({fingerprint}) from {}", feed.url);
                }
                Ok(EntryOutcome::Empty) => {
                    summary.entries_skipped += 1;
                    engine_debug!("entry without title or text in {}", feed.url);
                }
                Err(err) => {
                    summary.entries_failed += 1;
                    engine_warn!(
                        "entry {} ({}) from {} abandoned at {}: {err}",
                        entry.link,
                        dedup.fingerprint(&entry),
                        feed.url,
                        err.stage()
                    );
                }
            }
        }
    }

    /// Everything between deduplication and the seen record for one entry.
    pub async fn process_entry(
        &self,
        feed: &FeedDescriptor,
        entry: &FeedEntry,
        slugs: &mut SlugAllocator,
    ) -> Result<EntryOutcome, EntryError> {
        let title = clean_text(&entry.title);
        let mut text = extract_feed_text(entry.body_html());
        let article = self.fetch_article(&entry.link).await;
        if let Some(page) = &article {
            if page.text.chars().count() > text.chars().count() {
                text = page.text.clone();
            }
        }
        if title.is_empty() && text.is_empty() {
            return Ok(EntryOutcome::Empty);
        }

        let slug = slugs.allocate(&title, &entry.link);
        let cover = self.images.resolve(entry, article.as_ref(), &slug).await;

        let source = source_name(&entry.link, &feed.url);
        let input = RewriteInput {
            title: &title,
            text: &text,
            source_name: &source,
            link: entry.link.trim(),
        };
        let bodies = self.chain.render_all(&input).await;

        let tags = TagSet::derive(entry, feed, &self.settings.taxonomy, &text);
        let date = format_timestamp(
            entry.published.as_deref(),
            self.settings.timezone,
            (self.clock)(),
        );
        let template = PostMetadata {
            date,
            description: truncate_chars(&text, DESCRIPTION_CHARS).trim().to_string(),
            source: entry.link.trim().to_string(),
            tags: tags.tags,
            players: tags.players,
            teams: tags.teams,
            leagues: tags.leagues,
            countries: tags.countries,
            ..PostMetadata::default()
        };

        self.persist_all(&slug, &title, &template, cover.as_ref(), &bodies)?;
        Ok(EntryOutcome::Published { slug })
    }

    /// Writes every language even after a failure, then reports the first one.
    fn persist_all(
        &self,
        slug: &str,
        title: &str,
        template: &PostMetadata,
        cover: Option<&CoverImage>,
        bodies: &[RewriteResult],
    ) -> Result<(), EntryError> {
        let mut first_failure = None;
        for result in bodies {
            let language = result.language;
            let title = if title.is_empty() {
                language.untitled().to_string()
            } else {
                title.to_string()
            };
            let metadata = PostMetadata {
                cover: cover.map(|c| CoverDescriptor {
                    image: c.reference.clone(),
                    alt: title.clone(),
                    caption: String::new(),
                }),
                title,
                ..template.clone()
            };
            match self.writer.write(language, slug, &metadata, &result.body) {
                Ok(path) => engine_debug!("wrote {} ({})", path.display(), result.tier),
                Err(source) => {
                    engine_warn!("writing {language}/{slug} failed: {source}");
                    first_failure.get_or_insert(EntryError::Persist { language, source });
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    async fn fetch_article(&self, link: &str) -> Option<ArticlePage> {
        let fetcher = self.articles.as_ref()?;
        let link = link.trim();
        if link.is_empty() {
            return None;
        }
        let output = match fetcher.fetch(link).await {
            Ok(output) => output,
            Err(err) => {
                engine_debug!("article fetch failed for {link}: {err}");
                return None;
            }
        };
        match decode_document(&output.bytes, output.metadata.content_type.as_deref()) {
            Ok(decoded) => Some(extract_article(&decoded.text)),
            Err(err) => {
                engine_debug!("article {link} not decodable: {err}");
                None
            }
        }
    }
}

fn rewriter_or_unconfigured(
    built: Option<Result<WorkersAiRewriter, ServiceError>>,
) -> Arc<dyn RewriteService> {
    match built {
        Some(Ok(rewriter)) => Arc::new(rewriter),
        Some(Err(err)) => {
            engine_warn!("generative rewrite disabled, client setup failed: {err}");
            Arc::new(Unconfigured)
        }
        None => {
            engine_info!("generative rewrite not configured");
            Arc::new(Unconfigured)
        }
    }
}

fn translator_or_unconfigured(
    built: Option<Result<DeepLTranslator, ServiceError>>,
) -> Arc<dyn TranslationService> {
    match built {
        Some(Ok(translator)) => Arc::new(translator),
        Some(Err(err)) => {
            engine_warn!("translation disabled, client setup failed: {err}");
            Arc::new(Unconfigured)
        }
        None => {
            engine_info!("translation not configured");
            Arc::new(Unconfigured)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RewriteRequest;

    fn request() -> RewriteRequest<'static> {
        RewriteRequest {
            title: "Team X wins",
            text: "Team X beat Team Y.",
            attribution: "Source: a.test",
        }
    }

    #[tokio::test]
    async fn failed_rewrite_client_degrades_to_unconfigured() {
        engine_logging::initialize_for_tests();
        let rewriter = rewriter_or_unconfigured(Some(Err(ServiceError::EmptyResponse)));
        let err = rewriter.rewrite(&request(), Language::En).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured));
    }

    #[tokio::test]
    async fn failed_translation_client_degrades_to_pass_through() {
        engine_logging::initialize_for_tests();
        let translator = translator_or_unconfigured(Some(Err(ServiceError::EmptyResponse)));
        assert!(!translator.is_configured());
        let text = translator.translate("body", Language::En, Language::El).await.unwrap();
        assert_eq!(text, "body");
    }

    #[test]
    fn missing_credentials_leave_services_unconfigured() {
        assert!(!translator_or_unconfigured(None).is_configured());
    }
}
