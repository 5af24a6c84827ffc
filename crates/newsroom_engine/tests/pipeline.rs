use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use newsroom_core::{FeedDescriptor, FeedEntry, Language};
use newsroom_engine::{
    AtomicFileWriter, FailureKind, FeedError, FeedSource, FetchError, FetchMetadata, FetchOutput,
    Fetcher, ImageResolver, LocalBackend, Pipeline, PipelineError, PipelineSettings,
    RewriteChain, RewriteRequest, RewriteService, RunSummary, ServiceError, StateFile,
    Unconfigured,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Feeds served from memory; a `None` feed fails to fetch.
#[derive(Default)]
struct StaticFeeds {
    feeds: Mutex<HashMap<String, Option<Vec<FeedEntry>>>>,
}

impl StaticFeeds {
    fn with(self, url: &str, entries: Option<Vec<FeedEntry>>) -> Self {
        self.feeds.lock().unwrap().insert(url.to_string(), entries);
        self
    }
}

#[async_trait::async_trait]
impl FeedSource for StaticFeeds {
    async fn entries(&self, feed: &FeedDescriptor) -> Result<Vec<FeedEntry>, FeedError> {
        match self.feeds.lock().unwrap().get(&feed.url) {
            Some(Some(entries)) => Ok(entries.clone()),
            _ => Err(FeedError::Parse("unreachable feed".into())),
        }
    }
}

/// Serves the same small PNG for every URL it is asked for.
#[derive(Default)]
struct PngFetcher {
    requested: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Fetcher for PngFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        if url.contains("missing") {
            return Err(FetchError::new(FailureKind::HttpStatus(404), "not found"));
        }
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([0, 120, 0]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        let bytes = out.into_inner();
        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                redirect_count: 0,
                content_type: Some("image/png".to_string()),
                byte_len: bytes.len() as u64,
            },
            bytes,
        })
    }
}

struct PerLanguageRewriter(HashMap<Language, String>);

#[async_trait::async_trait]
impl RewriteService for PerLanguageRewriter {
    async fn rewrite(&self, _: &RewriteRequest<'_>, language: Language) -> Result<String, ServiceError> {
        self.0.get(&language).cloned().ok_or(ServiceError::EmptyResponse)
    }
}

const FEED: &str = "https://a.test/feed.xml";

fn scenario_entry() -> FeedEntry {
    FeedEntry {
        link: "https://a.test/1".into(),
        title: "Team X wins".into(),
        summary: "<img src=i.jpg> lead text".into(),
        ..FeedEntry::default()
    }
}

fn entry(n: usize) -> FeedEntry {
    FeedEntry {
        link: format!("https://a.test/{n}"),
        title: format!("Story number {n}"),
        summary: format!("<p>Body of story {n}</p>"),
        ..FeedEntry::default()
    }
}

fn build(settings: PipelineSettings, feeds: StaticFeeds, rewriter: Arc<dyn RewriteService>) -> Pipeline {
    engine_logging::initialize_for_tests();
    let backend = Arc::new(LocalBackend::new(AtomicFileWriter::new(settings.covers_dir())));
    let images = ImageResolver::new(Arc::new(PngFetcher::default()), backend);
    let chain = RewriteChain::new(
        rewriter,
        Arc::new(Unconfigured),
        Duration::from_secs(1),
        Duration::from_secs(1),
    );
    Pipeline::new(settings, Arc::new(feeds), images, chain)
        .with_clock(Arc::new(|| Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()))
}

fn pipeline_with(root: &Path, feeds: StaticFeeds, rewriter: Arc<dyn RewriteService>) -> Pipeline {
    build(PipelineSettings::new(root), feeds, rewriter)
}

fn pipeline(root: &Path, feeds: StaticFeeds) -> Pipeline {
    pipeline_with(root, feeds, Arc::new(Unconfigured))
}

fn document(root: &Path, lang: &str, slug: &str) -> String {
    fs::read_to_string(root.join("content").join(lang).join("posts").join(format!("{slug}.md"))).unwrap()
}

fn seen_count(root: &Path) -> usize {
    StateFile::new(root.join(".state/posted.json")).load().len()
}

fn document_count(root: &Path) -> usize {
    ["en", "el"]
        .iter()
        .map(|lang| {
            fs::read_dir(root.join("content").join(lang).join("posts"))
                .map(|dir| dir.count())
                .unwrap_or(0)
        })
        .sum()
}

#[tokio::test]
async fn new_entry_without_services_publishes_both_languages() {
    let site = TempDir::new().unwrap();
    let feeds = StaticFeeds::default().with(FEED, Some(vec![scenario_entry()]));
    let summary = pipeline(site.path(), feeds)
        .run(&[FeedDescriptor::new(FEED)])
        .await
        .unwrap();

    assert_eq!(
        summary,
        RunSummary {
            feeds_attempted: 1,
            feeds_failed: 0,
            entries_published: 1,
            entries_failed: 0,
            entries_skipped: 0,
        }
    );
    assert_eq!(document_count(site.path()), 2);

    let en = document(site.path(), "en", "team-x-wins");
    assert!(en.starts_with("---\ntitle: \"Team X wins\"\ndate: \"2024-05-01T12:00:00+02:00\"\n"));
    assert!(en.contains("source: \"https://a.test/1\"\n"));
    assert!(en.contains("  image: \"/images/covers/team-x-wins-cover.jpg\"\n"));
    assert!(en.ends_with("---\n\nTeam X wins\n\nlead text\n\nSource: a.test (https://a.test/1)\n"));

    let el = document(site.path(), "el", "team-x-wins");
    assert!(el.ends_with("---\n\nTeam X wins\n\nlead text\n\nΠηγή: a.test (https://a.test/1)\n"));

    assert!(site.path().join("static/images/covers/team-x-wins-cover.jpg").is_file());
    assert_eq!(seen_count(site.path()), 1);
}

#[tokio::test]
async fn rerun_over_unchanged_feed_publishes_nothing() {
    let site = TempDir::new().unwrap();
    let feeds = || StaticFeeds::default().with(FEED, Some(vec![scenario_entry()]));
    let descriptors = [FeedDescriptor::new(FEED)];

    pipeline(site.path(), feeds()).run(&descriptors).await.unwrap();
    let before = document(site.path(), "en", "team-x-wins");

    let summary = pipeline(site.path(), feeds()).run(&descriptors).await.unwrap();
    assert_eq!(summary.entries_published, 0);
    assert_eq!(summary.entries_skipped, 1);
    assert_eq!(document_count(site.path()), 2);
    assert_eq!(seen_count(site.path()), 1);
    assert_eq!(document(site.path(), "en", "team-x-wins"), before);
}

#[tokio::test]
async fn empty_primary_generation_falls_back_without_reverse_translation() {
    let site = TempDir::new().unwrap();
    let feeds = StaticFeeds::default().with(FEED, Some(vec![scenario_entry()]));
    let rewriter = PerLanguageRewriter(HashMap::from([
        (Language::En, "   ".to_string()),
        (Language::El, "Η ομάδα Χ κέρδισε.".to_string()),
    ]));
    pipeline_with(site.path(), feeds, Arc::new(rewriter))
        .run(&[FeedDescriptor::new(FEED)])
        .await
        .unwrap();

    let en = document(site.path(), "en", "team-x-wins");
    assert!(en.ends_with("Team X wins\n\nlead text\n\nSource: a.test (https://a.test/1)\n"));
    let el = document(site.path(), "el", "team-x-wins");
    assert!(el.ends_with("Η ομάδα Χ κέρδισε.\n\nΠηγή: a.test (https://a.test/1)\n"));
}

#[tokio::test]
async fn failing_feed_does_not_stop_the_others() {
    let site = TempDir::new().unwrap();
    let feeds = StaticFeeds::default()
        .with("https://down.test/rss", None)
        .with(FEED, Some(vec![entry(1)]));
    let summary = pipeline(site.path(), feeds)
        .run(&[
            FeedDescriptor::new("https://down.test/rss"),
            FeedDescriptor::new(FEED),
        ])
        .await
        .unwrap();

    assert_eq!(summary.feeds_attempted, 2);
    assert_eq!(summary.feeds_failed, 1);
    assert_eq!(summary.entries_published, 1);
    assert_eq!(seen_count(site.path()), 1);
}

#[tokio::test]
async fn failed_write_leaves_entry_unseen_and_retry_reuses_slug() {
    let site = TempDir::new().unwrap();
    fs::create_dir_all(site.path().join("content")).unwrap();
    fs::write(site.path().join("content/el"), "blocks the namespace").unwrap();
    let descriptors = [FeedDescriptor::new(FEED)];
    let feeds = || StaticFeeds::default().with(FEED, Some(vec![scenario_entry()]));

    let summary = pipeline(site.path(), feeds()).run(&descriptors).await.unwrap();
    assert_eq!(summary.entries_failed, 1);
    assert_eq!(summary.entries_published, 0);
    assert_eq!(seen_count(site.path()), 0);
    assert!(document(site.path(), "en", "team-x-wins").contains("Team X wins"));

    fs::remove_file(site.path().join("content/el")).unwrap();
    let summary = pipeline(site.path(), feeds()).run(&descriptors).await.unwrap();
    assert_eq!(summary.entries_published, 1);
    assert_eq!(seen_count(site.path()), 1);
    assert_eq!(document_count(site.path()), 2);
    document(site.path(), "el", "team-x-wins");
}

#[tokio::test]
async fn only_the_first_entries_of_a_feed_are_considered() {
    let site = TempDir::new().unwrap();
    let feeds = StaticFeeds::default().with(FEED, Some((1..=5).map(entry).collect()));
    let mut settings = PipelineSettings::new(site.path());
    settings.max_entries_per_feed = 2;
    let capped = build(settings, feeds, Arc::new(Unconfigured));
    assert_eq!(capped.settings().max_entries_per_feed, 2);

    let summary = capped.run(&[FeedDescriptor::new(FEED)]).await.unwrap();
    assert_eq!(summary.entries_published, 2);
    assert_eq!(seen_count(site.path()), 2);
    document(site.path(), "en", "story-number-1");
    document(site.path(), "en", "story-number-2");
}

#[tokio::test]
async fn same_title_from_two_links_gets_distinct_slugs() {
    let site = TempDir::new().unwrap();
    let mut twin = scenario_entry();
    twin.link = "https://b.test/1".into();
    let feeds = StaticFeeds::default().with(FEED, Some(vec![scenario_entry(), twin]));
    let summary = pipeline(site.path(), feeds)
        .run(&[FeedDescriptor::new(FEED)])
        .await
        .unwrap();

    assert_eq!(summary.entries_published, 2);
    assert_eq!(document_count(site.path()), 4);
    assert!(document(site.path(), "en", "team-x-wins").contains("https://a.test/1"));
}

#[tokio::test]
async fn entries_without_title_or_text_are_skipped() {
    let site = TempDir::new().unwrap();
    let blank = FeedEntry {
        link: "https://a.test/blank".into(),
        summary: "<p>  </p>".into(),
        ..FeedEntry::default()
    };
    let feeds = StaticFeeds::default().with(FEED, Some(vec![blank]));
    let summary = pipeline(site.path(), feeds)
        .run(&[FeedDescriptor::new(FEED)])
        .await
        .unwrap();
    assert_eq!(summary.entries_skipped, 1);
    assert_eq!(document_count(site.path()), 0);
    assert_eq!(seen_count(site.path()), 0);
}

#[tokio::test]
async fn no_feeds_is_fatal() {
    let site = TempDir::new().unwrap();
    let err = pipeline(site.path(), StaticFeeds::default())
        .run(&[])
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoFeeds));
}
