mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use engine_logging::{engine_error, engine_info};
use newsroom_core::parse_offset;
use newsroom_engine::{Credentials, Pipeline, PipelineSettings, RunSummary};

use crate::config::{load_feed_config, DEFAULT_FEEDS_FILE};
use crate::logging::LogDestination;

#[derive(Parser, Debug)]
#[command(name = "newsroom", version, about = "Turn news feeds into bilingual site documents")]
struct Args {
    /// Site root holding content/, static/ and .state/.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Feed list; defaults to config/feeds.ron under the site root.
    #[arg(long)]
    feeds: Option<PathBuf>,

    /// Entries considered per feed and run.
    #[arg(long, default_value_t = 20)]
    max_entries: usize,

    /// Feeds fetched at the same time.
    #[arg(long, default_value_t = 4)]
    feed_concurrency: usize,

    /// Fetch each entry's article page for text and preview image.
    #[arg(long)]
    fetch_articles: bool,

    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    log_destination: LogDestination,

    /// Fixed offset used for document dates.
    #[arg(long, default_value = "+02:00", allow_hyphen_values = true)]
    timezone_offset: String,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::initialize(args.log_destination, engine_logging::parse_level(&args.log_level));

    match run(args) {
        Ok(summary) => {
            println!("Done. New posts: {}", summary.entries_published);
            ExitCode::SUCCESS
        }
        Err(err) => {
            engine_error!("{err:#}");
            eprintln!("newsroom: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<RunSummary> {
    let feeds_path = args
        .feeds
        .clone()
        .unwrap_or_else(|| args.root.join(DEFAULT_FEEDS_FILE));
    let config = load_feed_config(&feeds_path)?;
    let timezone = parse_offset(&args.timezone_offset)
        .with_context(|| format!("invalid timezone offset {:?}", args.timezone_offset))?;

    let mut settings = PipelineSettings::new(&args.root);
    settings.max_entries_per_feed = args.max_entries;
    settings.feed_concurrency = args.feed_concurrency;
    settings.fetch_articles = args.fetch_articles;
    settings.timezone = timezone;
    settings.taxonomy = config.taxonomy;

    let credentials = Credentials::from_env();
    engine_info!(
        "services: generative={} translation={} remote covers={}",
        credentials.generative.is_some(),
        credentials.translation.is_some(),
        credentials.storage.is_some()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;
    runtime.block_on(async {
        let pipeline = Pipeline::from_settings(settings, &credentials);
        let summary = pipeline.run(&config.sources).await?;
        Ok::<_, anyhow::Error>(summary)
    })
}
