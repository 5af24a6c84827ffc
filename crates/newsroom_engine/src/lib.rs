//! Newsroom engine: fetching, rewriting, storage and the run orchestration.
mod chain;
mod decode;
mod extract;
mod feed;
mod fetch;
mod cover;
mod persist;
mod pipeline;
mod services;
mod settings;
mod state;
mod storage;
mod types;
mod writer;

pub use chain::{RewriteChain, RewriteInput, RewriteResult, Tier};
pub use decode::{decode_document, DecodeError, DecodedText};
pub use extract::{extract_article, extract_feed_text, first_inline_image, ArticlePage};
pub use feed::{parse_feed, FeedError, FeedSource, HttpFeedSource};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use cover::{discover_candidate, reencode_jpeg, CandidateSource, CoverCandidate, CoverImage, ImageResolver};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{Clock, EntryError, EntryOutcome, Pipeline, PipelineError, RunSummary};
pub use services::{
    build_rewrite_payload, extract_generated_text, DeepLTranslator, RewriteRequest,
    RewriteService, ServiceError, TranslationService, Unconfigured, WorkersAiRewriter,
    GENERATED_TEXT_SHAPES,
};
pub use settings::{
    Credentials, GenerativeCredentials, PipelineSettings, StorageCredentials,
    TranslationCredentials, LOCAL_COVERS_PUBLIC_PREFIX,
};
pub use state::{StateError, StateFile};
pub use storage::{
    select_backend, FallbackBackend, LocalBackend, S3Backend, StorageBackend, StorageError,
    StorageKind, StoredObject,
};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
pub use writer::DocumentWriter;
