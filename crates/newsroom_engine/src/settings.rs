use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use newsroom_core::{Language, Taxonomy};

pub const ENV_CF_ACCOUNT_ID: &str = "CF_ACCOUNT_ID";
pub const ENV_CF_API_TOKEN: &str = "CF_API_TOKEN";
pub const ENV_CF_MODEL: &str = "CF_MODEL";
pub const ENV_CF_API_BASE: &str = "CF_API_BASE";
pub const ENV_DEEPL_API_KEY: &str = "DEEPL_API_KEY";
pub const ENV_DEEPL_API_BASE: &str = "DEEPL_API_BASE";
pub const ENV_S3_BUCKET: &str = "COVERS_S3_BUCKET";
pub const ENV_S3_REGION: &str = "COVERS_S3_REGION";
pub const ENV_S3_ACCESS_KEY_ID: &str = "COVERS_S3_ACCESS_KEY_ID";
pub const ENV_S3_SECRET_ACCESS_KEY: &str = "COVERS_S3_SECRET_ACCESS_KEY";
pub const ENV_S3_ENDPOINT: &str = "COVERS_S3_ENDPOINT";
pub const ENV_COVERS_PUBLIC_BASE_URL: &str = "COVERS_PUBLIC_BASE_URL";

const DEFAULT_CF_MODEL: &str = "@cf/meta/llama-3.1-70b-instruct";
const DEFAULT_CF_API_BASE: &str = "https://api.cloudflare.com/client/v4";
const DEFAULT_DEEPL_ENDPOINT: &str = "https://api-free.deepl.com/v2/translate";
const DEFAULT_OFFSET_SECS: i32 = 2 * 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerativeCredentials {
    pub account_id: String,
    pub api_token: String,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationCredentials {
    pub auth_key: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub public_base_url: String,
    pub endpoint: Option<String>,
}

/// Optional service credentials. A missing or partial set disables the
/// feature it belongs to; it is never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub generative: Option<GenerativeCredentials>,
    pub translation: Option<TranslationCredentials>,
    pub storage: Option<StorageCredentials>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds credentials from any key/value source; blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let generative = match (get(ENV_CF_ACCOUNT_ID), get(ENV_CF_API_TOKEN)) {
            (Some(account_id), Some(api_token)) => Some(GenerativeCredentials {
                account_id,
                api_token,
                model: get(ENV_CF_MODEL).unwrap_or_else(|| DEFAULT_CF_MODEL.to_string()),
                api_base: get(ENV_CF_API_BASE).unwrap_or_else(|| DEFAULT_CF_API_BASE.to_string()),
            }),
            _ => None,
        };

        let translation = get(ENV_DEEPL_API_KEY).map(|auth_key| TranslationCredentials {
            auth_key,
            endpoint: get(ENV_DEEPL_API_BASE).unwrap_or_else(|| DEFAULT_DEEPL_ENDPOINT.to_string()),
        });

        let storage = match (
            get(ENV_S3_BUCKET),
            get(ENV_S3_REGION),
            get(ENV_S3_ACCESS_KEY_ID),
            get(ENV_S3_SECRET_ACCESS_KEY),
            get(ENV_COVERS_PUBLIC_BASE_URL),
        ) {
            (Some(bucket), Some(region), Some(access_key_id), Some(secret_access_key), Some(public_base_url)) => {
                Some(StorageCredentials {
                    bucket,
                    region,
                    access_key_id,
                    secret_access_key,
                    public_base_url,
                    endpoint: get(ENV_S3_ENDPOINT),
                })
            }
            _ => None,
        };

        Self {
            generative,
            translation,
            storage,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Site root; content, covers and state live below it.
    pub site_root: PathBuf,
    /// Only the first N entries of each feed are considered per run.
    pub max_entries_per_feed: usize,
    /// Feeds fetched at the same time. Entry processing stays sequential.
    pub feed_concurrency: usize,
    pub fetch_articles: bool,
    pub timezone: FixedOffset,
    pub generation_timeout: Duration,
    pub translation_timeout: Duration,
    pub taxonomy: Taxonomy,
}

impl PipelineSettings {
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
            max_entries_per_feed: 20,
            feed_concurrency: 4,
            fetch_articles: false,
            timezone: FixedOffset::east_opt(DEFAULT_OFFSET_SECS).unwrap_or(Utc.fix()),
            generation_timeout: Duration::from_secs(60),
            translation_timeout: Duration::from_secs(30),
            taxonomy: Taxonomy::default(),
        }
    }

    pub fn content_root(&self) -> PathBuf {
        self.site_root.join("content")
    }

    pub fn content_dir(&self, language: Language) -> PathBuf {
        self.content_root().join(language.code()).join("posts")
    }

    pub fn covers_dir(&self) -> PathBuf {
        self.site_root.join("static").join("images").join("covers")
    }

    pub fn state_path(&self) -> PathBuf {
        self.site_root.join(".state").join("posted.json")
    }
}

/// Public URL prefix under which the local covers directory is served.
pub const LOCAL_COVERS_PUBLIC_PREFIX: &str = "/images/covers";
