use std::fmt;
use std::sync::Arc;

use engine_logging::{engine_info, engine_warn};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as StorePath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};
use crate::settings::{StorageCredentials, LOCAL_COVERS_PUBLIC_PREFIX};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key {0:?}")]
    InvalidKey(String),
    #[error("remote storage: {0}")]
    Remote(String),
    #[error(transparent)]
    Local(#[from] PersistError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Remote,
    Local,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageKind::Remote => "remote",
            StorageKind::Local => "local",
        })
    }
}

/// Where a stored object ended up and how it is referenced from documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub reference: String,
    pub kind: StorageKind,
}

#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;
}

/// Covers written under the site's static directory.
pub struct LocalBackend {
    writer: AtomicFileWriter,
    public_prefix: String,
}

impl LocalBackend {
    pub fn new(writer: AtomicFileWriter) -> Self {
        Self {
            writer,
            public_prefix: LOCAL_COVERS_PUBLIC_PREFIX.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalBackend {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let path = self.writer.write(key, &bytes)?;
        engine_info!("stored cover locally at {}", path.display());
        Ok(StoredObject {
            reference: format!("{}/{key}", self.public_prefix),
            kind: StorageKind::Local,
        })
    }
}

/// S3-compatible bucket served from a public base URL.
pub struct S3Backend {
    inner: Arc<dyn ObjectStore>,
    public_base_url: String,
}

impl S3Backend {
    pub fn new(credentials: &StorageCredentials) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&credentials.bucket)
            .with_region(&credentials.region)
            .with_access_key_id(&credentials.access_key_id)
            .with_secret_access_key(&credentials.secret_access_key);
        if let Some(endpoint) = &credentials.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        let store = builder
            .build()
            .map_err(|e| StorageError::Remote(e.to_string()))?;
        Ok(Self::with_store(Arc::new(store), &credentials.public_base_url))
    }

    /// Wrap any object store; used for S3-compatible services and tests.
    pub fn with_store(inner: Arc<dyn ObjectStore>, public_base_url: &str) -> Self {
        Self {
            inner,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for S3Backend {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let path = StorePath::parse(key).map_err(|_| StorageError::InvalidKey(key.to_string()))?;
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };
        self.inner
            .put_opts(&path, PutPayload::from(bytes), options)
            .await
            .map_err(|e| StorageError::Remote(e.to_string()))?;
        Ok(StoredObject {
            reference: format!("{}/{key}", self.public_base_url),
            kind: StorageKind::Remote,
        })
    }
}

/// Try the remote backend first and keep the local copy as the fallback.
pub struct FallbackBackend {
    remote: Arc<dyn StorageBackend>,
    local: Arc<dyn StorageBackend>,
}

impl FallbackBackend {
    pub fn new(remote: Arc<dyn StorageBackend>, local: Arc<dyn StorageBackend>) -> Self {
        Self { remote, local }
    }
}

#[async_trait::async_trait]
impl StorageBackend for FallbackBackend {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        match self.remote.put(key, bytes.clone(), content_type).await {
            Ok(stored) => Ok(stored),
            Err(err) => {
                engine_warn!("remote upload of {key} failed, storing locally: {err}");
                self.local.put(key, bytes, content_type).await
            }
        }
    }
}

/// Remote storage only with a complete credential set, local otherwise.
pub fn select_backend(
    credentials: Option<&StorageCredentials>,
    local: Arc<dyn StorageBackend>,
) -> Arc<dyn StorageBackend> {
    let Some(credentials) = credentials else {
        return local;
    };
    match S3Backend::new(credentials) {
        Ok(remote) => {
            engine_info!("covers go to bucket {}", credentials.bucket);
            Arc::new(FallbackBackend::new(Arc::new(remote), local))
        }
        Err(err) => {
            engine_warn!("remote storage unusable, using local covers: {err}");
            local
        }
    }
}
