//! Object store access.
//!
//! The search pipeline only needs two things from a store: enumerate the keys
//! under a prefix and download one object into memory. [`ObjectClient`]
//! captures exactly that, so the coordinator can run against S3, a local
//! directory or an in-memory map without knowing which.
//!
//! ```text
//! ┌──────────────────┐   list(bucket, prefix)   ┌──────────────────────┐
//! │ SearchCoordinator│ ───────────────────────▶ │ S3ObjectClient       │
//! │   + workers      │   fetch(bucket, object)  │ LocalObjectClient    │
//! │                  │ ───────────────────────▶ │ MemoryObjectClient   │
//! └──────────────────┘                          └──────────────────────┘
//! ```

mod local;
mod memory;
mod s3;

pub use local::LocalObjectClient;
pub use memory::MemoryObjectClient;
pub use s3::S3ObjectClient;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::config::StoreConfig;
use crate::errors::SearchResult;

/// Opens the store described by `config`: a local directory when
/// `local_dir` is set, S3 otherwise.
pub async fn connect(config: &StoreConfig) -> SearchResult<Arc<dyn ObjectClient>> {
    match &config.local_dir {
        Some(dir) => {
            info!("Reading buckets from local directory {}", dir.display());
            Ok(Arc::new(LocalObjectClient::new(dir)))
        }
        None => Ok(Arc::new(S3ObjectClient::from_config(config).await?)),
    }
}

/// Reference to one object produced by listing.
///
/// The key is expected to be non-empty; a store that hands back an object
/// without a key yields an empty `ObjectRef`, which [`ObjectClient::fetch`]
/// rejects with [`SearchError::MissingKey`](crate::SearchError::MissingKey).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    key: String,
}

impl ObjectRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl From<&str> for ObjectRef {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Full contents of one downloaded object.
///
/// Held only while its object is being scanned.
#[derive(Debug, Clone, Default)]
pub struct ObjectBody {
    bytes: Bytes,
}

impl ObjectBody {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes downloaded
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Capability over a remote object store.
///
/// Authentication, retries of transient transport errors and connection reuse
/// are the implementation's own business.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Enumerate every object in `bucket` whose key starts with `prefix`.
    ///
    /// An empty prefix selects the whole bucket. Pagination is handled
    /// internally and the returned list is complete.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::ListError`](crate::SearchError::ListError) when
    /// the enumeration fails; no partial listing is returned.
    async fn list(&self, bucket: &str, prefix: &str) -> SearchResult<Vec<ObjectRef>>;

    /// Download the complete body of `object`.
    ///
    /// # Errors
    ///
    /// - [`SearchError::MissingKey`](crate::SearchError::MissingKey) if the
    ///   reference has an empty key
    /// - [`SearchError::FetchError`](crate::SearchError::FetchError) for
    ///   permission, transport or vanished-object failures
    async fn fetch(&self, bucket: &str, object: &ObjectRef) -> SearchResult<ObjectBody>;
}
