use async_trait::async_trait;
use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};

use super::{ObjectBody, ObjectClient, ObjectRef};
use crate::errors::{SearchError, SearchResult};

/// [`ObjectClient`] that serves buckets from a local directory tree.
///
/// Bucket `b` is the directory `<root>/b`, and an object's key is its path
/// relative to that directory with `/` separators. Useful for searching a
/// synced copy of a bucket, or an S3 mirror on disk, with the same tool.
///
/// Symbolic links are listed as objects and followed on fetch. Paths that
/// are not valid UTF-8 cannot be object keys and are skipped.
#[derive(Debug, Clone)]
pub struct LocalObjectClient {
    root: PathBuf,
}

impl LocalObjectClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    /// `/`-joined path of `path` below `bucket_dir`, or `None` if it is not UTF-8
    fn key_for(bucket_dir: &Path, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(bucket_dir).ok()?;
        let parts = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ObjectClient for LocalObjectClient {
    async fn list(&self, bucket: &str, prefix: &str) -> SearchResult<Vec<ObjectRef>> {
        let bucket_dir = self.bucket_dir(bucket);
        if !bucket_dir.is_dir() {
            return Err(SearchError::list_error(
                bucket,
                prefix,
                format!("no such bucket directory: {}", bucket_dir.display()),
            ));
        }
        debug!("Listing local bucket {}", bucket_dir.display());

        let walker = WalkBuilder::new(&bucket_dir)
            .standard_filters(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut objects = Vec::new();
        for entry in walker {
            let entry =
                entry.map_err(|e| SearchError::list_error(bucket, prefix, e.to_string()))?;
            if !entry
                .file_type()
                .is_some_and(|ft| ft.is_file() || ft.is_symlink())
            {
                continue;
            }
            let Some(key) = Self::key_for(&bucket_dir, entry.path()) else {
                warn!("Skipping {}: not a valid UTF-8 key", entry.path().display());
                continue;
            };
            if key.starts_with(prefix) {
                trace!("Listed {}", key);
                objects.push(ObjectRef::new(key));
            }
        }
        Ok(objects)
    }

    async fn fetch(&self, bucket: &str, object: &ObjectRef) -> SearchResult<ObjectBody> {
        if !object.has_key() {
            return Err(SearchError::MissingKey);
        }

        let relative = Path::new(object.key());
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(SearchError::fetch_error(
                object.key(),
                "key escapes the bucket directory",
            ));
        }

        let path = self.bucket_dir(bucket).join(relative);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| SearchError::fetch_error(object.key(), e.to_string()))?;
        Ok(ObjectBody::new(bytes))
    }
}
