use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use super::{ObjectBody, ObjectClient, ObjectRef};
use crate::errors::{SearchError, SearchResult};

/// In-memory [`ObjectClient`].
///
/// Objects are kept per bucket in key order, so listing is deterministic.
/// Individual keys can be made to fail on fetch, and listing can be made to
/// fail as a whole, to exercise the error paths of a search.
///
/// ```rust,ignore
/// let client = MemoryObjectClient::new();
/// client.put("bucket", "notes.txt", "hello\nworld\n");
/// client.fail_fetch("bucket", "broken.txt");
/// ```
#[derive(Debug, Default)]
pub struct MemoryObjectClient {
    buckets: RwLock<HashMap<String, BTreeMap<String, Bytes>>>,
    failing: RwLock<HashSet<(String, String)>>,
    fail_list: AtomicBool,
}

impl MemoryObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores (or replaces) an object
    pub fn put(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.buckets
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data.into());
    }

    /// Makes every fetch of `key` fail. The key is listed even if it was never stored.
    pub fn fail_fetch(&self, bucket: &str, key: &str) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((bucket.to_string(), key.to_string()));
        self.buckets
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(bucket.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();
    }

    /// Makes every subsequent listing fail
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    async fn list(&self, bucket: &str, prefix: &str) -> SearchResult<Vec<ObjectRef>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(SearchError::list_error(bucket, prefix, "listing disabled"));
        }
        let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
        let Some(objects) = buckets.get(bucket) else {
            return Err(SearchError::list_error(bucket, prefix, "no such bucket"));
        };
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .map(|key| ObjectRef::new(key.as_str()))
            .collect())
    }

    async fn fetch(&self, bucket: &str, object: &ObjectRef) -> SearchResult<ObjectBody> {
        if !object.has_key() {
            return Err(SearchError::MissingKey);
        }
        let failing = self
            .failing
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&(bucket.to_string(), object.key().to_string()));
        if failing {
            return Err(SearchError::fetch_error(object.key(), "access denied"));
        }

        self.buckets
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(bucket)
            .and_then(|objects| objects.get(object.key()))
            .map(|data| ObjectBody::new(data.clone()))
            .ok_or_else(|| SearchError::fetch_error(object.key(), "no such key"))
    }
}
