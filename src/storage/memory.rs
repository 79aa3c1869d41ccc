//! In-process object store.
//!
//! [`MemoryStore`] keeps objects in a map and issues `memory://` URLs that
//! [`MemoryStore::get`] resolves again. It lets tests (and local runs
//! without MinIO) exercise the whole pipeline deterministically.
//!
//! # Example
//!
//! ```
//! use message_relay::storage::MemoryStore;
//!
//! let store = MemoryStore::new("images");
//! assert_eq!(store.object_count(), 0);
//! ```

use super::ObjectStore;
use crate::error::{Failure, Outcome};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const SCHEME: &str = "memory://";

/// An object held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// A test store that keeps everything in memory.
#[derive(Debug)]
pub struct MemoryStore {
    bucket: String,
    objects: Mutex<HashMap<String, StoredObject>>,
    bucket_ready: AtomicBool,
    failure: Option<Failure>,
    calls: AtomicUsize,
}

impl MemoryStore {
    /// Empty store for `bucket`.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(HashMap::new()),
            bucket_ready: AtomicBool::new(false),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A store whose every operation fails with `failure`.
    pub fn failing(bucket: impl Into<String>, failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(bucket)
        }
    }

    /// Look up an object by key or by a URL this store issued.
    pub fn get(&self, key_or_url: &str) -> Option<StoredObject> {
        let key = self.key_from(key_or_url);
        self.objects.lock().ok()?.get(key).cloned()
    }

    /// Number of stored objects.
    pub fn object_count(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    /// Number of `put_object` / `presigned_get` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Whether `ensure_bucket` has run successfully.
    pub fn bucket_ready(&self) -> bool {
        self.bucket_ready.load(Ordering::Relaxed)
    }

    fn key_from<'a>(&self, key_or_url: &'a str) -> &'a str {
        let Some(rest) = key_or_url.strip_prefix(SCHEME) else {
            return key_or_url;
        };
        let rest = rest.split('?').next().unwrap_or(rest);
        rest.strip_prefix(self.bucket.as_str())
            .and_then(|r| r.strip_prefix('/'))
            .unwrap_or(rest)
    }

    fn check(&self) -> Outcome<()> {
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    fn poisoned() -> Failure {
        Failure::unknown("Memory store lock poisoned")
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn ensure_bucket(&self) -> Outcome<()> {
        self.check()?;
        self.bucket_ready.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Outcome<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.check()?;
        let mut objects = self.objects.lock().map_err(|_| Self::poisoned())?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn presigned_get(&self, key: &str, ttl: Duration) -> Outcome<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.check()?;
        let objects = self.objects.lock().map_err(|_| Self::poisoned())?;
        if !objects.contains_key(key) {
            return Err(Failure::new(
                crate::error::ErrorKind::NotFound,
                format!("Object does not exist: {key}"),
            ));
        }
        Ok(format!(
            "{SCHEME}{}/{key}?expires={}",
            self.bucket,
            ttl.as_secs()
        ))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
