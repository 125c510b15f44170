use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use gpa_types::{ByteRange, ObjectKey, ObjectMeta};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ObjectBody, ObjectStore};
use crate::STREAM_CHUNK_SIZE;

struct Entry {
    meta: ObjectMeta,
    data: Bytes,
}

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Payloads are held as [`Bytes`], so
/// ranged reads slice the buffer without copying.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectKey, Entry>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Store an object modified now, replacing any previous object with the same key.
    pub fn insert(&self, key: ObjectKey, data: impl Into<Bytes>) -> ObjectMeta {
        self.insert_at(key, data, Utc::now())
    }

    /// Store an object with an explicit modification time.
    pub fn insert_at(&self, key: ObjectKey, data: impl Into<Bytes>, modified: DateTime<Utc>) -> ObjectMeta {
        let data = data.into();
        let size = data.len() as u64;
        let meta = ObjectMeta::new(key.clone(), size, modified)
            .with_etag(format!("\"{:x}-{:x}\"", size, modified.timestamp()));
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert(key, Entry { meta: meta.clone(), data });
        meta
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn head(&self, key: &ObjectKey) -> StoreResult<Option<ObjectMeta>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(key).map(|entry| entry.meta.clone()))
    }

    async fn get(&self, key: &ObjectKey, range: Option<ByteRange>) -> StoreResult<Option<ObjectBody>> {
        let (meta, data) = {
            let map = self.objects.read().expect("lock poisoned");
            match map.get(key) {
                Some(entry) => (entry.meta.clone(), entry.data.clone()),
                None => return Ok(None),
            }
        };

        let slice = match range {
            Some(r) if r.end >= meta.size => {
                return Err(StoreError::RangeNotSatisfiable { key: key.clone(), size: meta.size });
            }
            Some(r) => data.slice(r.start as usize..=r.end as usize),
            None => data,
        };

        let content_length = slice.len() as u64;
        let chunks: Vec<StoreResult<Bytes>> = (0..slice.len())
            .step_by(STREAM_CHUNK_SIZE)
            .map(|offset| Ok(slice.slice(offset..slice.len().min(offset + STREAM_CHUNK_SIZE))))
            .collect();

        Ok(Some(ObjectBody {
            meta,
            range,
            content_length,
            stream: stream::iter(chunks).boxed(),
        }))
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>> {
        let map = self.objects.read().expect("lock poisoned");
        let mut metas: Vec<ObjectMeta> = map
            .values()
            .filter(|entry| entry.meta.key.as_str().starts_with(prefix))
            .map(|entry| entry.meta.clone())
            .collect();
        metas.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(metas)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn key(s: &str) -> ObjectKey {
        ObjectKey::new(s).unwrap()
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    async fn collect(body: ObjectBody) -> Vec<u8> {
        let chunks: Vec<Bytes> = body.stream.try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn head_reports_size_and_type() {
        let store = InMemoryObjectStore::new();
        store.insert(key("show.mp3"), payload(1000));
        let meta = store.head(&key("show.mp3")).await.unwrap().expect("should exist");
        assert_eq!(meta.size, 1000);
        assert_eq!(meta.content_type, "audio/mpeg");
        assert!(meta.etag.is_some());
    }

    #[tokio::test]
    async fn missing_objects() {
        let store = InMemoryObjectStore::new();
        assert!(store.head(&key("nope.mp3")).await.unwrap().is_none());
        assert!(store.get(&key("nope.mp3"), None).await.unwrap().is_none());
        assert!(!store.exists(&key("nope.mp3")).await.unwrap());
    }

    #[tokio::test]
    async fn full_read_returns_everything() {
        let store = InMemoryObjectStore::new();
        let data = payload(STREAM_CHUNK_SIZE * 2 + 17);
        store.insert(key("big.mp3"), data.clone());
        let body = store.get(&key("big.mp3"), None).await.unwrap().unwrap();
        assert_eq!(body.content_length, data.len() as u64);
        assert!(body.range.is_none());
        assert_eq!(collect(body).await, data);
    }

    #[tokio::test]
    async fn ranged_read_returns_exact_span() {
        let store = InMemoryObjectStore::new();
        let data = payload(1000);
        store.insert(key("show.mp3"), data.clone());
        let range = ByteRange::parse("bytes=200-299", 1000).unwrap();
        let body = store.get(&key("show.mp3"), Some(range)).await.unwrap().unwrap();
        assert_eq!(body.content_length, 100);
        assert_eq!(collect(body).await, &data[200..300]);
    }

    #[tokio::test]
    async fn stale_range_is_rejected() {
        let store = InMemoryObjectStore::new();
        let range = ByteRange::parse("bytes=0-99", 1000).unwrap();
        store.insert(key("show.mp3"), payload(50));
        let err = store.get(&key("show.mp3"), Some(range)).await.unwrap_err();
        assert!(matches!(err, StoreError::RangeNotSatisfiable { size: 50, .. }));
    }

    #[tokio::test]
    async fn list_filters_by_prefix_and_sorts() {
        let store = InMemoryObjectStore::new();
        store.insert(key("b.mp3"), payload(1));
        store.insert(key("a.mp3"), payload(2));
        store.insert(key("other/c.mp3"), payload(3));
        let all = store.list("").await.unwrap();
        let keys: Vec<_> = all.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, ["a.mp3", "b.mp3", "other/c.mp3"]);
        assert_eq!(store.list("other/").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insert_replaces_existing() {
        let store = InMemoryObjectStore::new();
        store.insert(key("a.mp3"), payload(1));
        store.insert(key("a.mp3"), payload(5));
        assert_eq!(store.len(), 1);
        assert_eq!(store.head(&key("a.mp3")).await.unwrap().unwrap().size, 5);
    }
}
