use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use gpa_types::{ByteRange, ObjectKey, ObjectMeta};

use crate::error::StoreResult;

/// Incrementally consumed object payload.
pub type ByteStream = BoxStream<'static, StoreResult<Bytes>>;

/// The result of a GET: metadata plus a body stream for the requested span.
pub struct ObjectBody {
    pub meta: ObjectMeta,
    /// The span being streamed, `None` when the whole object is returned.
    pub range: Option<ByteRange>,
    /// Exact number of bytes `stream` will yield.
    pub content_length: u64,
    pub stream: ByteStream,
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBody")
            .field("key", &self.meta.key)
            .field("range", &self.range)
            .field("content_length", &self.content_length)
            .finish()
    }
}

/// Key-addressed, read-mostly object store.
///
/// All implementations must satisfy these invariants:
/// - `get` with a range yields exactly `range.len()` bytes.
/// - `get` never buffers the whole object before slicing it.
/// - A range that does not fit the object at read time is rejected with
///   `StoreError::RangeNotSatisfiable`, never clamped.
/// - Concurrent reads are always safe.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Look up object metadata.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    async fn head(&self, key: &ObjectKey) -> StoreResult<Option<ObjectMeta>>;

    /// Open an object for reading, optionally restricted to `range`.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    async fn get(&self, key: &ObjectKey, range: Option<ByteRange>) -> StoreResult<Option<ObjectBody>>;

    /// List objects whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>>;

    /// Check whether an object exists in the store.
    async fn exists(&self, key: &ObjectKey) -> StoreResult<bool> {
        Ok(self.head(key).await?.is_some())
    }
}
