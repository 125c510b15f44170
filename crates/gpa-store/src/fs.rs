use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use gpa_types::{ByteRange, ObjectKey, ObjectMeta};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ObjectBody, ObjectStore};
use crate::STREAM_CHUNK_SIZE;

/// Object store backed by a directory on local disk.
///
/// Each key maps to the file at `root/<key>`; `/` in a key becomes a
/// subdirectory. Bodies are read straight from the file handle in
/// [`STREAM_CHUNK_SIZE`] chunks, so dropping the stream closes the file
/// and stops the read.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &ObjectKey) -> PathBuf {
        key.segments().fold(self.root.clone(), |path, seg| path.join(seg))
    }

    /// Copy a local file into the store under `key`, returning its metadata.
    pub async fn import(&self, source: &Path, key: &ObjectKey) -> StoreResult<ObjectMeta> {
        let dest = self.path_for(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let copied = tokio::fs::copy(source, &dest).await?;
        debug!(key = %key, bytes = copied, "imported object");
        self.head(key)
            .await?
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }
}

fn meta_from_fs(key: ObjectKey, md: &std::fs::Metadata) -> ObjectMeta {
    let modified: DateTime<Utc> = md
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::from(std::time::UNIX_EPOCH));
    let size = md.len();
    ObjectMeta::new(key, size, modified)
        .with_etag(format!("\"{:x}-{:x}\"", size, modified.timestamp()))
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn head(&self, key: &ObjectKey) -> StoreResult<Option<ObjectMeta>> {
        match tokio::fs::metadata(self.path_for(key)).await {
            Ok(md) if md.is_file() => Ok(Some(meta_from_fs(key.clone(), &md))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, key: &ObjectKey, range: Option<ByteRange>) -> StoreResult<Option<ObjectBody>> {
        let mut file = match tokio::fs::File::open(self.path_for(key)).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let md = file.metadata().await?;
        if !md.is_file() {
            return Ok(None);
        }
        let meta = meta_from_fs(key.clone(), &md);

        let (offset, content_length) = match range {
            Some(r) if r.end >= meta.size => {
                return Err(StoreError::RangeNotSatisfiable { key: key.clone(), size: meta.size });
            }
            Some(r) => (r.start, r.len()),
            None => (0, meta.size),
        };
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }

        let reader = file.take(content_length);
        let stream = ReaderStream::with_capacity(reader, STREAM_CHUNK_SIZE)
            .map_err(StoreError::from)
            .boxed();

        Ok(Some(ObjectBody {
            meta,
            range,
            content_length,
            stream,
        }))
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>> {
        let root = self.root.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || walk(&root, &prefix))
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?
    }
}

fn walk(root: &Path, prefix: &str) -> StoreResult<Vec<ObjectMeta>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut metas = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let raw: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let raw = raw.join("/");
        if !raw.starts_with(prefix) {
            continue;
        }
        match ObjectKey::new(raw) {
            Ok(key) => {
                let md = entry.metadata().map_err(|e| StoreError::Io(e.into()))?;
                metas.push(meta_from_fs(key, &md));
            }
            Err(e) => warn!("skipping unaddressable file {:?}: {}", entry.path(), e),
        }
    }
    metas.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(metas)
}
