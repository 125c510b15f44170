use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Key of an object in the archive store.
///
/// The key doubles as the episode filename, so two uploads with the same
/// name collide. Keys may contain `/`-separated segments but never escape
/// the store root: absolute keys, `.`/`..` segments, empty segments,
/// backslashes, and NUL bytes are rejected.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validate and wrap a raw key.
    pub fn new(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        let reason = if key.is_empty() {
            Some("empty key")
        } else if key.starts_with('/') {
            Some("absolute key")
        } else if key.contains('\\') || key.contains('\0') {
            Some("forbidden character")
        } else if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            Some("invalid path segment")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(TypeError::InvalidKey { key, reason }),
            None => Ok(Self(key)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments of the key.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Lowercased extension of the final segment, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.0.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }

    /// URL path under which the gateway serves this object.
    pub fn audio_path(&self) -> String {
        format!("/audio/{}", urlencoding::encode(&self.0))
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectKey({:?})", self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> Self {
        key.0
    }
}

/// Metadata of a stored object, as returned by a HEAD or LIST.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub key: ObjectKey,
    /// Object size in bytes.
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub etag: Option<String>,
    pub content_type: String,
}

impl ObjectMeta {
    /// Metadata with the content type inferred from the key's extension.
    pub fn new(key: ObjectKey, size: u64, last_modified: DateTime<Utc>) -> Self {
        let content_type = content_type_for(&key).to_string();
        Self { key, size, last_modified, etag: None, content_type }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

/// MIME type for an object key, defaulting to `audio/mpeg`.
pub fn content_type_for(key: &ObjectKey) -> &'static str {
    match key.extension().as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("wav") => "audio/wav",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("json") => "application/json",
        _ => "audio/mpeg",
    }
}
