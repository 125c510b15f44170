use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object::ObjectMeta;

/// One entry of the episode listing served to the player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Object key, which is also the display filename.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Upload time, serialized as ISO-8601.
    pub modified: DateTime<Utc>,
    /// Gateway URL that streams the episode.
    pub url: String,
    /// Name of the backing store.
    pub source: String,
}

impl Episode {
    pub fn from_meta(meta: &ObjectMeta, source: impl Into<String>) -> Self {
        Self {
            name: meta.key.to_string(),
            size: meta.size,
            modified: meta.last_modified,
            url: meta.key.audio_path(),
            source: source.into(),
        }
    }

    /// Listing order: newest upload first, ties broken by name descending.
    pub fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKey;
    use chrono::TimeZone;

    fn meta(key: &str, secs: i64) -> ObjectMeta {
        ObjectMeta::new(
            ObjectKey::new(key).unwrap(),
            42,
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
    }

    #[test]
    fn from_meta_builds_gateway_url() {
        let ep = Episode::from_meta(&meta("2026-01-10 Gilles Peterson.mp3", 0), "r2");
        assert_eq!(ep.url, "/audio/2026-01-10%20Gilles%20Peterson.mp3");
        assert_eq!(ep.size, 42);
        assert_eq!(ep.source, "r2");
    }

    #[test]
    fn serializes_iso_timestamp() {
        let ep = Episode::from_meta(&meta("a.mp3", 1_700_000_000), "r2");
        let json = serde_json::to_value(&ep).unwrap();
        assert_eq!(json["modified"], "2023-11-14T22:13:20Z");
        assert_eq!(json["name"], "a.mp3");
    }

    #[test]
    fn sorts_newest_first_then_name() {
        let mut eps = vec![
            Episode::from_meta(&meta("a.mp3", 10), "r2"),
            Episode::from_meta(&meta("b.mp3", 30), "r2"),
            Episode::from_meta(&meta("c.mp3", 10), "r2"),
        ];
        eps.sort_by(Episode::newest_first);
        let names: Vec<_> = eps.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["b.mp3", "c.mp3", "a.mp3"]);
    }
}
