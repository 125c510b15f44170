//! Depth-bounded search for media URLs in arbitrarily shaped player data.
//!
//! The payload schema is not documented and changes between deployments,
//! so the search makes no assumption about structure: it walks every key
//! of every object and every element of every array, in document order,
//! and returns the first string that looks like an absolute media URL.

use serde_json::{Map, Value};

/// Deepest container level inspected; the root is level 0.
pub const MAX_SEARCH_DEPTH: usize = 20;

const URL_MARKERS: [&str; 6] = [".m3u8", ".m4a", ".mp3", "hlsUrl", "stream", "media."];
const HREF_MARKERS: [&str; 3] = [".m3u8", ".m4a", ".mp3"];

/// Find the first media URL in `data`, depth-first.
pub fn find_media_url(data: &Value) -> Option<&str> {
    search(data, 0)
}

/// Returns `true` for absolute (or protocol-relative) URLs carrying a media marker.
pub fn is_media_url(s: &str) -> bool {
    (s.starts_with("http") || s.starts_with("//")) && URL_MARKERS.iter().any(|m| s.contains(m))
}

fn search(node: &Value, depth: usize) -> Option<&str> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match node {
        Value::Object(map) => media_href(map).or_else(|| map.values().find_map(|v| visit(v, depth))),
        Value::Array(items) => items.iter().find_map(|v| visit(v, depth)),
        _ => None,
    }
}

fn visit(value: &Value, depth: usize) -> Option<&str> {
    match value {
        Value::String(s) if is_media_url(s) => Some(s.as_str()),
        Value::Object(_) | Value::Array(_) => search(value, depth + 1),
        _ => None,
    }
}

// Link objects (`{"href": ...}`) are trusted on the file extension alone.
fn media_href(map: &Map<String, Value>) -> Option<&str> {
    match map.get("href") {
        Some(Value::String(href)) if HREF_MARKERS.iter().any(|m| href.contains(m)) => Some(href.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested(levels: usize, leaf: Value) -> Value {
        (0..levels).fold(leaf, |inner, _| json!({ "child": inner }))
    }

    #[test]
    fn finds_hls_url_in_page_props() {
        let data = json!({
            "pageProps": {
                "dehydratedState": {
                    "queries": [
                        { "state": { "data": { "title": "Gilles Peterson" } } },
                        { "state": { "data": { "url": "https://vod.example/pool/master.m3u8" } } }
                    ]
                }
            }
        });
        assert_eq!(find_media_url(&data), Some("https://vod.example/pool/master.m3u8"));
    }

    #[test]
    fn requires_absolute_or_protocol_relative() {
        assert!(is_media_url("https://a/x.mp3"));
        assert!(is_media_url("//cdn.example/live/stream"));
        assert!(is_media_url("http://media.example/x"));
        assert!(!is_media_url("/relative/x.mp3"));
        assert!(!is_media_url("https://example.com/page"));
    }

    #[test]
    fn href_objects_match_on_extension() {
        let data = json!({ "link": { "rel": "x", "href": "/audio/show.m4a" } });
        assert_eq!(find_media_url(&data), Some("/audio/show.m4a"));
        let data = json!({ "link": { "href": "/audio/page" } });
        assert_eq!(find_media_url(&data), None);
    }

    #[test]
    fn href_wins_over_sibling_strings() {
        let data = json!({ "a": "https://other/stream", "href": "https://cdn/x.mp3" });
        assert_eq!(find_media_url(&data), Some("https://cdn/x.mp3"));
    }

    #[test]
    fn document_order_decides_between_siblings() {
        let data = json!({
            "z": "https://first.example/a.mp3",
            "a": "https://second.example/b.mp3"
        });
        assert_eq!(find_media_url(&data), Some("https://first.example/a.mp3"));
    }

    #[test]
    fn depth_first_before_later_siblings() {
        let data = json!([
            { "deep": { "deeper": "https://deep.example/a.m3u8" } },
            "https://shallow.example/b.mp3"
        ]);
        assert_eq!(find_media_url(&data), Some("https://deep.example/a.m3u8"));
    }

    #[test]
    fn root_string_is_not_a_match() {
        assert_eq!(find_media_url(&json!("https://a/x.mp3")), None);
        assert_eq!(find_media_url(&json!(null)), None);
    }

    #[test]
    fn depth_cap_boundary() {
        let leaf = json!({ "url": "https://a/x.mp3" });
        assert_eq!(find_media_url(&nested(MAX_SEARCH_DEPTH, leaf.clone())), Some("https://a/x.mp3"));
        assert_eq!(find_media_url(&nested(MAX_SEARCH_DEPTH + 1, leaf)), None);
    }

    #[test]
    fn very_deep_structures_terminate() {
        let deep = nested(500, json!({ "url": "https://a/x.mp3" }));
        assert_eq!(find_media_url(&deep), None);

        let data = json!({
            "deep": nested(200, json!("https://a/x.mp3")),
            "shallow": { "url": "https://b/y.mp3" }
        });
        assert_eq!(find_media_url(&data), Some("https://b/y.mp3"));
    }

    #[test]
    fn repeated_search_is_stable() {
        let data = json!({ "a": [{ "b": "https://a/x.m4a" }], "c": "https://b/y.mp3" });
        let first = find_media_url(&data);
        for _ in 0..10 {
            assert_eq!(find_media_url(&data), first);
        }
    }
}
