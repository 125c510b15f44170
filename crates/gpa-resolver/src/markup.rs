//! Extraction from raw program page markup.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{ResolverError, ResolverResult};

static BUILD_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""buildId":"([^"]+)""#).expect("valid build id pattern"));

const INITIAL_STATE_MARKER: &str = "window.__INITIAL_STATE__";

/// Last-resort patterns, in priority order. The first pattern matching
/// anywhere in the document wins, regardless of where later patterns match.
static MARKUP_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("hls-url", r#""hlsUrl":"([^"]+)""#),
        ("stream-url", r#""streamUrl":"([^"]+)""#),
        ("audio-url", r#""audioUrl":"([^"]+)""#),
        ("src-m4a", r#""src":"([^"]+\.m4a[^"]*)""#),
        ("src-mp3", r#""src":"([^"]+\.mp3[^"]*)""#),
        ("data-media-url", r#"data-media-url="([^"]+)""#),
        ("content-url", r#""contentUrl":"([^"]+)""#),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid markup pattern")))
    .collect()
});

/// The client framework's build identifier embedded in the page.
pub fn extract_build_id(html: &str) -> Option<&str> {
    BUILD_ID
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Decode the `window.__INITIAL_STATE__ = {...}` assignment, if present.
///
/// Only the first complete JSON value after the `=` is decoded; whatever
/// script follows it is ignored.
pub fn extract_initial_state(html: &str) -> ResolverResult<Option<Value>> {
    let Some(at) = html.find(INITIAL_STATE_MARKER) else {
        return Ok(None);
    };
    let rest = html[at + INITIAL_STATE_MARKER.len()..].trim_start();
    let Some(rest) = rest.strip_prefix('=') else {
        return Ok(None);
    };
    let mut values = serde_json::Deserializer::from_str(rest.trim_start()).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) => Ok(Some(value)),
        Some(Err(e)) => Err(ResolverError::ParseFailed(format!("initial state: {e}"))),
        None => Ok(None),
    }
}

/// Scan the markup with the fixed pattern list, returning the unescaped capture.
pub fn scan_markup(html: &str) -> Option<(&'static str, String)> {
    MARKUP_PATTERNS.iter().find_map(|(name, re)| {
        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| (*name, unescape(m.as_str())))
    })
}

/// Undo JSON string escaping of slashes as embedded in script blocks.
pub fn unescape(raw: &str) -> String {
    raw.replace("\\u002F", "/")
        .replace("\\u002f", "/")
        .replace('\\', "")
}

/// Make a URL absolute: `//host/..` gets `https:`, `/path` gets `origin`.
pub fn canonicalize(url: &str, origin: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else if url.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), url)
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_id_extraction() {
        let html = r#"<script id="__NEXT_DATA__">{"props":{},"buildId":"aB3-x_9","isFallback":false}</script>"#;
        assert_eq!(extract_build_id(html), Some("aB3-x_9"));
        assert_eq!(extract_build_id("<html></html>"), None);
    }

    #[test]
    fn initial_state_decodes_first_value_only() {
        let html = r#"<script>window.__INITIAL_STATE__ = {"player":{"src":"https://a/x.mp3"}}; window.other = {};</script>"#;
        let state = extract_initial_state(html).unwrap().unwrap();
        assert_eq!(state["player"]["src"], "https://a/x.mp3");
    }

    #[test]
    fn initial_state_absent_or_broken() {
        assert!(extract_initial_state("<html></html>").unwrap().is_none());
        assert!(extract_initial_state("window.__INITIAL_STATE__").unwrap().is_none());
        assert!(matches!(
            extract_initial_state("window.__INITIAL_STATE__ = {\"a\": tru"),
            Err(ResolverError::ParseFailed(_))
        ));
    }

    #[test]
    fn patterns_follow_priority_not_position() {
        let html = r#"{"contentUrl":"https://first/x.mp3"} ... {"streamUrl":"https://second/live"}"#;
        assert_eq!(scan_markup(html), Some(("stream-url", "https://second/live".into())));
    }

    #[test]
    fn src_patterns_need_audio_extension() {
        let html = r#"{"src":"https://cdn/img.png"},{"src":"https:\/\/cdn\/a.mp3?x=1"}"#;
        assert_eq!(scan_markup(html), Some(("src-mp3", "https://cdn/a.mp3?x=1".into())));
    }

    #[test]
    fn data_attribute_pattern() {
        let html = r#"<div data-media-url="//media.example/ep.m4a"></div>"#;
        assert_eq!(scan_markup(html), Some(("data-media-url", "//media.example/ep.m4a".into())));
        assert_eq!(scan_markup("<p>nothing here</p>"), None);
    }

    #[test]
    fn unescapes_json_slashes() {
        assert_eq!(unescape(r"https://a/b.m3u8"), "https://a/b.m3u8");
        assert_eq!(unescape(r"https:\/\/a\/b.mp3"), "https://a/b.mp3");
    }

    #[test]
    fn canonicalizes_relative_urls() {
        assert_eq!(canonicalize("//cdn/a.mp3", "https://www.bbc.com"), "https://cdn/a.mp3");
        assert_eq!(canonicalize("/audio/a.mp3", "https://www.bbc.com/"), "https://www.bbc.com/audio/a.mp3");
        assert_eq!(canonicalize("https://x/a.mp3", "https://www.bbc.com"), "https://x/a.mp3");
    }
}
