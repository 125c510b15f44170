//! HLS master playlist variant selection.

use std::collections::HashMap;

use crate::error::{ResolverError, ResolverResult};

const STREAM_INF: &str = "#EXT-X-STREAM-INF:";

/// One variant stream of a master playlist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    /// Declared peak bit rate; `0` when the attribute is missing or malformed.
    pub bandwidth: u64,
    /// The URI line as written in the playlist.
    pub uri: String,
}

/// Variants in playlist order.
///
/// A `#EXT-X-STREAM-INF` tag without a following URI line is skipped.
pub fn variants(text: &str) -> Vec<Variant> {
    let mut out = Vec::new();
    let mut lines = text.lines().map(str::trim).peekable();
    while let Some(line) = lines.next() {
        let Some(attrs) = line.strip_prefix(STREAM_INF) else {
            continue;
        };
        let bandwidth = parse_attributes(attrs)
            .get("BANDWIDTH")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let uri = match lines.peek() {
            Some(uri) if !uri.is_empty() && !uri.starts_with('#') => uri.to_string(),
            _ => continue,
        };
        lines.next();
        out.push(Variant { bandwidth, uri });
    }
    out
}

/// Pick the highest-bandwidth variant and return its absolute URL.
///
/// Ties keep the variant listed first. Variants without a positive
/// `BANDWIDTH` are never chosen.
pub fn select_best_variant(text: &str, playlist_url: &str) -> ResolverResult<String> {
    let mut best: Option<Variant> = None;
    for variant in variants(text) {
        if variant.bandwidth > best.as_ref().map_or(0, |b| b.bandwidth) {
            best = Some(variant);
        }
    }
    best.map(|v| resolve_uri(playlist_url, &v.uri))
        .ok_or_else(|| ResolverError::NoSuitableStream(playlist_url.to_string()))
}

/// Join a variant URI to the directory of the playlist URL.
///
/// Root-relative URIs are appended to the directory rather than the
/// origin; the CDN serves variant paths relative to the master.
pub fn resolve_uri(playlist_url: &str, uri: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return uri.to_string();
    }
    let dir = playlist_url.rsplit_once('/').map_or("", |(dir, _)| dir);
    if uri.starts_with('/') {
        format!("{dir}{uri}")
    } else {
        format!("{dir}/{uri}")
    }
}

/// Parse an attribute list; quoted values may contain commas.
fn parse_attributes(list: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    let mut chars = list.chars().peekable();

    while chars.peek().is_some() {
        let key: String = chars.by_ref().take_while(|&c| c != '=').collect();
        if key.trim().is_empty() {
            break;
        }
        let value: String = if chars.peek() == Some(&'"') {
            chars.next();
            let v = chars.by_ref().take_while(|&c| c != '"').collect();
            // trailing comma
            chars.next();
            v
        } else {
            chars.by_ref().take_while(|&c| c != ',').collect()
        };
        attrs.insert(key.trim().to_string(), value.trim().to_string());
    }

    attrs
}
