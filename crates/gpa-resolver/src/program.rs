use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Title used when the page does not carry one.
pub const DEFAULT_TITLE: &str = "BBC Audio";

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid program info pattern")
}

static TITLE: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        re(r"<title>([^<]+)</title>"),
        re(r#""title":"([^"]+)""#),
        re(r#"data-title="([^"]+)""#),
    ]
});

static DESCRIPTION: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        re(r#"<meta name="description" content="([^"]+)""#),
        re(r#""synopsis":"([^"]+)""#),
    ]
});

static EPISODE: Lazy<[Regex; 2]> =
    Lazy::new(|| [re(r#""episode":"([^"]+)""#), re(r"(?i)Episode\s+(\d+)")]);

static DURATION_SECS: Lazy<Regex> = Lazy::new(|| re(r#""duration":(\d+)"#));

static DURATION_ISO: Lazy<Regex> = Lazy::new(|| re(r"PT(?:\d+H)?(?:\d+M)?(?:\d+S)?"));

/// Best-effort descriptive metadata scraped from a program page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramInfo {
    pub title: String,
    pub description: String,
    pub episode: String,
    /// Either a number of seconds or an ISO-8601 `PT..` duration, as found.
    pub duration: String,
    pub original_url: String,
}

impl ProgramInfo {
    /// The fallback used when the page could not be fetched.
    pub fn unknown(original_url: &str) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            original_url: original_url.to_string(),
            ..Default::default()
        }
    }

    /// Extract whatever the markup offers. Missing fields are left empty.
    pub fn from_html(html: &str, original_url: &str) -> Self {
        let title = first_capture(TITLE.iter(), html)
            .map(decode_entities)
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let description = first_capture(DESCRIPTION.iter(), html).unwrap_or_default();
        let episode = first_capture(EPISODE.iter(), html).unwrap_or_default();
        let duration = DURATION_SECS
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| iso_duration(html))
            .unwrap_or_default();

        Self {
            title,
            description,
            episode,
            duration,
            original_url: original_url.to_string(),
        }
    }
}

fn first_capture<'a>(mut patterns: impl Iterator<Item = &'a Regex>, html: &str) -> Option<String> {
    patterns.find_map(|p| p.captures(html)?.get(1).map(|m| m.as_str().to_string()))
}

// A bare `PT` (as in `SCRIPT`) carries no components and is not a duration.
fn iso_duration(html: &str) -> Option<String> {
    DURATION_ISO
        .find_iter(html)
        .map(|m| m.as_str())
        .find(|s| s.len() > 2)
        .map(str::to_string)
}

fn decode_entities(s: String) -> String {
    s.replace("&quot;", "\"").replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.bbc.com/audio/play/m002kqfg";

    #[test]
    fn full_page() {
        let html = r#"<html><head><title>Gilles Peterson &amp; Friends</title>
            <meta name="description" content="Two hours of new music.">
            <script>{"episode":"Jazz special","duration":7200}</script></head></html>"#;
        let info = ProgramInfo::from_html(html, URL);
        assert_eq!(info.title, "Gilles Peterson & Friends");
        assert_eq!(info.description, "Two hours of new music.");
        assert_eq!(info.episode, "Jazz special");
        assert_eq!(info.duration, "7200");
        assert_eq!(info.original_url, URL);
    }

    #[test]
    fn fallbacks_from_json_fields() {
        let html = r#"<div data-title="ignored">{"title":"Show &quot;Live&quot;","synopsis":"Sessions"} Episode 12</div>"#;
        let info = ProgramInfo::from_html(html, URL);
        assert_eq!(info.title, "Show \"Live\"");
        assert_eq!(info.description, "Sessions");
        assert_eq!(info.episode, "12");
    }

    #[test]
    fn iso_duration_skips_bare_marker() {
        let html = "<SCRIPT></SCRIPT><span>PT2H0M</span>";
        assert_eq!(ProgramInfo::from_html(html, URL).duration, "PT2H0M");
    }

    #[test]
    fn empty_page_uses_defaults() {
        let info = ProgramInfo::from_html("<html></html>", URL);
        assert_eq!(info, ProgramInfo::unknown(URL));
        assert_eq!(info.title, DEFAULT_TITLE);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(ProgramInfo::unknown(URL)).unwrap();
        assert_eq!(json["originalUrl"], URL);
    }
}
