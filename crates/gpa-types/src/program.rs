use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

static PROGRAM_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/play/([a-zA-Z0-9]+)").expect("valid program id pattern"));

/// Identifier of a program, taken from its `.../play/{id}` page URL.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramId(String);

impl ProgramId {
    /// Extract the program id from a program page URL.
    pub fn from_url(url: &str) -> Result<Self, TypeError> {
        PROGRAM_ID
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| Self(m.as_str().to_string()))
            .ok_or_else(|| TypeError::InvalidProgramUrl(url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramId({})", self.0)
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which extraction strategy produced a resolved URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// The page framework's per-build JSON data endpoint.
    NextData,
    /// The `window.__INITIAL_STATE__` blob embedded in the page.
    InitialState,
    /// Regular-expression scan over the raw markup.
    MarkupPattern,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NextData => write!(f, "next-data"),
            Self::InitialState => write!(f, "initial-state"),
            Self::MarkupPattern => write!(f, "markup-pattern"),
        }
    }
}

/// A playable stream URL located for a program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStream {
    /// Absolute URL of the audio stream or HLS playlist.
    pub url: String,
    pub program_id: ProgramId,
    pub strategy: ResolutionStrategy,
}

impl ResolvedStream {
    /// Returns `true` if the URL points at an HLS playlist.
    pub fn is_hls(&self) -> bool {
        self.url.contains(".m3u8")
    }
}
