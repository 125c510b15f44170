use gpa_types::ProgramId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("not a program page url: {0}")]
    InvalidProgramUrl(String),

    #[error("fetch of {url} failed: {reason}")]
    UpstreamFetchFailed { url: String, reason: String },

    #[error("parse failed: {0}")]
    ParseFailed(String),

    #[error("no audio stream found for program {0}")]
    StreamNotFound(ProgramId),

    #[error("no suitable stream in playlist {0}")]
    NoSuitableStream(String),

    #[error("filename must name a file inside the archive: {0:?}")]
    InvalidFilename(String),

    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolverError {
    pub(crate) fn fetch(url: &str, reason: impl ToString) -> Self {
        Self::UpstreamFetchFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ResolverResult<T> = Result<T, ResolverError>;
