use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("unsatisfiable range: {0}")]
    InvalidRange(#[from] RangeError),

    #[error("no program id in url: {0}")]
    InvalidProgramUrl(String),
}

/// Why a `Range` header could not be satisfied.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    #[error("unsupported range unit")]
    UnsupportedUnit,

    #[error("multiple ranges are not supported")]
    MultipleRanges,

    #[error("range bounds are not numeric")]
    Malformed,

    #[error("start {start} is past end {end}")]
    StartAfterEnd { start: u64, end: u64 },

    #[error("range {start}-{end} exceeds object size {size}")]
    OutOfBounds { start: u64, end: u64, size: u64 },

    #[error("empty suffix range")]
    EmptySuffix,
}
