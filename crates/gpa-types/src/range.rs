use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RangeError;

/// A satisfiable, inclusive byte span within an object of known size.
///
/// A `ByteRange` can only be built through [`ByteRange::parse`] or
/// [`ByteRange::full`], both of which guarantee `start <= end < size`.
/// Out-of-bounds requests are rejected rather than clamped so that a bad
/// seek surfaces as an error instead of silently returning other bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawByteRange")]
pub struct ByteRange {
    /// First byte offset (inclusive).
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// The range covering an entire non-empty object.
    ///
    /// Returns `None` for a zero-length object, which has no satisfiable range.
    pub fn full(size: u64) -> Option<Self> {
        (size > 0).then(|| Self { start: 0, end: size - 1 })
    }

    /// Parse a `Range` header value against an object of `size` bytes.
    ///
    /// Accepts `bytes=<start>-<end>`, `bytes=<start>-` (end defaults to
    /// `size - 1`) and the suffix form `bytes=-<len>`.
    pub fn parse(header: &str, size: u64) -> Result<Self, RangeError> {
        let (unit, spec) = header
            .trim()
            .split_once('=')
            .ok_or(RangeError::Malformed)?;
        if !unit.trim().eq_ignore_ascii_case("bytes") {
            return Err(RangeError::UnsupportedUnit);
        }
        if spec.contains(',') {
            return Err(RangeError::MultipleRanges);
        }
        let (first, last) = spec.trim().split_once('-').ok_or(RangeError::Malformed)?;
        let (first, last) = (first.trim(), last.trim());

        if first.is_empty() {
            let suffix = parse_offset(last)?;
            if suffix == 0 {
                return Err(RangeError::EmptySuffix);
            }
            if suffix > size {
                return Err(RangeError::OutOfBounds { start: 0, end: suffix - 1, size });
            }
            return Ok(Self { start: size - suffix, end: size - 1 });
        }

        let start = parse_offset(first)?;
        let end = if last.is_empty() {
            if size == 0 {
                return Err(RangeError::OutOfBounds { start, end: start, size });
            }
            size - 1
        } else {
            parse_offset(last)?
        };

        if start > end {
            return Err(RangeError::StartAfterEnd { start, end });
        }
        if start >= size || end >= size {
            return Err(RangeError::OutOfBounds { start, end, size });
        }
        Ok(Self { start, end })
    }

    /// Number of bytes covered by this range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// A satisfiable range is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value for a partial response.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }

    /// `Content-Range` header value for a 416 response.
    pub fn unsatisfied_content_range(size: u64) -> String {
        format!("bytes */{size}")
    }

    /// Returns `true` if this range spans the whole object.
    pub fn is_full(&self, size: u64) -> bool {
        self.start == 0 && self.end + 1 == size
    }
}

/// Wire form of a [`ByteRange`], checked on the way in.
#[derive(Deserialize)]
struct RawByteRange {
    start: u64,
    end: u64,
}

impl TryFrom<RawByteRange> for ByteRange {
    type Error = RangeError;

    fn try_from(raw: RawByteRange) -> Result<Self, Self::Error> {
        if raw.start > raw.end {
            return Err(RangeError::StartAfterEnd { start: raw.start, end: raw.end });
        }
        Ok(Self { start: raw.start, end: raw.end })
    }
}

fn parse_offset(s: &str) -> Result<u64, RangeError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::Malformed);
    }
    s.parse().map_err(|_| RangeError::Malformed)
}

impl fmt::Debug for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteRange({}..={})", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
