//! Stream URL resolution for GP Archive.
//!
//! Given a program's public page URL, the [`StreamResolver`] walks an
//! ordered chain of extraction strategies, from the page framework's own
//! structured data down to plain pattern matching over the markup, and
//! returns the first absolute audio or HLS URL it finds. The page format
//! is undocumented and changes without notice, so every strategy is
//! allowed to fail independently.
//!
//! Companion pieces:
//!
//! - [`playlist`] -- HLS master playlist variant selection
//! - [`program`] -- best-effort program metadata (title, synopsis, duration)
//! - [`archive`] -- download of a resolved stream into the local archive

pub mod archive;
pub mod config;
pub mod error;
pub mod fetch;
pub mod markup;
pub mod playlist;
pub mod program;
pub mod resolver;
pub mod search;

pub use archive::{ArchivedShow, Archiver, DownloadOutcome, Transcoder};
pub use config::ResolverConfig;
pub use error::{ResolverError, ResolverResult};
pub use fetch::{HttpFetcher, PageFetcher, SnapshotFetcher};
pub use playlist::{select_best_variant, Variant};
pub use program::ProgramInfo;
pub use resolver::StreamResolver;
pub use search::{find_media_url, MAX_SEARCH_DEPTH};
