//! Object storage for GP Archive.
//!
//! The archive is a flat, key-addressed collection of audio files. The
//! gateway only ever reads from it: metadata lookups, listings, and byte
//! range fetches that are consumed incrementally as a stream.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- a directory on local disk, one file per key
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written.
//! 2. A ranged read yields exactly the requested span and never loads the
//!    whole object into memory.
//! 3. Dropping a body stream aborts the underlying read.
//! 4. Ranges are re-validated against the size observed at read time.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use traits::{ByteStream, ObjectBody, ObjectStore};

/// Chunk size used when streaming object bodies.
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;
