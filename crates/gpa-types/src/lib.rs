//! Foundation types for GP Archive.
//!
//! This crate provides the identifiers and value types shared by the
//! streaming gateway and the stream resolver. Every other `gpa-*` crate
//! depends on `gpa-types`.
//!
//! # Key Types
//!
//! - [`ObjectKey`]: Validated object-store key (doubles as the filename)
//! - [`ObjectMeta`]: Size, modification time, and content type of a stored object
//! - [`ByteRange`]: Satisfiable inclusive byte span parsed from a `Range` header
//! - [`Episode`]: Listing entry served to the player
//! - [`ProgramId`]: Program identifier extracted from a program page URL
//! - [`ResolvedStream`]: Output of stream resolution

pub mod episode;
pub mod error;
pub mod object;
pub mod program;
pub mod range;

pub use episode::Episode;
pub use error::{RangeError, TypeError};
pub use object::{content_type_for, ObjectKey, ObjectMeta};
pub use program::{ProgramId, ResolutionStrategy, ResolvedStream};
pub use range::ByteRange;
