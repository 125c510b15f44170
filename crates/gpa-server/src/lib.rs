//! HTTP gateway for GP Archive.
//!
//! Streams archived episodes out of an object store with byte-range
//! support so players can seek, lists the episodes, and serves the
//! player's static files. Streaming stays public; everything else can be
//! put behind HTTP basic auth.

pub mod audio;
pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{AllowAllAuth, AuthProvider, BasicAuth, Credentials, Identity};
pub use config::{BasicAuthConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::ArchiveServer;
pub use state::AppState;
