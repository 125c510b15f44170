use std::sync::Arc;

use gpa_store::{FsObjectStore, ObjectStore};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::auth::{provider_for, AuthProvider};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// GP Archive gateway.
pub struct ArchiveServer {
    config: ServerConfig,
    store: Arc<dyn ObjectStore>,
    auth: Arc<dyn AuthProvider>,
}

impl ArchiveServer {
    /// Server over a filesystem store rooted at `config.archive_root`.
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(FsObjectStore::new(&config.archive_root));
        let auth = provider_for(config.auth.as_ref());
        Self { config, store, auth }
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        let state = AppState::new(Arc::clone(&self.store), self.config.clone());
        build_router(state, Arc::clone(&self.auth))
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            addr = %self.config.bind_addr,
            archive = %self.config.archive_root.display(),
            auth = self.config.auth.is_some(),
            "GP Archive gateway listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(e) => {
            warn!("cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = ArchiveServer::new(ServerConfig::default());
        assert_eq!(server.config().bind_addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn router_builds() {
        let server = ArchiveServer::new(ServerConfig::default());
        let _router = server.router();
    }
}
