use std::sync::Arc;

use gpa_store::ObjectStore;

use crate::config::ServerConfig;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub settings: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>, settings: ServerConfig) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
        }
    }
}
