use std::sync::Arc;

use axum::http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE};
use axum::http::Method;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::audio;
use crate::auth::{require_auth, AuthProvider};
use crate::handler;
use crate::state::AppState;

/// Build the gateway router.
///
/// Streaming and health are registered on a router that never sees the
/// auth layer; the API and the static player sit behind it.
pub fn build_router(state: AppState, auth: Arc<dyn AuthProvider>) -> Router {
    let public = Router::new()
        .route("/audio/*key", get(audio::audio_handler))
        .route("/health", get(handler::health_handler));

    let mut protected = Router::new()
        .route("/api/episodes", get(handler::list_episodes))
        .route("/api/episodes/*name", get(handler::get_episode))
        .route("/api/info", get(handler::info_handler));
    if let Some(root) = &state.settings.static_root {
        protected = protected.fallback_service(ServeDir::new(root));
    }
    let protected = protected.layer(from_fn_with_state(auth, require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([CONTENT_RANGE, CONTENT_LENGTH, ACCEPT_RANGES]);

    public
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
