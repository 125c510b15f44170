use axum::extract::{Path, State};
use axum::response::Json;
use gpa_types::Episode;
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Liveness probe.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "GP Archive API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Info handler.
pub async fn info_handler() -> Json<Value> {
    Json(json!({
        "name": "gpa-server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "episodes": "/api/episodes",
            "episode": "/api/episodes/{name}",
            "audio": "/audio/{key}",
            "health": "/health",
        },
    }))
}

/// All episodes, newest first.
pub async fn list_episodes(State(state): State<AppState>) -> ServerResult<Json<Vec<Episode>>> {
    Ok(Json(episodes(&state).await?))
}

pub async fn get_episode(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<Json<Episode>> {
    episodes(&state)
        .await?
        .into_iter()
        .find(|ep| ep.name == name)
        .map(Json)
        .ok_or(ServerError::NotFound(name))
}

async fn episodes(state: &AppState) -> ServerResult<Vec<Episode>> {
    let settings = &state.settings;
    let mut episodes: Vec<Episode> = state
        .store
        .list("")
        .await?
        .iter()
        .filter(|meta| meta.key.as_str().ends_with(settings.episode_extension.as_str()))
        .map(|meta| Episode::from_meta(meta, settings.episode_source.as_str()))
        .collect();
    episodes.sort_by(Episode::newest_first);
    Ok(episodes)
}
