//! `GET|HEAD /audio/{key}`: whole or ranged object bodies, streamed.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED, RANGE,
};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Response;
use chrono::{DateTime, Utc};
use gpa_types::{ByteRange, ObjectKey, ObjectMeta};
use tracing::debug;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

pub async fn audio_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let key = ObjectKey::new(key).map_err(|e| ServerError::NotFound(e.to_string()))?;
    let meta = state
        .store
        .head(&key)
        .await?
        .ok_or_else(|| ServerError::NotFound(key.to_string()))?;

    let range = match headers.get(RANGE) {
        Some(value) => {
            let parsed = value
                .to_str()
                .map_err(|_| gpa_types::RangeError::Malformed)
                .and_then(|v| ByteRange::parse(v, meta.size));
            match parsed {
                Ok(range) => Some(range),
                Err(reason) => {
                    debug!(key = %key, %reason, "rejecting range");
                    return Err(ServerError::RangeNotSatisfiable { size: meta.size });
                }
            }
        }
        None => None,
    };

    if method == Method::HEAD {
        let length = range.map_or(meta.size, |r| r.len());
        return respond(&meta, range, length, state.settings.cache_max_age_secs, Body::empty());
    }

    let body = state
        .store
        .get(&key, range)
        .await?
        .ok_or_else(|| ServerError::NotFound(key.to_string()))?;
    debug!(key = %key, bytes = body.content_length, ranged = range.is_some(), "streaming");
    respond(
        &body.meta,
        body.range,
        body.content_length,
        state.settings.cache_max_age_secs,
        Body::from_stream(body.stream),
    )
}

fn respond(
    meta: &ObjectMeta,
    range: Option<ByteRange>,
    content_length: u64,
    max_age: u64,
    body: Body,
) -> ServerResult<Response> {
    let status = if range.is_some() { StatusCode::PARTIAL_CONTENT } else { StatusCode::OK };
    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, meta.content_type.as_str())
        .header(CONTENT_LENGTH, content_length)
        .header(ACCEPT_RANGES, "bytes")
        .header(CACHE_CONTROL, format!("public, max-age={max_age}"))
        .header(LAST_MODIFIED, http_date(meta.last_modified));
    if let Some(etag) = &meta.etag {
        builder = builder.header(ETAG, etag.as_str());
    }
    if let Some(range) = range {
        builder = builder.header(CONTENT_RANGE, range.content_range(meta.size));
    }
    builder.body(body).map_err(|e| ServerError::Internal(e.to_string()))
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
