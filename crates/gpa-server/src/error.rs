use axum::http::header::{CONTENT_RANGE, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use gpa_store::StoreError;
use gpa_types::ByteRange;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("range not satisfiable (size {size})")]
    RangeNotSatisfiable { size: u64 },

    #[error("authentication required")]
    Unauthorized { realm: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::Store(StoreError::NotFound(_) | StoreError::InvalidKey(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::RangeNotSatisfiable { .. } | Self::Store(StoreError::RangeNotSatisfiable { .. }) => {
                StatusCode::RANGE_NOT_SATISFIABLE
            }
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::NOT_FOUND => "File not found",
            StatusCode::RANGE_NOT_SATISFIABLE => "Range not satisfiable",
            StatusCode::UNAUTHORIZED => "Authentication required",
            _ => {
                error!(error = %self, "request failed");
                "Internal server error"
            }
        };
        let mut response = (status, Json(json!({ "error": message }))).into_response();

        let extra = match &self {
            Self::RangeNotSatisfiable { size } | Self::Store(StoreError::RangeNotSatisfiable { size, .. }) => {
                Some((CONTENT_RANGE, ByteRange::unsatisfied_content_range(*size)))
            }
            Self::Unauthorized { realm } => Some((WWW_AUTHENTICATE, format!("Basic realm=\"{realm}\""))),
            _ => None,
        };
        if let Some((name, value)) = extra {
            if let Ok(value) = HeaderValue::from_str(&value) {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }
}
