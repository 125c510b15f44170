use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};

use crate::config::BasicAuthConfig;
use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self { name: "anonymous".into() }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
    Anonymous,
}

impl Credentials {
    /// Read the `Authorization` header. Unparseable values count as anonymous.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
            return Self::Anonymous;
        };
        let (scheme, rest) = value.trim().split_once(' ').unwrap_or((value, ""));
        if !scheme.eq_ignore_ascii_case("basic") {
            return Self::Anonymous;
        }
        let decoded = STANDARD
            .decode(rest.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok());
        match decoded.as_deref().and_then(|s| s.split_once(':')) {
            Some((username, password)) => Self::Basic {
                username: username.to_string(),
                password: password.to_string(),
            },
            None => Self::Anonymous,
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
}

/// Admits every request; used when no credentials are configured.
pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Basic { username, .. } => Ok(Identity::user(username.clone())),
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }
}

/// A single username/password pair.
pub struct BasicAuth {
    config: BasicAuthConfig,
}

impl BasicAuth {
    pub fn new(config: BasicAuthConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AuthProvider for BasicAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Basic { username, password }
                if same_secret(username, &self.config.username)
                    & same_secret(password, &self.config.password) =>
            {
                Ok(Identity::user(username.clone()))
            }
            Credentials::Anonymous => Err(self.challenge()),
            _ => {
                warn!("rejected credentials");
                Err(self.challenge())
            }
        }
    }
}

impl BasicAuth {
    fn challenge(&self) -> ServerError {
        ServerError::Unauthorized {
            realm: self.config.realm.clone(),
        }
    }
}

/// Byte comparison without an early exit on the first mismatch.
fn same_secret(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    let diff = a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    a.len() == b.len() && diff == 0
}

/// Provider matching the configuration: basic auth if configured, else open.
pub fn provider_for(config: Option<&BasicAuthConfig>) -> Arc<dyn AuthProvider> {
    match config {
        Some(c) => Arc::new(BasicAuth::new(c.clone())),
        None => Arc::new(AllowAllAuth),
    }
}

/// Middleware rejecting requests the provider does not accept.
pub async fn require_auth(
    State(auth): State<Arc<dyn AuthProvider>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let credentials = Credentials::from_headers(request.headers());
    let identity = auth.authenticate(&credentials).await?;
    debug!(user = %identity.name, path = %request.uri().path(), "authenticated");
    Ok(next.run(request).await)
}
