use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// One year, the far-future cache lifetime for immutable episode files.
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 31_536_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory backing the object store.
    pub archive_root: PathBuf,
    /// Player files served as the fallback route, if set.
    pub static_root: Option<PathBuf>,
    pub cache_max_age_secs: u64,
    /// Only keys with this suffix are listed as episodes.
    pub episode_extension: String,
    /// Value of the `source` field in listings.
    pub episode_source: String,
    /// HTTP basic auth for everything except streaming and health.
    pub auth: Option<BasicAuthConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            archive_root: PathBuf::from("./archive"),
            static_root: None,
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
            episode_extension: ".mp3".into(),
            episode_source: "r2".into(),
            auth: None,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
    #[serde(default = "default_realm")]
    pub realm: String,
}

fn default_realm() -> String {
    "GP Archive".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(c.cache_max_age_secs, 31_536_000);
        assert_eq!(c.episode_extension, ".mp3");
        assert!(c.auth.is_none());
        assert!(c.static_root.is_none());
    }

    #[test]
    fn parses_toml() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:3000"
            archive_root = "/srv/gparchive"
            static_root = "/srv/gparchive-player"

            [auth]
            username = "gilles"
            password = "worldwide"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 3000);
        assert_eq!(c.archive_root, PathBuf::from("/srv/gparchive"));
        assert_eq!(c.episode_source, "r2");
        let auth = c.auth.unwrap();
        assert_eq!(auth.username, "gilles");
        assert_eq!(auth.realm, "GP Archive");
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            ServerConfig::from_toml_str("bind_addr = 12"),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpa.toml");
        std::fs::write(&path, "cache_max_age_secs = 60\n").unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap().cache_max_age_secs, 60);
        assert!(ServerConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
