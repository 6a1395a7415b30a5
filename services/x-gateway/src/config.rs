//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The client secret is
//! loaded from the CLIENT_SECRET env var or `client_secret_file`, never stored
//! in the TOML directly to avoid leaking secrets.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use x_oauth::{ClientAuth, OAuthSettings};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub x: XConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Registered X app and endpoint settings
#[derive(Debug, Deserialize)]
pub struct XConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to CLIENT_SECRET env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub client_auth: ClientAuth,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Which store backend holds sessions and tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

/// Key-value store settings
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: None,
            session_ttl_secs: default_session_ttl(),
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_api_base() -> String {
    x_oauth::API_BASE.to_string()
}

fn default_authorize_url() -> String {
    x_oauth::AUTHORIZE_ENDPOINT.to_string()
}

fn default_token_url() -> String {
    x_oauth::TOKEN_ENDPOINT.to_string()
}

fn default_scopes() -> Vec<String> {
    x_oauth::DEFAULT_SCOPES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_timeout() -> u64 {
    x_oauth::DEFAULT_TIMEOUT.as_secs()
}

fn default_session_ttl() -> u64 {
    600
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// CLIENT_ID, REDIRECT_URI and TWITTER_API_BASE override the file.
    /// Client secret resolution order:
    /// 1. CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(id) = std::env::var("CLIENT_ID") {
            config.x.client_id = id;
        }
        if let Ok(uri) = std::env::var("REDIRECT_URI") {
            config.x.redirect_uri = uri;
        }
        if let Ok(base) = std::env::var("TWITTER_API_BASE") {
            config.x.api_base = base;
        }

        if let Ok(secret) = std::env::var("CLIENT_SECRET") {
            config.x.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.x.client_secret_file {
            let secret =
                std::fs::read_to_string(secret_file).map_err(|source| common::Error::SecretFile {
                    path: secret_file.clone(),
                    source,
                })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.x.client_secret = Some(Secret::new(secret));
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if self.x.client_id.trim().is_empty() {
            return Err(common::Error::Config(
                "client_id must be set (config file or CLIENT_ID)".into(),
            ));
        }
        // An empty CLIENT_SECRET still counts as unset
        if self.x.client_secret.as_ref().is_none_or(Secret::is_blank) {
            return Err(common::Error::Config(
                "client secret must be set (CLIENT_SECRET or client_secret_file)".into(),
            ));
        }

        for (name, value) in [
            ("redirect_uri", &self.x.redirect_uri),
            ("api_base", &self.x.api_base),
            ("authorize_url", &self.x.authorize_url),
            ("token_url", &self.x.token_url),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {value:?}"
                )));
            }
        }

        if self.x.scopes.is_empty() {
            return Err(common::Error::Config("scopes must not be empty".into()));
        }
        if self.x.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.store.session_ttl_secs == 0 {
            return Err(common::Error::Config(
                "session_ttl_secs must be greater than 0".into(),
            ));
        }
        if self.store.backend == StoreBackend::File && self.store.path.is_none() {
            return Err(common::Error::Config(
                "store.path is required when backend = \"file\"".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("x-oauth-gateway.toml")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.x.timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.store.session_ttl_secs)
    }

    /// Provider client settings. Returns `None` only if `load` was bypassed
    /// and no client secret was resolved.
    pub fn oauth_settings(&self) -> Option<OAuthSettings> {
        let secret = self.x.client_secret.clone()?;
        let mut settings = OAuthSettings::new(
            self.x.client_id.clone(),
            secret,
            self.x.redirect_uri.clone(),
        );
        settings.authorize_url = self.x.authorize_url.clone();
        settings.token_url = self.x.token_url.clone();
        settings.scopes = self.x.scopes.clone();
        settings.client_auth = self.x.client_auth;
        settings.timeout = self.timeout();
        Some(settings)
    }
}
