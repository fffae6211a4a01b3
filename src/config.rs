//! Gateway configuration loaded from `config.yaml`, with env overrides.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default time-to-live for cached decks, in seconds
pub const DEFAULT_TTL_SECS: f64 = 300.0;

/// Top-level application configuration loaded from `config.yaml`.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Server configuration (host, port, CORS origins)
    pub server: ServerConfig,
    /// Deck cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Remote catalog configuration
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Server configuration settings.
///
/// Defines how the HTTP server should bind and what CORS origins to allow.
#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on (default: 3010)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma-separated list of allowed CORS origins (default: "*")
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CacheConfig {
    /// Seconds a fetched deck stays fresh. Zero or negative disables caching.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3010
}
fn default_allowed_origins() -> String {
    "*".to_string()
}
fn default_ttl_seconds() -> f64 {
    DEFAULT_TTL_SECS
}
fn default_base_url() -> String {
    crate::infrastructure::cardcast_client::BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "CardcastDeckGateway/1.0".to_string()
}

impl Config {
    /// Read and parse a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read {} - ensure file exists in working directory",
                path.display()
            )
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content)
            .context("Failed to parse config - check YAML syntax and structure")
    }

    /// Apply `PORT`, `CARDCAST_BASE_URL` and `DECK_CACHE_TTL_SECONDS`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(base_url) = lookup("CARDCAST_BASE_URL").filter(|u| !u.trim().is_empty()) {
            self.catalog.base_url = base_url;
        }
        match lookup("DECK_CACHE_TTL_SECONDS").map(|t| t.parse::<f64>()) {
            Some(Ok(ttl)) if ttl.is_finite() => self.cache.ttl_seconds = ttl,
            Some(_) => tracing::warn!("Ignoring invalid DECK_CACHE_TTL_SECONDS"),
            None => {}
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
