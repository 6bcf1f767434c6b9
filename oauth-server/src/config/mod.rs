pub(crate) use crate::config::oauth::OAuthConfig;
pub(crate) use crate::config::store::{StoreBackend, StoreConfig};
use confique::Config;
use std::path::PathBuf;

pub mod oauth;
pub mod store;

/// Environment variable naming the optional TOML configuration file
pub const CONFIG_FILE_ENV: &str = "OAUTH_CONFIG_FILE";
const DEFAULT_CONFIG_FILE: &str = "oauth-server.toml";

/// Main configuration structure for the OAuth server
#[derive(Debug, Config, Clone)]
pub struct ServerConfig {
    /// The port the server will listen to (default: 7780)
    #[config(env = "OAUTH_PORT", default = 7780)]
    pub port: u16,

    /// JSON file with users and clients registered at start-up
    #[config(env = "OAUTH_SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// Authorization server tunables
    #[config(nested)]
    pub oauth: OAuthConfig,

    /// Key-value store configuration
    #[config(nested)]
    pub store: StoreConfig,
}

impl ServerConfig {
    /// Loads the configuration from environment variables layered over the
    /// TOML file named by `OAUTH_CONFIG_FILE`. A missing file is skipped.
    pub fn new() -> Result<Self, String> {
        let file = std::env::var(CONFIG_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::from_file(file)
    }

    pub fn from_file(file: PathBuf) -> Result<Self, String> {
        let config = Self::builder()
            .env()
            .file(file)
            .load()
            .map_err(|e| e.to_string())?;
        config.oauth.validate()?;
        Ok(config)
    }

    /// Defaults only, untouched by the environment
    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::builder()
            .load()
            .expect("Failed to load default configuration")
    }
}
