use crate::config::ServerConfig;
use crate::errors::StartupError;
use crate::store::Store;
use crate::templates;
use oauth_engine::AuthorizationServer;
use std::sync::Arc;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub server: Arc<AuthorizationServer<Store>>,
    pub templates: Arc<Tera>,
}

impl AppState {
    /// Initializes the authorization server on `store`, bootstrapping the CSRF secret
    pub async fn new(config: ServerConfig, store: Store) -> Result<Self, StartupError> {
        let server = AuthorizationServer::init(store, config.oauth.to_options()).await?;
        Ok(Self {
            config: Arc::new(config),
            server: Arc::new(server),
            templates: Arc::new(templates::load()?),
        })
    }

    /// Check if all components are healthy
    pub async fn health_check(&self) -> Result<(), String> {
        self.server.health_check().await
    }
}
