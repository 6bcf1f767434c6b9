//! Start-up registration of users and clients from a JSON file.
//!
//! ```json
//! {
//!   "users": [{"email": "alice@example.com", "password": "wonderland"}],
//!   "clients": [{"id": "app", "owner": "alice@example.com", "name": "App",
//!                "secret": "s3cret", "redirect_url": "https://app.example/cb"}]
//! }
//! ```

use crate::errors::StartupError;
use log::{debug, info};
use oauth_engine::repository::Repository;
use oauth_engine::{EngineError, KvStore};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub clients: Vec<SeedClient>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedClient {
    /// Generated when omitted, in which case the client is registered on every start
    #[serde(default)]
    pub id: Option<String>,
    pub owner: String,
    pub name: String,
    pub secret: String,
    pub redirect_url: String,
}

impl Seed {
    pub async fn load(path: &Path) -> Result<Self, StartupError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| StartupError::SeedRead {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Registers the users and clients missing from the store.
    /// Existing records are left untouched.
    pub async fn apply<S: KvStore>(&self, repo: &Repository<S>) -> Result<(), EngineError> {
        for user in &self.users {
            match repo.user(&user.email).await {
                Ok(_) => debug!("User {} already registered", user.email),
                Err(EngineError::NotFound) => {
                    repo.register_user(&user.email, &user.password).await?;
                }
                Err(err) => return Err(err),
            }
        }

        for client in &self.clients {
            let Some(id) = &client.id else {
                repo.register_client(
                    &client.owner,
                    &client.name,
                    &client.secret,
                    &client.redirect_url,
                )
                .await?;
                continue;
            };
            match repo.client(id).await {
                Ok(_) => debug!("Client {} already registered", id),
                Err(EngineError::NotFound) => {
                    repo.register_client_with_id(
                        id,
                        &client.owner,
                        &client.name,
                        &client.secret,
                        &client.redirect_url,
                    )
                    .await?;
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            "Seeded {} users and {} clients",
            self.users.len(),
            self.clients.len()
        );
        Ok(())
    }
}
