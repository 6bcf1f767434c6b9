//! The authorization server orchestrator.
//!
//! Three entry points, each producing a [`ResponseContext`] the caller commits:
//! [`AuthorizationServer::authorize`], [`AuthorizationServer::access`] and
//! [`AuthorizationServer::info`]. Every successful flow ends in `finalize`,
//! which retires the input grant and mints a fresh token pair.

mod access;
mod authorize;
mod finalize;
mod info;

use crate::context::ResponseContext;
use crate::csrf::{bootstrap_secret, CsrfGuard};
use crate::error::EngineError;
use crate::options::ServerOptions;
use crate::repository::Repository;
use crate::store::KvStore;
use log::info;

/// What the authorization endpoint wants rendered
#[derive(Debug)]
pub enum AuthorizeOutcome {
    /// A protocol response, data or redirect
    Respond(ResponseContext),
    /// The user is not authenticated yet
    Login(LoginPrompt),
}

/// Inputs of the login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPrompt {
    /// Where the form posts back to
    pub action: String,
    pub title: String,
    pub csrf_token: String,
}

pub struct AuthorizationServer<S> {
    repo: Repository<S>,
    options: ServerOptions,
    csrf: CsrfGuard,
}

impl<S: KvStore> AuthorizationServer<S> {
    /// Bootstraps the CSRF secret and builds the server
    pub async fn init(store: S, options: ServerOptions) -> Result<Self, EngineError> {
        let configured = options
            .csrf_secret
            .as_deref()
            .map(hex::decode)
            .transpose()
            .map_err(|e| EngineError::Decode(format!("csrf_secret: {e}")))?;
        let secret = bootstrap_secret(&store, configured.as_deref()).await?;
        info!(
            "Authorization server ready (endpoints {}, {}, {})",
            options.auth_endpoint, options.token_endpoint, options.info_endpoint
        );
        Ok(Self {
            repo: Repository::new(store),
            csrf: CsrfGuard::new(secret, options.csrf_token_ttl),
            options,
        })
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn repository(&self) -> &Repository<S> {
        &self.repo
    }

    pub fn csrf(&self) -> &CsrfGuard {
        &self.csrf
    }

    pub async fn health_check(&self) -> Result<(), String> {
        self.repo.store().health_check().await
    }
}

/// Splits a comma-separated scope list
fn scope_items(scope: &str) -> impl Iterator<Item = &str> {
    scope.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Resolves the scope of a refreshed grant. `None` when the request shares
/// nothing with the stored scope.
fn resolve_scope(stored: &str, requested: &str) -> Option<String> {
    if requested.is_empty() {
        return Some(stored.to_string());
    }
    let overlaps = scope_items(requested).any(|item| scope_items(stored).any(|s| s == item));
    overlaps.then(|| requested.to_string())
}
