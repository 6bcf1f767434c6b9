//! OAuth2 authorization server endpoints.
//!
//! ## Supported flows
//! - Authorization Code Grant (RFC 6749 Section 4.1)
//! - Implicit Grant (RFC 6749 Section 4.2)
//! - Resource Owner Password Credentials Grant (RFC 6749 Section 4.3)
//! - Client Credentials Grant (RFC 6749 Section 4.4)
//! - Refresh tokens and assertions
//!
//! Routes follow the configured endpoint paths; every endpoint accepts both
//! GET and POST and the authorization server decides what each method may do.

pub mod handlers;
pub mod models;

use crate::state::AppState;
use axum::{routing::get, Router};
use oauth_engine::ServerOptions;

/// Creates the OAuth2 routes at the configured paths
pub fn router(options: &ServerOptions) -> Router<AppState> {
    Router::new()
        .route(
            &options.auth_endpoint,
            get(handlers::authorize).post(handlers::authorize),
        )
        .route(
            &options.token_endpoint,
            get(handlers::token).post(handlers::token),
        )
        .route(
            &options.info_endpoint,
            get(handlers::info).post(handlers::info),
        )
}
