//! OAuth2 endpoint handlers.
//!
//! Each handler turns the axum request into an [`OAuthRequest`], lets the
//! authorization server run the flow and commits the resulting context.

use crate::api::oauth::models::{InfoResponse, OAuthErrorResponse, TokenResponse};
use crate::errors::ApiError;
use crate::openapi::OAUTH_TAG;
use crate::state::AppState;
use crate::templates::render_login;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{Html, IntoResponse, Response},
};
use log::debug;
use oauth_engine::headers::presets;
use oauth_engine::{AuthorizeOutcome, OAuthRequest, ResponseContext};

/// Renders a committed response context
fn commit(ctx: ResponseContext) -> Response {
    match ctx.commit() {
        Ok(response) => response.map(Body::from).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

/// Authorization endpoint (RFC 6749 Section 3.1)
///
/// Without valid login credentials the login form is rendered. Otherwise the
/// user agent is redirected back to the client with a code or tokens.
#[utoipa::path(
    method(get, post),
    path = "/authorize",
    params(
        ("client_id" = String, Query, description = "Client identifier"),
        ("redirect_url" = Option<String>, Query, description = "URL-escaped redirect URI, defaults to the registered one"),
        ("response_type" = String, Query, description = "\"code\" or \"token\""),
        ("scope" = Option<String>, Query, description = "Requested scope"),
        ("state" = Option<String>, Query, description = "Opaque value echoed back to the client")
    ),
    responses(
        (status = 200, description = "Login form", body = String, content_type = "text/html"),
        (status = 302, description = "Redirect to the client with a code, tokens or an error"),
        (status = 400, description = "Invalid client or redirect URI", body = OAuthErrorResponse)
    ),
    tag = OAUTH_TAG
)]
pub(crate) async fn authorize(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    debug!("Authorization request {} {}", method, uri.path());
    let request = OAuthRequest::from_parts(method, &uri, headers, &body);

    match state.server.authorize(&request).await {
        AuthorizeOutcome::Respond(ctx) => commit(ctx),
        AuthorizeOutcome::Login(prompt) => match render_login(&state.templates, &prompt) {
            Ok(html) => {
                let mut response = Html(html).into_response();
                presets::no_store().apply(response.headers_mut());
                response
            }
            Err(err) => ApiError::from(err).into_response(),
        },
    }
}

/// Token endpoint (RFC 6749 Section 3.2)
///
/// Client credentials are read from HTTP Basic authentication, or from the
/// `client_id`/`client_secret` form fields when allowed.
#[utoipa::path(
    post,
    path = "/tokens",
    params(
        ("grant_type" = String, Query, description = "authorization_code, refresh_token, password, client_credentials or assertion"),
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("redirect_url" = Option<String>, Query, description = "Must match the authorization request"),
        ("refresh_token" = Option<String>, Query, description = "Refresh token"),
        ("scope" = Option<String>, Query, description = "Requested scope"),
        ("username" = Option<String>, Query, description = "Resource owner email"),
        ("password" = Option<String>, Query, description = "Resource owner password"),
        ("assertion_type" = Option<String>, Query, description = "Assertion type"),
        ("assertion" = Option<String>, Query, description = "Assertion")
    ),
    responses(
        (status = 200, description = "Issued tokens", body = TokenResponse),
        (status = 400, description = "Rejected grant", body = OAuthErrorResponse),
        (status = 401, description = "Missing client authentication", body = OAuthErrorResponse)
    ),
    tag = OAUTH_TAG
)]
pub(crate) async fn token(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    debug!("Token request {} {}", method, uri.path());
    let request = OAuthRequest::from_parts(method, &uri, headers, &body);
    commit(state.server.access(&request).await)
}

/// Bearer token introspection
///
/// Answers the resource owner's email for tokens granted with the `email` scope.
#[utoipa::path(
    get,
    path = "/info",
    params(
        ("code" = Option<String>, Query, description = "Access token, when no Bearer header is sent")
    ),
    responses(
        (status = 200, description = "Token owner", body = InfoResponse),
        (status = 400, description = "Unknown, expired or foreign token", body = OAuthErrorResponse)
    ),
    tag = OAUTH_TAG
)]
pub(crate) async fn info(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = OAuthRequest::from_parts(method, &uri, headers, &body);
    commit(state.server.info(&request).await)
}
