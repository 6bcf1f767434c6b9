//! Response bodies of the OAuth2 endpoints, as documented in the OpenAPI schema

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Successful token endpoint response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// Opaque access token
    pub access_token: String,
    /// Token type, "Bearer" unless configured otherwise
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Opaque refresh token
    pub refresh_token: String,
    /// Granted scope, omitted when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Protocol error, delivered as JSON or as redirect query parameters
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OAuthErrorResponse {
    /// Stable error code such as "invalid_grant"
    pub error: String,
    pub error_description: String,
    pub error_uri: String,
    /// Echo of the request's `state`, when one was sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Introspection of a bearer token granted with the `email` scope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InfoResponse {
    pub email: String,
}
