use crate::models::GrantKind;
use serde::{Deserialize, Serialize};

/// Tunables of the authorization server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Separator between registered redirect URIs. Empty means one URI.
    pub redirect_separator: String,
    /// Seconds an authorization code lives
    pub authorization_expire: i64,
    /// Seconds an access grant lives
    pub access_expire: i64,
    pub allow_get_access: bool,
    pub allow_form_client_credentials: bool,
    /// Grant types the token endpoint accepts
    pub allowed_access_type: Vec<String>,
    pub token_type: String,
    /// Prefix of the login page title
    pub provider_name: String,
    pub auth_endpoint: String,
    pub token_endpoint: String,
    pub info_endpoint: String,
    /// Random bytes per generated code
    pub code_length: usize,
    /// Hex-encoded CSRF secret. Generated and persisted when unset.
    pub csrf_secret: Option<String>,
    pub require_csrf: bool,
    pub csrf_token_ttl: i64,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            redirect_separator: String::new(),
            authorization_expire: 200,
            access_expire: 200,
            allow_get_access: false,
            allow_form_client_credentials: true,
            allowed_access_type: GrantKind::ACCESS_TYPES
                .iter()
                .map(|kind| kind.as_str().to_string())
                .collect(),
            token_type: "Bearer".to_string(),
            provider_name: "oauth".to_string(),
            auth_endpoint: "/authorize".to_string(),
            token_endpoint: "/tokens".to_string(),
            info_endpoint: "/info".to_string(),
            code_length: 32,
            csrf_secret: None,
            require_csrf: false,
            csrf_token_ttl: 3600,
        }
    }
}

impl ServerOptions {
    pub fn access_allowed(&self, grant_type: &str) -> bool {
        self.allowed_access_type.iter().any(|t| t == grant_type)
    }

    pub fn login_title(&self) -> String {
        format!("{} login", self.provider_name)
    }
}
