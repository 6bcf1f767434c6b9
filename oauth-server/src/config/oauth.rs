//! Authorization server configuration

use confique::Config;
use oauth_engine::ServerOptions;

/// Upper bound for every configured lifetime: ten years
const MAX_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Authorization server configuration, one field per [`ServerOptions`] tunable
#[derive(Debug, Config, Clone)]
pub struct OAuthConfig {
    /// Separator between registered redirect URIs (default: none, one URI per client)
    #[config(env = "OAUTH_REDIRECT_SEPARATOR", default = "")]
    pub redirect_separator: String,

    /// Seconds an authorization code lives (default: 200)
    #[config(env = "OAUTH_AUTHORIZATION_EXPIRE", default = 200)]
    pub authorization_expire: i64,

    /// Seconds an access grant lives (default: 200)
    #[config(env = "OAUTH_ACCESS_EXPIRE", default = 200)]
    pub access_expire: i64,

    /// Accept GET on the token endpoint (default: false)
    #[config(env = "OAUTH_ALLOW_GET_ACCESS", default = false)]
    pub allow_get_access: bool,

    /// Accept `client_id`/`client_secret` form fields (default: true)
    #[config(env = "OAUTH_ALLOW_FORM_CLIENT_CREDENTIALS", default = true)]
    pub allow_form_client_credentials: bool,

    /// Grant types the token endpoint accepts, comma separated in the environment
    #[config(
        env = "OAUTH_ALLOWED_ACCESS_TYPE",
        parse_env = confique::env::parse::list_by_comma,
        default = ["authorization_code", "refresh_token", "password", "client_credentials", "assertion"]
    )]
    pub allowed_access_type: Vec<String>,

    #[config(env = "OAUTH_TOKEN_TYPE", default = "Bearer")]
    pub token_type: String,

    /// Login page title prefix (default: "oauth")
    #[config(env = "OAUTH_PROVIDER_NAME", default = "oauth")]
    pub provider_name: String,

    #[config(env = "OAUTH_AUTH_ENDPOINT", default = "/authorize")]
    pub auth_endpoint: String,

    #[config(env = "OAUTH_TOKEN_ENDPOINT", default = "/tokens")]
    pub token_endpoint: String,

    #[config(env = "OAUTH_INFO_ENDPOINT", default = "/info")]
    pub info_endpoint: String,

    /// Random bytes per generated code (default: 32, i.e. 64 hex chars)
    #[config(env = "OAUTH_CODE_LENGTH", default = 32)]
    pub code_length: usize,

    /// Hex-encoded CSRF secret. Generated and persisted in the store when unset.
    #[config(env = "OAUTH_CSRF_SECRET")]
    pub csrf_secret: Option<String>,

    /// Enforce login-form CSRF tokens (default: false)
    #[config(env = "OAUTH_REQUIRE_CSRF", default = false)]
    pub require_csrf: bool,

    /// Seconds a login-form token stays valid (default: 3600)
    #[config(env = "OAUTH_CSRF_TOKEN_TTL", default = 3600)]
    pub csrf_token_ttl: i64,
}

impl OAuthConfig {
    /// Rejects values the router or the engine cannot work with
    pub fn validate(&self) -> Result<(), String> {
        for (name, path) in [
            ("auth_endpoint", &self.auth_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("info_endpoint", &self.info_endpoint),
        ] {
            if !path.starts_with('/') {
                return Err(format!("{name} must start with '/', got {path:?}"));
            }
        }
        if self.auth_endpoint == self.token_endpoint
            || self.auth_endpoint == self.info_endpoint
            || self.token_endpoint == self.info_endpoint
        {
            return Err("auth, token and info endpoints must differ".to_string());
        }
        for (name, secs) in [
            ("authorization_expire", self.authorization_expire),
            ("access_expire", self.access_expire),
            ("csrf_token_ttl", self.csrf_token_ttl),
        ] {
            if !(1..=MAX_LIFETIME_SECS).contains(&secs) {
                return Err(format!(
                    "{name} must be between 1 and {MAX_LIFETIME_SECS} seconds, got {secs}"
                ));
            }
        }
        if self.code_length == 0 {
            return Err("code_length must be positive".to_string());
        }
        Ok(())
    }

    pub fn to_options(&self) -> ServerOptions {
        ServerOptions {
            redirect_separator: self.redirect_separator.clone(),
            authorization_expire: self.authorization_expire,
            access_expire: self.access_expire,
            allow_get_access: self.allow_get_access,
            allow_form_client_credentials: self.allow_form_client_credentials,
            allowed_access_type: self.allowed_access_type.clone(),
            token_type: self.token_type.clone(),
            provider_name: self.provider_name.clone(),
            auth_endpoint: self.auth_endpoint.clone(),
            token_endpoint: self.token_endpoint.clone(),
            info_endpoint: self.info_endpoint.clone(),
            code_length: self.code_length,
            csrf_secret: self.csrf_secret.clone(),
            require_csrf: self.require_csrf,
            csrf_token_ttl: self.csrf_token_ttl,
        }
    }
}
