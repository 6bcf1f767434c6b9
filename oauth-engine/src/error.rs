use crate::redirect::RedirectError;
use crate::store::StoreError;
use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// The closed set of protocol errors reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    UnauthorizedClient,
    AccessDenied,
    UnsupportedResponseType,
    InvalidScope,
    ServerError,
    TemporarilyUnavailable,
    UnsupportedGrantType,
    InvalidGrant,
    InvalidClient,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 10] = [
        ErrorKind::InvalidRequest,
        ErrorKind::UnauthorizedClient,
        ErrorKind::AccessDenied,
        ErrorKind::UnsupportedResponseType,
        ErrorKind::InvalidScope,
        ErrorKind::ServerError,
        ErrorKind::TemporarilyUnavailable,
        ErrorKind::UnsupportedGrantType,
        ErrorKind::InvalidGrant,
        ErrorKind::InvalidClient,
    ];

    /// Stable wire code written to the `error` field.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::UnauthorizedClient => "unauthorized_client",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::UnsupportedResponseType => "unsupported_response_type",
            ErrorKind::InvalidScope => "invalid_scope",
            ErrorKind::ServerError => "server_error",
            ErrorKind::TemporarilyUnavailable => "temporarily_unavailable",
            ErrorKind::UnsupportedGrantType => "unsupported_grant_type",
            ErrorKind::InvalidGrant => "invalid_grant",
            ErrorKind::InvalidClient => "invalid_client",
        }
    }

    /// Default `error_description` for this kind.
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => {
                "The request is missing a required parameter, includes an invalid parameter value, includes a parameter more than once, or is otherwise malformed."
            }
            ErrorKind::UnauthorizedClient => {
                "The client is not authorized to request a token using this method."
            }
            ErrorKind::AccessDenied => {
                "The resource owner or authorization server denied the request."
            }
            ErrorKind::UnsupportedResponseType => {
                "The authorization server does not support obtaining a token using this method."
            }
            ErrorKind::InvalidScope => {
                "The requested scope is invalid, unknown, or malformed."
            }
            ErrorKind::ServerError => {
                "The authorization server encountered an unexpected condition that prevented it from fulfilling the request."
            }
            ErrorKind::TemporarilyUnavailable => {
                "The authorization server is currently unable to handle the request due to a temporary overloading or maintenance of the server."
            }
            ErrorKind::UnsupportedGrantType => {
                "The authorization grant type is not supported by the authorization server."
            }
            ErrorKind::InvalidGrant => {
                "The provided authorization grant (e.g., authorization code, resource owner credentials) or refresh token is invalid, expired, revoked, does not match the redirection URI used in the authorization request, or was issued to another client."
            }
            ErrorKind::InvalidClient => {
                "Client authentication failed (e.g., unknown client, no client authentication included, or unsupported authentication method)."
            }
        }
    }

    /// HTTP status used when the error is delivered as a JSON body.
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::InvalidClient => StatusCode::UNAUTHORIZED,
            ErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::TemporarilyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Internal causes. These are logged, never serialized to clients.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to (de)serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Secure random source failed: {0}")]
    Random(String),

    #[error("Record not found")]
    NotFound,

    #[error("Password hash error: {0}")]
    Hash(String),

    #[error("Invalid redirect uri: {0}")]
    Redirect(#[from] RedirectError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Malformed input: {0}")]
    Decode(String),

    #[error("Grant has already been exchanged")]
    GrantClaimed,

    #[error("Grant expired")]
    Expired,

    #[error("Grant is not owned by the client")]
    Ownership,

    #[error("Credentials do not match")]
    InvalidCredentials,

    #[error("Method {0} is not accepted here")]
    MethodNotAllowed(http::Method),

    #[error("Concurrent updates of {0} did not settle")]
    Contention(String),
}

impl EngineError {
    /// Failures of the infrastructure rather than of the caller's input.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            EngineError::Store(_)
                | EngineError::Serialization(_)
                | EngineError::Random(_)
                | EngineError::Contention(_)
        )
    }
}

/// A protocol failure raised inside one of the flows.
///
/// Flows propagate it with `?`; the entry point folds it into the response
/// context exactly once.
#[derive(Debug)]
pub struct Rejection {
    pub kind: ErrorKind,
    pub description: Option<String>,
    pub cause: Option<EngineError>,
}

impl Rejection {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            description: None,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<EngineError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl From<ErrorKind> for Rejection {
    fn from(kind: ErrorKind) -> Self {
        Rejection::new(kind)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.kind, cause),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Maps internal results onto protocol rejections.
pub(crate) trait RejectExt<T> {
    /// Every failure becomes `kind`.
    fn reject(self, kind: ErrorKind) -> Result<T, Rejection>;

    /// Infrastructure failures become `ServerError`, everything else `kind`.
    fn reject_lookup(self, kind: ErrorKind) -> Result<T, Rejection>;
}

impl<T, E: Into<EngineError>> RejectExt<T> for Result<T, E> {
    fn reject(self, kind: ErrorKind) -> Result<T, Rejection> {
        self.map_err(|err| Rejection::new(kind).with_cause(err))
    }

    fn reject_lookup(self, kind: ErrorKind) -> Result<T, Rejection> {
        self.map_err(|err| {
            let err: EngineError = err.into();
            let kind = if err.is_infrastructure() {
                ErrorKind::ServerError
            } else {
                kind
            };
            Rejection::new(kind).with_cause(err)
        })
    }
}
