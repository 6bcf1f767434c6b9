//! Persisted entities.
//!
//! Records are stored as JSON documents. Field names follow the persisted
//! layout exactly, including the `CreatedAT` spelling on tokens.

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

pub const CLIENT_PREFIX: &[u8] = b"/client/";
pub const USER_PREFIX: &[u8] = b"/user/";
pub const GRANT_PREFIX: &[u8] = b"/grant/token/";
pub const GRANT_ACCESS_PREFIX: &[u8] = b"/grant/access_token/";
pub const GRANT_REFRESH_PREFIX: &[u8] = b"/grant/refresh_token/";
pub const TOKEN_PREFIX: &[u8] = b"/token/";
pub const CSRF_KEY: &[u8] = b"/csrf/";

/// Builds a namespaced store key
pub fn key(prefix: &[u8], id: &str) -> Vec<u8> {
    [prefix, id.as_bytes()].concat()
}

/// Common behaviour of every persisted record
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn set_updated_at(&mut self, now: DateTime<Utc>);

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

/// The kind of exchange a grant represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GrantKind {
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
    #[serde(rename = "refresh_token")]
    RefreshToken,
    #[serde(rename = "password")]
    Password,
    #[serde(rename = "client_credentials")]
    ClientCredentials,
    #[serde(rename = "assertion")]
    Assertion,
    #[serde(rename = "__implicit")]
    Implicit,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl GrantKind {
    /// Grant types accepted by the token endpoint
    pub const ACCESS_TYPES: [GrantKind; 5] = [
        GrantKind::AuthorizationCode,
        GrantKind::RefreshToken,
        GrantKind::Password,
        GrantKind::ClientCredentials,
        GrantKind::Assertion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GrantKind::AuthorizationCode => "authorization_code",
            GrantKind::RefreshToken => "refresh_token",
            GrantKind::Password => "password",
            GrantKind::ClientCredentials => "client_credentials",
            GrantKind::Assertion => "assertion",
            GrantKind::Implicit => "__implicit",
            GrantKind::Unspecified => "",
        }
    }

    /// Resolves a `grant_type` parameter. Internal kinds are never matched.
    pub fn from_grant_type(grant_type: &str) -> Option<Self> {
        Self::ACCESS_TYPES
            .into_iter()
            .find(|kind| kind.as_str() == grant_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    /// Argon2 PHC string of the client secret
    #[serde(rename = "Secret")]
    pub secret: String,
    #[serde(rename = "Grants", default, deserialize_with = "nullable_list")]
    pub grants: Vec<String>,
    #[serde(rename = "Tokens", default, deserialize_with = "nullable_list")]
    pub tokens: Vec<String>,
    /// One or more registered redirect URIs, joined by the configured separator
    #[serde(rename = "RedirectURL")]
    pub redirect_url: String,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "DeletedAt", with = "zero_time", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Client {
    pub fn owns_grant(&self, code: &str) -> bool {
        self.grants.iter().any(|g| g == code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Grants", default, deserialize_with = "nullable_list")]
    pub grants: Vec<String>,
    #[serde(rename = "Tokens", default, deserialize_with = "nullable_list")]
    pub tokens: Vec<String>,
    #[serde(rename = "Clients", default, deserialize_with = "nullable_list")]
    pub clients: Vec<String>,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "DeletedAt", with = "zero_time", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Type")]
    pub kind: GrantKind,
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "ClientID")]
    pub client_id: String,
    #[serde(rename = "AccessToken")]
    pub access_token: String,
    #[serde(rename = "AuthorizeToken")]
    pub authorize_token: String,
    #[serde(rename = "RefreshToken")]
    pub refresh_token: String,
    #[serde(rename = "Scope")]
    pub scope: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "RedirectURL")]
    pub redirect_url: String,
    /// Lifetime in seconds, counted from `created_at`
    #[serde(rename = "ExpiresIn")]
    pub expires_in: i64,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "DeletedAt", with = "zero_time", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Grant {
    /// An unsaved grant of `kind` for `(client_id, user_id)`
    pub fn new(kind: GrantKind, client_id: &str, user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            code: String::new(),
            kind,
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            access_token: String::new(),
            authorize_token: String::new(),
            refresh_token: String::new(),
            scope: String::new(),
            state: String::new(),
            redirect_url: String::new(),
            expires_in: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// `None` when the lifetime runs past the representable calendar
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        TimeDelta::try_seconds(self.expires_in)
            .and_then(|lifetime| self.created_at.checked_add_signed(lifetime))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at < now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn has_tokens(&self) -> bool {
        !self.access_token.is_empty() || !self.refresh_token.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "ClientID")]
    pub client_id: String,
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "ExpiresIn")]
    pub expires_in: i64,
    #[serde(rename = "CreatedAT")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "DeletedAt", with = "zero_time", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Token {
    pub fn new(code: String, client_id: &str, user_id: &str, expires_in: i64) -> Self {
        let now = Utc::now();
        Self {
            code,
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            expires_in,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

macro_rules! impl_record {
    ($($ty:ty),*) => {
        $(
            impl Record for $ty {
                fn deleted_at(&self) -> Option<DateTime<Utc>> {
                    self.deleted_at
                }

                fn set_updated_at(&mut self, now: DateTime<Utc>) {
                    self.updated_at = now;
                }
            }
        )*
    };
}

impl_record!(Client, User, Grant, Token);

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `None` is persisted as the zero instant `0001-01-01T00:00:00Z`.
mod zero_time {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const ZERO: &str = "0001-01-01T00:00:00Z";

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_str(ZERO),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some("") | Some(ZERO) => Ok(None),
            Some(text) => {
                let at = DateTime::parse_from_rfc3339(text)
                    .map_err(serde::de::Error::custom)?
                    .with_timezone(&Utc);
                // Offsets other than Z still denote the zero instant
                if at == zero_instant() {
                    Ok(None)
                } else {
                    Ok(Some(at))
                }
            }
        }
    }

    fn zero_instant() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ZERO)
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
