//! Transport-neutral view of an inbound protocol request.

use crate::error::EngineError;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use percent_encoding::percent_decode_str;

/// Parameter names used on the wire
pub mod params {
    pub const ERROR: &str = "error";
    pub const ERROR_DESCRIPTION: &str = "error_description";
    pub const ERROR_URI: &str = "error_uri";
    pub const STATE: &str = "state";
    pub const GRANT_TYPE: &str = "grant_type";
    pub const CLIENT_ID: &str = "client_id";
    pub const CLIENT_SECRET: &str = "client_secret";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const TOKEN_TYPE: &str = "token_type";
    pub const EXPIRES_IN: &str = "expires_in";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const SCOPE: &str = "scope";
    pub const REDIRECT_URL: &str = "redirect_url";
    pub const CODE: &str = "code";
    pub const ASSERTION: &str = "assertion";
    pub const ASSERTION_TYPE: &str = "assertion_type";
    pub const RESPONSE_TYPE: &str = "response_type";
    pub const LOGIN_USERNAME: &str = "login_username";
    pub const LOGIN_PASSWORD: &str = "login_password";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const CSRF_TOKEN: &str = "csrf_token";
    pub const EMAIL: &str = "email";
}

/// Ordered form parameters. Earlier pairs win lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams(Vec<(String, String)>);

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` string
    pub fn parse(encoded: &str) -> Self {
        Self(
            url::form_urlencoded::parse(encoded.as_bytes())
                .into_owned()
                .collect(),
        )
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn extend(&mut self, other: FormParams) {
        self.0.extend(other.0);
    }

    /// First value of `name`. Empty values count as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone)]
pub struct OAuthRequest {
    pub method: Method,
    /// The request target as received, path and query
    pub uri: String,
    pub headers: HeaderMap,
    pub form: FormParams,
}

impl OAuthRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let form = match uri.split_once('?') {
            Some((_, query)) => FormParams::parse(query),
            None => FormParams::new(),
        };
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            form,
        }
    }

    /// Builds a request from HTTP parts. Urlencoded bodies of POST, PUT and
    /// PATCH requests are merged ahead of the query string.
    pub fn from_parts(method: Method, uri: &Uri, headers: HeaderMap, body: &[u8]) -> Self {
        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        let mut form = FormParams::new();
        if has_form_body(&method, &headers) {
            form.extend(FormParams::parse(&String::from_utf8_lossy(body)));
        }
        if let Some(query) = uri.query() {
            form.extend(FormParams::parse(query));
        }
        Self {
            method,
            uri: target,
            headers,
            form,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.form.get(name)
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, EngineError> {
        let value = HeaderValue::from_str(value).map_err(|e| EngineError::Decode(e.to_string()))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds body parameters, which take precedence over the query string
    pub fn with_form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut form: FormParams = pairs.into_iter().collect();
        form.extend(std::mem::take(&mut self.form));
        self.form = form;
        self
    }
}

fn has_form_body(method: &Method, headers: &HeaderMap) -> bool {
    let accepts_body = matches!(*method, Method::POST | Method::PUT | Method::PATCH);
    let urlencoded = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
    accepts_body && urlencoded
}

/// Decodes a query-escaped value: `+` becomes a space and every `%` must
/// start a valid escape.
pub fn query_unescape(raw: &str) -> Result<String, EngineError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(EngineError::Decode(format!("invalid escape in {raw:?}")));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| EngineError::Decode(e.to_string()))
}
