//! Client and bearer credential extraction.

use crate::request::{params, OAuthRequest};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use http::header::AUTHORIZATION;

/// Client credentials presented with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    /// Reads `client_id`/`client_secret` form fields when `allow_form` is set
    /// and both are present, otherwise the `Authorization: Basic` header.
    pub fn from_request(req: &OAuthRequest, allow_form: bool) -> Option<Self> {
        if allow_form {
            if let (Some(id), Some(secret)) = (
                req.param(params::CLIENT_ID),
                req.param(params::CLIENT_SECRET),
            ) {
                return Some(Self {
                    username: id.to_string(),
                    password: secret.to_string(),
                });
            }
        }
        Self::from_headers(&req.headers)
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// A bearer code presented for introspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerAuth {
    pub code: String,
}

impl BearerAuth {
    /// Reads `Authorization: Bearer <code>`, falling back to the `code` form
    /// field when the header is absent or malformed.
    pub fn from_request(req: &OAuthRequest) -> Option<Self> {
        let from_header = req
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| {
                let mut parts = value.splitn(2, ' ');
                match (parts.next(), parts.next()) {
                    (Some("Bearer"), Some(code)) if !code.is_empty() => Some(code.to_string()),
                    _ => None,
                }
            });
        from_header
            .or_else(|| req.param(params::CODE).map(str::to_string))
            .map(|code| Self { code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn basic_header(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
    }

    #[test]
    fn test_basic_from_header() {
        let req = OAuthRequest::new(Method::POST, "/tokens")
            .with_header(AUTHORIZATION, &basic_header("c1", "s3:cret"))
            .unwrap();
        let auth = BasicAuth::from_request(&req, false).unwrap();
        assert_eq!(auth.username, "c1");
        assert_eq!(auth.password, "s3:cret");
    }

    #[test]
    fn test_basic_form_fields_when_allowed() {
        let req = OAuthRequest::new(Method::POST, "/tokens")
            .with_form([("client_id", "c1"), ("client_secret", "secret")]);
        assert_eq!(
            BasicAuth::from_request(&req, true),
            Some(BasicAuth {
                username: "c1".to_string(),
                password: "secret".to_string()
            })
        );
        assert_eq!(BasicAuth::from_request(&req, false), None);
    }

    #[test]
    fn test_basic_form_requires_both_fields() {
        let req = OAuthRequest::new(Method::POST, "/tokens")
            .with_form([("client_id", "c1")])
            .with_header(AUTHORIZATION, &basic_header("c2", "pw"))
            .unwrap();
        assert_eq!(BasicAuth::from_request(&req, true).unwrap().username, "c2");
    }

    #[test]
    fn test_basic_rejects_garbage() {
        let req = OAuthRequest::new(Method::POST, "/tokens")
            .with_header(AUTHORIZATION, "Basic !!!")
            .unwrap();
        assert_eq!(BasicAuth::from_request(&req, false), None);
    }

    #[test]
    fn test_bearer_header_and_fallback() {
        let req = OAuthRequest::new(Method::GET, "/info")
            .with_header(AUTHORIZATION, "Bearer abc")
            .unwrap();
        assert_eq!(BearerAuth::from_request(&req).unwrap().code, "abc");

        let req = OAuthRequest::new(Method::GET, "/info?code=xyz")
            .with_header(AUTHORIZATION, "Token abc")
            .unwrap();
        assert_eq!(BearerAuth::from_request(&req).unwrap().code, "xyz");

        let req = OAuthRequest::new(Method::GET, "/info")
            .with_header(AUTHORIZATION, "bearer abc")
            .unwrap();
        assert_eq!(BearerAuth::from_request(&req), None);
    }
}
