use crate::config::ServerConfig;
use crate::create_app;
use crate::state::tests::create_test_state;
use crate::state::AppState;
use axum::body::Body;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::{header, HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tower::ServiceExt;
use url::Url;

pub const TEST_USER: &str = "alice@example.com";
pub const TEST_PASSWORD: &str = "wonderland";
pub const TEST_CLIENT: &str = "app";
pub const TEST_SECRET: &str = "s3cret";
pub const TEST_REDIRECT: &str = "https://app.example/cb";

/// Test fixture for driving the complete application over HTTP.
///
/// The fixture runs on an in-memory store with one registered user
/// (`alice@example.com` / `wonderland`) and one client (`app` / `s3cret`,
/// redirecting to `https://app.example/cb`).
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new().await;
///     let code = fixture.authorize_code("email").await;
///
///     let response = fixture.exchange_code(&code).await;
///     response.assert_ok();
///     let tokens = response.json_as::<TokenResponse>();
///     assert_eq!(tokens.token_type, "Bearer");
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Application state shared with the router
    pub state: AppState,
}

impl TestFixture {
    /// Creates a fixture with the default configuration
    pub async fn new() -> Self {
        Self::with_config(ServerConfig::for_test()).await
    }

    /// Creates a fixture with a customized configuration and the test
    /// user and client registered.
    pub async fn with_config(config: ServerConfig) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let state = create_test_state(config).await;
        let repo = state.server.repository();
        repo.register_user(TEST_USER, TEST_PASSWORD)
            .await
            .expect("Failed to register test user");
        repo.register_client_with_id(TEST_CLIENT, TEST_USER, "Test app", TEST_SECRET, TEST_REDIRECT)
            .await
            .expect("Failed to register test client");

        let app = create_app(state.clone()).await;
        Self { app, state }
    }

    /// Initializes the test logger with customized settings.
    ///
    /// Only the first call in a test binary takes effect.
    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    /// The `Authorization` header value for HTTP Basic client authentication
    pub fn basic_auth(client_id: &str, secret: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{client_id}:{secret}")))
    }

    /// Creates a request builder for `uri`
    pub fn request_builder(&self, method: Method, uri: impl AsRef<str>) -> http::request::Builder {
        Request::builder().method(method).uri(uri.as_ref())
    }

    /// Sends a GET request to the specified URI.
    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        self.get_with_headers(uri, &[]).await
    }

    /// Sends a GET request with custom headers.
    pub async fn get_with_headers(
        &self,
        uri: impl AsRef<str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = self.request_builder(Method::GET, uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a POST request with an urlencoded form body.
    pub async fn post_form(&self, uri: impl AsRef<str>, form: &[(&str, &str)]) -> TestResponse {
        self.post_form_with_headers(uri, form, &[]).await
    }

    /// Sends a POST request with an urlencoded form body and custom headers.
    pub async fn post_form_with_headers(
        &self,
        uri: impl AsRef<str>,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        let mut builder = self
            .request_builder(Method::POST, uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(Body::from(body))
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a request and returns a TestResponse.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body).into_owned();
        // Try to parse as JSON, defaulting to empty object if parsing fails or empty body
        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        TestResponse {
            status,
            headers,
            text,
            json,
        }
    }

    /// Logs the test user in and returns the authorization code from the redirect.
    pub async fn authorize_code(&self, scope: &str) -> String {
        let uri = format!("/authorize?client_id={TEST_CLIENT}&response_type=code&scope={scope}");
        let response = self
            .post_form(
                uri,
                &[
                    ("login_username", TEST_USER),
                    ("login_password", TEST_PASSWORD),
                ],
            )
            .await;
        response.assert_status(StatusCode::FOUND);
        response
            .location_params()
            .remove("code")
            .expect("Redirect carries no code")
    }

    /// Exchanges an authorization code at the token endpoint.
    pub async fn exchange_code(&self, code: &str) -> TestResponse {
        let auth = Self::basic_auth(TEST_CLIENT, TEST_SECRET);
        self.post_form_with_headers(
            "/tokens",
            &[("grant_type", "authorization_code"), ("code", code)],
            &[("Authorization", auth.as_str())],
        )
        .await
    }
}

/// Response from a test request that provides convenient access to status,
/// headers and body.
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Raw body
    pub text: String,
    /// Response body as JSON (if present and valid JSON)
    pub json: Value,
}

impl TestResponse {
    /// Checks if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Asserts that the response has the expected status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match the expected value.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {} but got {} with body: {}",
            expected, self.status, self.text
        );
        self
    }

    /// Asserts that the response status is OK (200).
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// Converts the response body to the specified type.
    ///
    /// # Panics
    ///
    /// Panics if deserialization fails.
    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The parsed `Location` header.
    pub fn location(&self) -> Url {
        let location = self.header("location").expect("Response has no Location");
        Url::parse(location).expect("Location is not a URL")
    }

    /// Query parameters of the `Location` header.
    pub fn location_params(&self) -> HashMap<String, String> {
        self.location().query_pairs().into_owned().collect()
    }

    /// Fragment parameters of the `Location` header.
    pub fn fragment_params(&self) -> HashMap<String, String> {
        let location = self.location();
        url::form_urlencoded::parse(location.fragment().unwrap_or_default().as_bytes())
            .into_owned()
            .collect()
    }

    /// The CSRF token embedded in a rendered login form.
    pub fn csrf_token(&self) -> String {
        let marker = "name=\"csrf_token\" value=\"";
        let start = self.text.find(marker).expect("No csrf_token field") + marker.len();
        let end = self.text[start..].find('"').expect("Unterminated csrf_token value");
        self.text[start..start + end].to_string()
    }
}
