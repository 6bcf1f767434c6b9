use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Duration, Utc};
use http::header::{AUTHORIZATION, LOCATION};
use http::{Method, Response, StatusCode};
use log::LevelFilter;
use oauth_engine::models::{Client, Grant, GrantKind};
use oauth_engine::{
    AuthorizationServer, AuthorizeOutcome, MemoryStore, OAuthRequest, ResponseKind, ServerOptions,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

const REDIRECT: &str = "https://app.example/cb";
const EMAIL: &str = "alice@example.com";
const PASSWORD: &str = "wonderland";
const CLIENT_SECRET: &str = "s3cret";

struct Fixture {
    server: Arc<AuthorizationServer<MemoryStore>>,
    client: Client,
}

impl Fixture {
    async fn new() -> Self {
        Self::with_options(ServerOptions::default()).await
    }

    async fn with_options(options: ServerOptions) -> Self {
        let _ = env_logger::builder()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();

        let server = AuthorizationServer::init(MemoryStore::default(), options)
            .await
            .expect("Failed to init server");
        let repo = server.repository();
        repo.register_user(EMAIL, PASSWORD).await.unwrap();
        let client = repo
            .register_client_with_id("app", EMAIL, "Example app", CLIENT_SECRET, REDIRECT)
            .await
            .unwrap();
        Self {
            server: Arc::new(server),
            client,
        }
    }

    /// Runs the code flow and returns the issued code
    async fn authorize_code(&self, scope: &str) -> String {
        let req = login_request(&format!(
            "client_id=app&response_type=code&state=xyz&scope={scope}"
        ));
        let response = respond(self.server.authorize(&req).await);
        assert_eq!(response.status(), StatusCode::FOUND);
        location_params(&response, false)["code"].clone()
    }

    async fn exchange(&self, code: &str) -> (StatusCode, Value) {
        self.token(&basic("app", CLIENT_SECRET), &[
            ("grant_type", "authorization_code"),
            ("code", code),
        ])
        .await
    }

    async fn token(&self, authorization: &str, form: &[(&str, &str)]) -> (StatusCode, Value) {
        let req = OAuthRequest::new(Method::POST, "/tokens")
            .with_header(AUTHORIZATION, authorization)
            .unwrap()
            .with_form(form.iter().copied());
        json(self.server.access(&req).await.commit().unwrap())
    }

    async fn info(&self, access_token: &str) -> (StatusCode, Value) {
        let req = OAuthRequest::new(Method::GET, "/info")
            .with_header(AUTHORIZATION, &format!("Bearer {access_token}"))
            .unwrap();
        json(self.server.info(&req).await.commit().unwrap())
    }
}

fn basic(id: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
}

fn login_request(query: &str) -> OAuthRequest {
    OAuthRequest::new(Method::POST, format!("/authorize?{query}"))
        .with_form([("login_username", EMAIL), ("login_password", PASSWORD)])
}

fn respond(outcome: AuthorizeOutcome) -> Response<String> {
    match outcome {
        AuthorizeOutcome::Respond(ctx) => ctx.commit().unwrap(),
        AuthorizeOutcome::Login(prompt) => panic!("unexpected login prompt: {prompt:?}"),
    }
}

fn json(response: Response<String>) -> (StatusCode, Value) {
    let status = response.status();
    let body = serde_json::from_str(response.body()).expect("body is not JSON");
    (status, body)
}

fn location_params(response: &Response<String>, fragment: bool) -> HashMap<String, String> {
    let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
    let url = Url::parse(location).unwrap();
    let encoded = if fragment {
        url.fragment().unwrap_or_default().to_string()
    } else {
        url.query().unwrap_or_default().to_string()
    };
    url::form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect()
}

#[tokio::test]
async fn test_get_authorize_renders_login() {
    let fixture = Fixture::new().await;
    let req = OAuthRequest::new(Method::GET, "/authorize?client_id=app&response_type=code");

    match fixture.server.authorize(&req).await {
        AuthorizeOutcome::Login(prompt) => {
            assert_eq!(prompt.action, "/authorize?client_id=app&response_type=code");
            assert_eq!(prompt.title, "oauth login");
            assert!(fixture.server.csrf().verify(&prompt.action, &prompt.csrf_token));
        }
        AuthorizeOutcome::Respond(ctx) => panic!("expected login form, got {:?}", ctx.data()),
    }
}

#[tokio::test]
async fn test_get_with_credentials_still_renders_login() {
    let fixture = Fixture::new().await;
    let mut req = login_request("client_id=app&response_type=code");
    req.method = Method::GET;
    assert!(matches!(
        fixture.server.authorize(&req).await,
        AuthorizeOutcome::Login(_)
    ));
}

#[tokio::test]
async fn test_wrong_password_renders_login() {
    let fixture = Fixture::new().await;
    let req = OAuthRequest::new(Method::POST, "/authorize?client_id=app&response_type=code")
        .with_form([("login_username", EMAIL), ("login_password", "nope")]);
    assert!(matches!(
        fixture.server.authorize(&req).await,
        AuthorizeOutcome::Login(_)
    ));
}

#[tokio::test]
async fn test_code_flow_redirects_with_code_and_state() {
    let fixture = Fixture::new().await;
    let req = login_request("client_id=app&response_type=code&state=xyz");
    let response = respond(fixture.server.authorize(&req).await);

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
    let code = location
        .strip_prefix("https://app.example/cb?code=")
        .and_then(|rest| rest.strip_suffix("&state=xyz"))
        .expect("unexpected location");
    assert_eq!(code.len(), 64);
    assert!(code.chars().all(|c| c.is_ascii_hexdigit()));

    let grant = fixture.server.repository().grant(code).await.unwrap();
    assert_eq!(grant.kind, GrantKind::AuthorizationCode);
    assert_eq!(grant.client_id, "app");
    assert_eq!(grant.user_id, EMAIL);
    assert_eq!(grant.redirect_url, REDIRECT);

    let client = fixture.server.repository().client("app").await.unwrap();
    let user = fixture.server.repository().user(EMAIL).await.unwrap();
    assert!(client.owns_grant(code));
    assert!(user.grants.iter().any(|g| g == code));
}

#[tokio::test]
async fn test_escaped_redirect_url_is_decoded() {
    let fixture = Fixture::new().await;
    let req = login_request(
        "client_id=app&response_type=code&redirect_url=https%253A%252F%252Fapp.example%252Fcb%252Fdone",
    );
    let response = respond(fixture.server.authorize(&req).await);
    let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
    assert!(location.starts_with("https://app.example/cb/done?code="));
}

#[tokio::test]
async fn test_unknown_client_is_json_error() {
    let fixture = Fixture::new().await;
    let req = login_request("client_id=ghost&response_type=code&state=s1");
    let AuthorizeOutcome::Respond(ctx) = fixture.server.authorize(&req).await else {
        panic!("expected a response");
    };
    assert_eq!(ctx.kind(), ResponseKind::Data);
    let (status, body) = json(ctx.commit().unwrap());
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unauthorized_client");
    assert_eq!(body["state"], "s1");
}

#[tokio::test]
async fn test_foreign_redirect_is_invalid_request() {
    let fixture = Fixture::new().await;
    let req = login_request("client_id=app&response_type=code&redirect_url=https://evil.example/cb");
    let (_, body) = json(respond(fixture.server.authorize(&req).await));
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_unsupported_response_type_redirects_error() {
    let fixture = Fixture::new().await;
    let req = login_request("client_id=app&response_type=id_token&state=s1");
    let response = respond(fixture.server.authorize(&req).await);
    assert_eq!(response.status(), StatusCode::FOUND);
    let params = location_params(&response, false);
    assert_eq!(params["error"], "unsupported_response_type");
    assert_eq!(params["state"], "s1");
}

#[tokio::test]
async fn test_implicit_flow_uses_fragment() {
    let fixture = Fixture::new().await;
    let req = login_request("client_id=app&response_type=token&state=s1&scope=email");
    let response = respond(fixture.server.authorize(&req).await);

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
    assert!(!location.contains('?'));
    let params = location_params(&response, true);
    assert_eq!(params["token_type"], "Bearer");
    assert_eq!(params["state"], "s1");
    assert_eq!(params["scope"], "email");

    let grant = fixture
        .server
        .repository()
        .grant_by_access(&params["access_token"])
        .await
        .unwrap();
    assert_eq!(grant.kind, GrantKind::Implicit);
}

#[tokio::test]
async fn test_code_exchange_mints_independent_tokens() {
    let fixture = Fixture::new().await;
    let code = fixture.authorize_code("email").await;

    let (status, body) = fixture.exchange(&code).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 200);
    assert_eq!(body["scope"], "email");

    let repo = fixture.server.repository();
    let access = body["access_token"].as_str().unwrap();
    let refresh = body["refresh_token"].as_str().unwrap();
    assert_ne!(access, refresh);
    for code in [access, refresh] {
        let token = repo.token(code).await.unwrap();
        assert_eq!(token.client_id, "app");
        assert_eq!(token.user_id, EMAIL);
    }

    let grant = repo.grant_by_access(access).await.unwrap();
    assert_eq!(grant.refresh_token, refresh);
    assert_eq!(grant.expires_in, 200);
    assert!(repo.client("app").await.unwrap().owns_grant(&grant.code));
    assert!(repo.grant(&code).await.is_err(), "input grant must be retired");
}

#[tokio::test]
async fn test_code_is_single_use() {
    let fixture = Fixture::new().await;
    let code = fixture.authorize_code("email").await;

    let (status, _) = fixture.exchange(&code).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = fixture.exchange(&code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_exchange_has_one_winner() {
    let fixture = Arc::new(Fixture::new().await);
    let code = fixture.authorize_code("email").await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let fixture = fixture.clone();
        let code = code.clone();
        handles.push(tokio::spawn(async move { fixture.exchange(&code).await }));
    }

    let mut issued = 0;
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        if status == StatusCode::OK {
            issued += 1;
        } else {
            assert_eq!(body["error"], "invalid_grant");
        }
    }
    assert_eq!(issued, 1);
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let fixture = Fixture::new().await;
    let repo = fixture.server.repository();
    let mut grant = Grant {
        code: "stale".to_string(),
        redirect_url: REDIRECT.to_string(),
        expires_in: 200,
        created_at: Utc::now() - Duration::seconds(201),
        ..Grant::new(GrantKind::AuthorizationCode, "app", EMAIL)
    };
    repo.save_grant(&mut grant).await.unwrap();
    repo.attach("app", EMAIL, &["stale"], &[]).await.unwrap();

    let (status, body) = fixture.exchange("stale").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn test_code_of_another_client_is_rejected() {
    let fixture = Fixture::new().await;
    fixture
        .server
        .repository()
        .register_client_with_id("other", EMAIL, "Other", "pw", REDIRECT)
        .await
        .unwrap();
    let code = fixture.authorize_code("email").await;

    let (_, body) = fixture
        .token(&basic("other", "pw"), &[("grant_type", "authorization_code"), ("code", code.as_str())])
        .await;
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn test_mismatched_redirect_on_exchange() {
    let fixture = Fixture::new().await;
    let code = fixture.authorize_code("email").await;
    let (_, body) = fixture
        .token(&basic("app", CLIENT_SECRET), &[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_url", "https://app.example/cb/other"),
        ])
        .await;
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn test_missing_code_is_unsupported_grant_type() {
    let fixture = Fixture::new().await;
    let (_, body) = fixture
        .token(&basic("app", CLIENT_SECRET), &[("grant_type", "authorization_code")])
        .await;
    assert_eq!(body["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let fixture = Fixture::new().await;
    let code = fixture.authorize_code("email").await;
    let (_, first) = fixture.exchange(&code).await;
    let old_access = first["access_token"].as_str().unwrap();
    let old_refresh = first["refresh_token"].as_str().unwrap();

    let (status, second) = fixture
        .token(&basic("app", CLIENT_SECRET), &[
            ("grant_type", "refresh_token"),
            ("refresh_token", old_refresh),
        ])
        .await;
    assert_eq!(status, StatusCode::OK, "{second}");
    assert_eq!(second["scope"], "email");
    assert_ne!(second["access_token"], first["access_token"]);

    let new_grant = fixture
        .server
        .repository()
        .grant_by_access(second["access_token"].as_str().unwrap())
        .await
        .unwrap();
    assert_eq!(new_grant.kind, GrantKind::RefreshToken);

    // The previous pair is revoked
    let (_, reused) = fixture
        .token(&basic("app", CLIENT_SECRET), &[
            ("grant_type", "refresh_token"),
            ("refresh_token", old_refresh),
        ])
        .await;
    assert_eq!(reused["error"], "invalid_grant");
    let (_, info) = fixture.info(old_access).await;
    assert_eq!(info["error"], "invalid_grant");
}

#[tokio::test]
async fn test_rotation_keeps_membership_lists_flat() {
    let fixture = Fixture::new().await;
    let code = fixture.authorize_code("email").await;
    let (_, mut tokens) = fixture.exchange(&code).await;

    for _ in 0..4 {
        let (status, body) = fixture
            .token(&basic("app", CLIENT_SECRET), &[
                ("grant_type", "refresh_token"),
                ("refresh_token", tokens["refresh_token"].as_str().unwrap()),
            ])
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        tokens = body;
    }

    let repo = fixture.server.repository();
    let live = repo
        .grant_by_access(tokens["access_token"].as_str().unwrap())
        .await
        .unwrap();
    let expected_tokens = vec![
        tokens["access_token"].as_str().unwrap().to_string(),
        tokens["refresh_token"].as_str().unwrap().to_string(),
    ];
    let client = repo.client("app").await.unwrap();
    assert_eq!(client.grants, vec![live.code.clone()]);
    assert_eq!(client.tokens, expected_tokens);
    let user = repo.user(EMAIL).await.unwrap();
    assert_eq!(user.grants, vec![live.code]);
    assert_eq!(user.tokens, expected_tokens);
}

#[tokio::test]
async fn test_refresh_by_another_client_is_unauthorized() {
    let fixture = Fixture::new().await;
    fixture
        .server
        .repository()
        .register_client_with_id("other", EMAIL, "Other", "pw", REDIRECT)
        .await
        .unwrap();
    let code = fixture.authorize_code("email").await;
    let (_, tokens) = fixture.exchange(&code).await;

    let (status, body) = fixture
        .token(&basic("other", "pw"), &[
            ("grant_type", "refresh_token"),
            ("refresh_token", tokens["refresh_token"].as_str().unwrap()),
        ])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unauthorized_client");
}

#[tokio::test]
async fn test_refresh_with_unrelated_scope_is_denied() {
    let fixture = Fixture::new().await;
    let code = fixture.authorize_code("email").await;
    let (_, tokens) = fixture.exchange(&code).await;

    let (_, body) = fixture
        .token(&basic("app", CLIENT_SECRET), &[
            ("grant_type", "refresh_token"),
            ("refresh_token", tokens["refresh_token"].as_str().unwrap()),
            ("scope", "admin"),
        ])
        .await;
    assert_eq!(body["error"], "access_denied");
}

#[tokio::test]
async fn test_password_grant_and_info() {
    let fixture = Fixture::new().await;
    let (status, tokens) = fixture
        .token(&basic("app", CLIENT_SECRET), &[
            ("grant_type", "password"),
            ("username", EMAIL),
            ("password", PASSWORD),
            ("scope", "email"),
        ])
        .await;
    assert_eq!(status, StatusCode::OK, "{tokens}");

    let (status, info) = fixture.info(tokens["access_token"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info, serde_json::json!({ "email": EMAIL }));
}

#[tokio::test]
async fn test_password_grant_with_wrong_password() {
    let fixture = Fixture::new().await;
    let (_, body) = fixture
        .token(&basic("app", CLIENT_SECRET), &[
            ("grant_type", "password"),
            ("username", EMAIL),
            ("password", "nope"),
        ])
        .await;
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn test_info_via_code_form_field() {
    let fixture = Fixture::new().await;
    let code = fixture.authorize_code("email").await;
    let (_, tokens) = fixture.exchange(&code).await;

    let access = tokens["access_token"].as_str().unwrap();
    let req = OAuthRequest::new(Method::POST, "/info").with_form([("code", access)]);
    let (_, body) = json(fixture.server.info(&req).await.commit().unwrap());
    assert_eq!(body["email"], EMAIL);
}

#[tokio::test]
async fn test_info_for_expired_grant() {
    let fixture = Fixture::new().await;
    let code = fixture.authorize_code("email").await;
    let (_, tokens) = fixture.exchange(&code).await;
    let access = tokens["access_token"].as_str().unwrap();

    let repo = fixture.server.repository();
    let mut grant = repo.grant_by_access(access).await.unwrap();
    grant.created_at = Utc::now() - Duration::seconds(grant.expires_in + 1);
    repo.save_grant(&mut grant).await.unwrap();

    let (status, body) = fixture.info(access).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn test_info_rejects_other_scopes() {
    let fixture = Fixture::new().await;
    let code = fixture.authorize_code("profile").await;
    let (_, tokens) = fixture.exchange(&code).await;
    let (_, body) = fixture.info(tokens["access_token"].as_str().unwrap()).await;
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn test_info_without_bearer() {
    let fixture = Fixture::new().await;
    let req = OAuthRequest::new(Method::GET, "/info")
        .with_header(AUTHORIZATION, "Token abc")
        .unwrap();
    let (_, body) = json(fixture.server.info(&req).await.commit().unwrap());
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_client_credentials_grant_uses_owner() {
    let fixture = Fixture::new().await;
    let (status, tokens) = fixture
        .token(&basic("app", CLIENT_SECRET), &[("grant_type", "client_credentials")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(tokens.get("scope").is_none());

    let grant = fixture
        .server
        .repository()
        .grant_by_access(tokens["access_token"].as_str().unwrap())
        .await
        .unwrap();
    assert_eq!(grant.kind, GrantKind::ClientCredentials);
    assert_eq!(grant.user_id, fixture.client.user_id);
}

#[tokio::test]
async fn test_assertion_grant() {
    let fixture = Fixture::new().await;
    let (_, body) = fixture
        .token(&basic("app", CLIENT_SECRET), &[("grant_type", "assertion"), ("assertion", "x")])
        .await;
    assert_eq!(body["error"], "invalid_grant");

    let (status, tokens) = fixture
        .token(&basic("app", CLIENT_SECRET), &[
            ("grant_type", "assertion"),
            ("assertion_type", "urn:example"),
            ("assertion", "opaque"),
        ])
        .await;
    assert_eq!(status, StatusCode::OK);
    let grant = fixture
        .server
        .repository()
        .grant_by_access(tokens["access_token"].as_str().unwrap())
        .await
        .unwrap();
    assert_eq!(grant.redirect_url, REDIRECT);
    assert_eq!(grant.client_id, "app");
    assert_eq!(grant.user_id, EMAIL);
}

#[tokio::test]
async fn test_client_authentication_failures() {
    let fixture = Fixture::new().await;

    let req = OAuthRequest::new(Method::POST, "/tokens")
        .with_form([("grant_type", "client_credentials")]);
    let (status, body) = json(fixture.server.access(&req).await.commit().unwrap());
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_client");

    let (_, body) = fixture
        .token(&basic("app", "wrong"), &[("grant_type", "client_credentials")])
        .await;
    assert_eq!(body["error"], "unauthorized_client");

    // Form credentials are accepted by default
    let req = OAuthRequest::new(Method::POST, "/tokens").with_form([
        ("grant_type", "client_credentials"),
        ("client_id", "app"),
        ("client_secret", CLIENT_SECRET),
    ]);
    let (status, _) = json(fixture.server.access(&req).await.commit().unwrap());
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_get_access_needs_option() {
    let fixture = Fixture::new().await;
    let req = OAuthRequest::new(Method::GET, "/tokens?grant_type=client_credentials")
        .with_header(AUTHORIZATION, &basic("app", CLIENT_SECRET))
        .unwrap();
    let (_, body) = json(fixture.server.access(&req).await.commit().unwrap());
    assert_eq!(body["error"], "invalid_request");

    let fixture = Fixture::with_options(ServerOptions {
        allow_get_access: true,
        ..Default::default()
    })
    .await;
    let (status, _) = json(fixture.server.access(&req).await.commit().unwrap());
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_grant_type_allow_list() {
    let fixture = Fixture::with_options(ServerOptions {
        allowed_access_type: vec!["authorization_code".to_string()],
        ..Default::default()
    })
    .await;
    let (_, body) = fixture
        .token(&basic("app", CLIENT_SECRET), &[("grant_type", "client_credentials")])
        .await;
    assert_eq!(body["error"], "unsupported_grant_type");

    let (_, body) = fixture
        .token(&basic("app", CLIENT_SECRET), &[("grant_type", "magic")])
        .await;
    assert_eq!(body["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn test_required_csrf_token() {
    let fixture = Fixture::with_options(ServerOptions {
        require_csrf: true,
        ..Default::default()
    })
    .await;
    let query = "client_id=app&response_type=code&state=xyz";

    let AuthorizeOutcome::Login(prompt) = fixture.server.authorize(&login_request(query)).await
    else {
        panic!("a post without csrf token must render the login form");
    };

    let req = login_request(query).with_form([("csrf_token", prompt.csrf_token.as_str())]);
    let response = respond(fixture.server.authorize(&req).await);
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(location_params(&response, false).contains_key("code"));
}

#[tokio::test]
async fn test_multiple_registered_redirects() {
    let fixture = Fixture::with_options(ServerOptions {
        redirect_separator: " ".to_string(),
        ..Default::default()
    })
    .await;
    fixture
        .server
        .repository()
        .register_client_with_id(
            "multi",
            EMAIL,
            "Multi",
            "pw",
            "https://a.example/cb https://b.example/return",
        )
        .await
        .unwrap();

    // No default when several URIs are registered
    let req = login_request("client_id=multi&response_type=code");
    let (_, body) = json(respond(fixture.server.authorize(&req).await));
    assert_eq!(body["error"], "invalid_request");

    let req = login_request("client_id=multi&response_type=code&redirect_url=https://b.example/return");
    let response = respond(fixture.server.authorize(&req).await);
    let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
    assert!(location.starts_with("https://b.example/return?code="));
}
