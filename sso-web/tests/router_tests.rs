//! Router tests driving the full axum app with `tower::ServiceExt::oneshot`.
//!
//! Cookies travel between requests the way a browser carries them: the
//! `Set-Cookie` headers of one response become the `Cookie` header of the
//! next request. A wiremock server stands in for the Provider.

use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use cookie::Cookie;
use serde_json::{json, Value};
use sso_auth::session::now_millis;
use sso_auth::state::STATE_COOKIE;
use sso_auth::{
    AuthConfig, LegacyTokenIssuer, OAuthCredential, RequestContext, ResponseContext, Session,
    SessionRepository, TestTokenOptions,
};
use sso_identity::{Organization, UserIdentity};
use sso_web::{app, require_api_access, AppState, WebError};
use std::collections::HashMap;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JWT_SECRET: &str = "router-test-signing-secret";
const SESSION_COOKIE: &str = "mc_app_session";

/// Browser-side cookie jar.
#[derive(Default)]
struct Browser {
    cookies: HashMap<String, String>,
}

impl Browser {
    /// Apply the response's `Set-Cookie` headers.
    fn absorb(&mut self, response: &Response) {
        for value in response.headers().get_all(SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().expect("ascii").to_string()).expect("cookie");
            if cookie.max_age() == Some(time::Duration::ZERO) {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
    }

    fn header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn get(&self, uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(COOKIE, self.header())
            .body(Body::empty())
            .expect("request")
    }

    fn post_form(&self, uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(COOKIE, self.header())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("request")
    }
}

fn base_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.provider.jwt_signing_secret = Some(JWT_SECRET.to_string());
    config
}

fn oauth_config(server: &MockServer) -> AuthConfig {
    let mut config = base_config();
    config.provider.auth_base_uri = Some(server.uri());
    config.provider.client_id = Some("test-client".to_string());
    config.provider.client_secret = Some("test-secret".to_string());
    config.provider.timeout_secs = 5;
    config
}

fn router(config: AuthConfig) -> (Router, AppState) {
    let state = AppState::new(config).expect("state");
    (app(state.clone()), state)
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn location(response: &Response) -> &str {
    response.headers()[LOCATION].to_str().expect("location")
}

fn query_param(url: &str, key: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

// =============================================================================
// Route guard
// =============================================================================

#[tokio::test]
async fn test_guard_redirects_anonymous_dashboard() {
    let (app, _) = router(base_config());
    let browser = Browser::default();

    let response = app.oneshot(browser.get("/dashboard")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?redirect=%2Fdashboard");
}

#[tokio::test]
async fn test_guard_passes_public_paths() {
    let (app, _) = router(base_config());
    let browser = Browser::default();

    let response = app.clone().oneshot(browser.get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(browser.get("/test-sso")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_dev_page_hidden_in_production() {
    let mut config = base_config();
    config.production = true;
    config.session.password = "a-production-password-of-at-least-32-bytes".to_string();
    let (app, _) = router(config);

    let response = app.oneshot(Browser::default().get("/test-sso")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

// =============================================================================
// Legacy login
// =============================================================================

#[tokio::test]
async fn test_legacy_login_status_and_logout() {
    let (app, _) = router(base_config());
    let mut browser = Browser::default();

    let token = LegacyTokenIssuer::new(JWT_SECRET)
        .issue(&TestTokenOptions::default())
        .expect("token");

    let response = app
        .clone()
        .oneshot(browser.post_form("/api/auth/jwt", format!("jwt={}", token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    browser.absorb(&response);
    assert!(browser.cookies.contains_key(SESSION_COOKIE));

    let response = app.clone().oneshot(browser.get("/api/auth/session")).await.unwrap();
    let status = json_body(response).await;
    assert_eq!(status["isLoggedIn"], true);
    assert_eq!(status["user"]["email"], "test@example.com");
    assert!(status.get("accessToken").is_none());

    let response = app.clone().oneshot(browser.get("/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(browser.post_form("/api/auth/logout", String::new()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    browser.absorb(&response);
    assert!(!browser.cookies.contains_key(SESSION_COOKIE));

    let response = app.oneshot(browser.get("/api/auth/session")).await.unwrap();
    assert_eq!(json_body(response).await, json!({ "isLoggedIn": false }));
}

#[tokio::test]
async fn test_legacy_login_rejects_wrong_secret() {
    let (app, _) = router(base_config());
    let browser = Browser::default();

    let token = LegacyTokenIssuer::new("some-other-secret")
        .issue(&TestTokenOptions::default())
        .expect("token");

    let response = app
        .oneshot(browser.post_form("/api/auth/jwt", format!("jwt={}", token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?error=Invalid+SSO+token");
    assert!(response.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_legacy_login_without_secret_is_500() {
    let (app, _) = router(AuthConfig::default());

    let response = app
        .oneshot(Browser::default().post_form("/api/auth/jwt", "jwt=abc".to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["code"], "CONFIG_MISSING");
}

// =============================================================================
// OAuth login
// =============================================================================

#[tokio::test]
async fn test_oauth_login_callback_dashboard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "expires_in": 1080,
            "rest_instance_url": "https://tenant.rest.example.com/"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "sub": "12345", "email": "oauth@example.com", "name": "OAuth User" },
            "organization": { "member_id": 100000001, "enterprise_id": 100000000 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _) = router(oauth_config(&server));
    let mut browser = Browser::default();

    let response = app
        .clone()
        .oneshot(browser.post_form("/api/auth/login", String::new()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let authorize_url = location(&response).to_string();
    assert!(authorize_url.starts_with(&format!("{}/v2/authorize", server.uri())));
    browser.absorb(&response);

    let state = query_param(&authorize_url, "state").expect("state param");
    assert_eq!(browser.cookies.get(STATE_COOKIE), Some(&state));

    let response = app
        .clone()
        .oneshot(browser.get(&format!("/api/auth/callback?code=auth-code&state={}", state)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    browser.absorb(&response);
    assert!(!browser.cookies.contains_key(STATE_COOKIE));

    let response = app.clone().oneshot(browser.get("/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = json_body(response).await;
    assert_eq!(status["isLoggedIn"], true);
    assert_eq!(status["hasApiAccess"], true);
    assert_eq!(status["user"]["email"], "oauth@example.com");

    // Already signed in: login goes straight to the dashboard
    let response = app
        .oneshot(browser.post_form("/api/auth/login", String::new()))
        .await
        .unwrap();
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_callback_state_mismatch_redirects_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (app, _) = router(oauth_config(&server));
    let mut browser = Browser::default();
    browser
        .cookies
        .insert(STATE_COOKIE.to_string(), "expected-state".to_string());

    let response = app
        .oneshot(browser.get("/api/auth/callback?code=auth-code&state=forged-state"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?error=Invalid+state+parameter");
    browser.absorb(&response);
    assert!(!browser.cookies.contains_key(STATE_COOKIE));
    assert!(!browser.cookies.contains_key(SESSION_COOKIE));
}

#[tokio::test]
async fn test_callback_provider_error_uses_description() {
    let server = MockServer::start().await;
    let (app, _) = router(oauth_config(&server));

    let response = app
        .oneshot(Browser::default().get(
            "/api/auth/callback?error=access_denied&error_description=User%20denied%20access",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?error=User+denied+access");
}

#[tokio::test]
async fn test_callback_without_oauth_config_is_500() {
    let (app, _) = router(base_config());

    let response = app
        .oneshot(Browser::default().get("/api/auth/callback?code=abc&state=xyz"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["code"], "CONFIG_MISSING");
    assert_eq!(body["error"], "Server configuration error");
}

// =============================================================================
// Test token endpoint
// =============================================================================

#[tokio::test]
async fn test_test_jwt_issues_verifiable_token() {
    let (app, state) = router(base_config());

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/test-jwt")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"userId":"777","email":"dev@example.com"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let token = body["token"].as_str().expect("token");
    let session = state
        .legacy_verifier()
        .expect("verifier")
        .verify(token)
        .expect("verify")
        .into_session();
    let user = session.identity().expect("identity");
    assert_eq!(user.email, "dev@example.com");
    assert_eq!(user.id.as_i64(), Some(777));
}

#[tokio::test]
async fn test_test_jwt_forbidden_in_production() {
    let mut config = base_config();
    config.production = true;
    config.session.password = "a-production-password-of-at-least-32-bytes".to_string();
    let (app, _) = router(config);

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/test-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "Not available in production");
}

// =============================================================================
// API access
// =============================================================================

async fn signed_in_headers(state: &AppState, session: &Session) -> axum::http::HeaderMap {
    let mut out = ResponseContext::new();
    state
        .store
        .save(&RequestContext::new(), session, &mut out)
        .await
        .expect("save");

    let mut headers = axum::http::HeaderMap::new();
    let cookie = out
        .cookies()
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect::<Vec<_>>()
        .join("; ");
    headers.insert(COOKIE, cookie.parse().expect("header"));
    headers
}

fn oauth_session(expires_in: i64) -> Session {
    Session::oauth(
        UserIdentity::new(12345, "test@example.com"),
        Organization::new(100000001),
        OAuthCredential::new(
            "old-access",
            Some("old-refresh".to_string()),
            Some(expires_in),
            Some("https://tenant.rest.example.com/".to_string()),
        ),
    )
}

#[tokio::test]
async fn test_require_api_access_refreshes_expiring_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "expires_in": 1080
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_, state) = router(oauth_config(&server));
    let headers = signed_in_headers(&state, &oauth_session(10)).await;

    let access = require_api_access(&state, &headers).await.expect("access");

    assert_eq!(access.access_token, "fresh-access");
    assert_eq!(
        access.api_base_url.as_deref(),
        Some("https://tenant.rest.example.com/")
    );
    let refreshed = access
        .set_cookies
        .cookie(SESSION_COOKIE)
        .expect("refreshed session cookie");
    assert!(!refreshed.value().is_empty());

    let reloaded = state
        .store
        .load(&access.set_cookies.clone().into_request())
        .await;
    assert_eq!(reloaded.access_token(), Some("fresh-access"));
    assert!(reloaded.token_expires_at().expect("expiry") > now_millis());
}

#[tokio::test]
async fn test_require_api_access_without_session() {
    let (_, state) = router(base_config());

    let err = require_api_access(&state, &axum::http::HeaderMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, WebError::Unauthorized { code: "UNAUTHORIZED" }));
}

#[tokio::test]
async fn test_require_api_access_rejected_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_, state) = router(oauth_config(&server));
    let headers = signed_in_headers(&state, &oauth_session(10)).await;

    let err = require_api_access(&state, &headers).await.unwrap_err();

    assert!(matches!(err, WebError::Unauthorized { code: "REFRESH_FAILED" }));
}

#[tokio::test]
async fn test_require_api_access_without_oauth_client_is_500() {
    let (_, state) = router(base_config());
    let headers = signed_in_headers(&state, &oauth_session(10)).await;

    let err = require_api_access(&state, &headers).await.unwrap_err();

    assert!(matches!(
        err,
        WebError::Auth(sso_auth::AuthError::ConfigMissing(_))
    ));
    assert_eq!(
        err.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_legacy_session_can_start_oauth_login() {
    let server = MockServer::start().await;
    let (app, _) = router(oauth_config(&server));
    let mut browser = Browser::default();

    let token = LegacyTokenIssuer::new(JWT_SECRET)
        .issue(&TestTokenOptions::default())
        .expect("token");
    let response = app
        .clone()
        .oneshot(browser.post_form("/api/auth/jwt", format!("jwt={}", token)))
        .await
        .unwrap();
    browser.absorb(&response);
    assert!(browser.cookies.contains_key(SESSION_COOKIE));

    let response = app
        .oneshot(browser.post_form("/api/auth/login", String::new()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with(&format!("{}/v2/authorize", server.uri())));
}
