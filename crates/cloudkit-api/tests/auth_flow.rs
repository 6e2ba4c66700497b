//! 로그인 → 토큰 → 보호 라우트 흐름 통합 테스트

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use cloudkit_api::{
    auth::issue_token, password_digest, routes::admin_claims, routes::TokenResponse, Claims,
    JwtCodec, Server, SimpleAdminAuthenticator, UserIdentity,
};
use tower::ServiceExt;

const SECRET: &[u8] = b"integration-test-secret-0123456789";
const ADMIN_LOGIN: &str = "goadmin";
const ADMIN_PASSWORD: &str = "Sup3r-Secret!";

fn codec() -> JwtCodec {
    JwtCodec::new(SECRET, "cloudkit-test", 60).unwrap()
}

fn app() -> Router {
    let authenticator = Arc::new(SimpleAdminAuthenticator::new(
        ADMIN_LOGIN,
        ADMIN_PASSWORD,
        "goadmin@yourdomain.org",
        960901,
    ));
    let mut server = Server::builder(codec(), authenticator).build().unwrap();
    server
        .add_protected_route("GET /protected", admin_claims)
        .unwrap();
    server.router()
}

fn regular_user() -> UserIdentity {
    UserIdentity {
        id: 42,
        name: "Regular".to_string(),
        email: "regular@yourdomain.org".to_string(),
        login: "regular".to_string(),
        is_admin: false,
    }
}

fn login_request(login: &str, hashed: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("login={login}&hashed={hashed}")))
        .unwrap()
}

fn protected_request(authorization: Option<(&str, String)>) -> Request<Body> {
    let mut builder = Request::builder().uri("/protected");
    if let Some((name, value)) = authorization {
        builder = builder.header(name, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn login_token() -> String {
    let (status, body) = send(
        app(),
        login_request(ADMIN_LOGIN, &password_digest(ADMIN_PASSWORD)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response: TokenResponse = serde_json::from_str(&body).unwrap();
    response.token
}

#[tokio::test]
async fn test_login_with_valid_credentials_returns_token() {
    let token = login_token().await;
    let claims = codec().verify(&token).unwrap();

    assert_eq!(claims.user.login, ADMIN_LOGIN);
    assert_eq!(claims.user.id, 960901);
    assert!(claims.user.is_admin);
    assert_eq!(claims.issuer, "cloudkit-test");
}

#[tokio::test]
async fn test_login_with_wrong_hash_is_unauthorized() {
    let (status, body) = send(app(), login_request(ADMIN_LOGIN, &password_digest("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Invalid credentials");
}

#[tokio::test]
async fn test_login_with_unknown_user_is_unauthorized() {
    let (status, body) = send(
        app(),
        login_request("nobody", &password_digest(ADMIN_PASSWORD)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Invalid credentials");
}

#[tokio::test]
async fn test_login_without_form_body_is_unauthorized() {
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Invalid credentials");
}

#[tokio::test]
async fn test_protected_route_with_login_token() {
    let token = login_token().await;
    let (status, body) = send(
        app(),
        protected_request(Some(("Authorization", format!("Bearer {token}")))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let claims: Claims = serde_json::from_str(&body).unwrap();
    assert_eq!(claims.user.login, ADMIN_LOGIN);
    assert!(claims.user.is_admin);
}

#[tokio::test]
async fn test_protected_route_accepts_websocket_subprotocol() {
    let token = login_token().await;
    let (status, _) = send(
        app(),
        protected_request(Some((
            "Sec-WebSocket-Protocol",
            format!("Authorization, {token}"),
        ))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_route_without_header_is_bad_request() {
    let (status, body) = send(app(), protected_request(None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Authorization header missing");
}

#[tokio::test]
async fn test_protected_route_with_foreign_token_is_unauthorized() {
    let foreign = issue_token(
        &regular_user(),
        "someone-else",
        60,
        b"a-completely-different-secret",
        Utc::now(),
    )
    .unwrap();
    let (status, body) = send(
        app(),
        protected_request(Some(("Authorization", format!("Bearer {foreign}")))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Invalid token");
}

#[tokio::test]
async fn test_protected_route_with_garbage_token_is_unauthorized() {
    let (status, body) = send(
        app(),
        protected_request(Some(("Authorization", "Bearer not-a-token".to_string()))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Invalid token");
}

#[tokio::test]
async fn test_protected_route_with_expired_token_is_unauthorized() {
    let issued = Utc::now() - chrono::Duration::hours(2);
    let expired = issue_token(&regular_user(), "cloudkit-test", 60, SECRET, issued).unwrap();
    let (status, body) = send(
        app(),
        protected_request(Some(("Authorization", format!("Bearer {expired}")))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Invalid token");
}

#[tokio::test]
async fn test_protected_route_with_non_admin_token_is_forbidden() {
    let token = codec().issue(&regular_user()).unwrap();
    let (status, body) = send(
        app(),
        protected_request(Some(("Authorization", format!("Bearer {token}")))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "User is not admin");
}

#[tokio::test]
async fn test_login_is_not_trimmed_before_authentication() {
    let digest = password_digest(ADMIN_PASSWORD);

    let (status, body) = send(app(), login_request("%20goadmin%20", &digest)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Invalid credentials");

    let (status, body) = send(app(), login_request("+++", &digest)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Invalid credentials");
}
