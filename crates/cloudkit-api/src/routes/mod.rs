//! HTTP 라우트 핸들러.
//!
//! 기본 라우트:
//! - `GET /time`, `GET /version`, `GET /metrics`
//! - `GET /health`, `GET /readiness`
//! - `POST /login`
//! - 매칭되지 않는 요청은 [`pages::not_found`]
//!
//! 데모 라우트(`GET /protected`, 정적 페이지)는 바이너리에서 등록합니다.

pub mod health;
pub mod login;
pub mod pages;
pub mod protected;

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Method},
};

pub use health::{health, readiness};
pub use login::{login, LoginForm, TokenResponse};
pub use pages::{metrics, not_found, static_page, time, version, NotFoundResponse};
pub use protected::admin_claims;

/// 요청 추적 정보.
///
/// 핸들러 진입 시 [`RequestInfo::trace`]로 debug 로그를 남깁니다.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub remote: Option<SocketAddr>,
    pub request_id: String,
}

impl RequestInfo {
    pub fn trace(&self, handler: &str) {
        tracing::debug!(
            handler,
            method = %self.method,
            path = %self.path,
            remote = ?self.remote,
            request_id = %self.request_id,
            "TraceRequest"
        );
    }
}

impl<S> FromRequestParts<S> for RequestInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            remote,
            request_id: uuid::Uuid::new_v4().to_string(),
        })
    }
}
