//! HTTP 서비스 스캐폴드.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 라우터와 기본 라우트 (`/time`, `/version`, `/metrics`, `/health`, `/readiness`, `/login`)
//! - HS512 JWT 발급/검증과 인증 미들웨어
//! - Prometheus 메트릭 수집
//! - 시그널 기반 graceful shutdown
//!
//! # 모듈 구성
//!
//! - [`server`]: 라우트 등록과 서버 생명주기
//! - [`auth`]: 토큰 코덱, 인증기, 인증 미들웨어
//! - [`routes`]: 기본 HTTP 핸들러
//! - [`metrics`]: 메트릭 싱크
//! - [`middleware`]: HTTP 미들웨어
//! - [`state`]: 핸들러 공유 상태

pub mod auth;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod version;

pub use auth::{
    password_digest, Authenticator, AuthError, Claims, Identity, JwtCodec, SimpleAdminAuthenticator,
    TokenError, UserIdentity,
};
pub use error::ServerError;
pub use lifecycle::{shutdown_signal, LifecycleState, ShutdownOutcome};
pub use metrics::{MetricsSink, NoopSink, PrometheusSink};
pub use server::{RoutePattern, Server, ServerBuilder};
pub use state::AppState;
pub use version::{AppInfo, SimpleVersionReader, VersionReader};
