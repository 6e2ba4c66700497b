//! 핸들러 간 공유 상태.

use std::sync::Arc;

use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::auth::{Authenticator, JwtCodec};
use crate::lifecycle::LifecycleState;
use crate::metrics::MetricsSink;
use crate::version::VersionReader;

/// 임베딩 애플리케이션이 제공하는 준비 상태 판정.
pub type ReadinessCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// 애플리케이션 상태.
///
/// 모든 필드는 생성 후 읽기 전용입니다. 카운터 증가는 싱크 내부에서 동기화됩니다.
#[derive(Clone)]
pub struct AppState {
    pub app_name: Arc<str>,
    pub codec: JwtCodec,
    pub authenticator: Arc<dyn Authenticator>,
    pub version: Arc<dyn VersionReader>,
    pub metrics: Arc<dyn MetricsSink>,
    pub readiness: ReadinessCheck,
    pub lifecycle: watch::Receiver<LifecycleState>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 요청을 받을 준비가 되었는지 확인.
    pub fn is_ready(&self) -> bool {
        *self.lifecycle.borrow() == LifecycleState::Running && (self.readiness)()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("app_name", &self.app_name)
            .field("codec", &self.codec)
            .field("lifecycle", &*self.lifecycle.borrow())
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl FromRef<AppState> for JwtCodec {
    fn from_ref(state: &AppState) -> Self {
        state.codec.clone()
    }
}

impl FromRef<AppState> for Arc<dyn MetricsSink> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}
