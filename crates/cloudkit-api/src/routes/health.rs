//! Health/readiness 엔드포인트.
//!
//! Kubernetes liveness/readiness probe용입니다. 본문은 비어 있습니다.

use axum::{extract::State, http::StatusCode};

use super::RequestInfo;
use crate::state::AppState;

/// Liveness probe - 프로세스가 응답하면 항상 200.
pub async fn health(info: RequestInfo) -> StatusCode {
    info.trace("GetHealthHandler");
    StatusCode::OK
}

/// Readiness probe.
///
/// 준비 판정이 거짓이거나 종료 중이면 503을 반환합니다.
pub async fn readiness(State(state): State<AppState>, info: RequestInfo) -> StatusCode {
    info.trace("GetReadinessHandler");
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
