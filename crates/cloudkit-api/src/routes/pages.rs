//! 기본 페이지 핸들러: 시간, 버전, 메트릭, 정적 페이지, not-found.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::RequestInfo;
use crate::state::AppState;
use crate::version::AppInfo;

const NOT_FOUND_ERROR: &str = "404 page not found";
const NOT_FOUND_MESSAGE: &str = "the requested page does not exist on this server";

/// `GET /time` - 현재 서버 시각 (RFC 3339).
pub async fn time(info: RequestInfo) -> Json<serde_json::Value> {
    info.trace("GetTimeHandler");
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    Json(json!({ "time": now }))
}

/// `GET /version`
pub async fn version(State(state): State<AppState>, info: RequestInfo) -> Json<AppInfo> {
    info.trace("GetVersionHandler");
    Json(state.version.version_info())
}

/// `GET /metrics` - Prometheus 텍스트 노출 형식.
pub async fn metrics(State(state): State<AppState>, info: RequestInfo) -> Response {
    info.trace("GetMetricsHandler");
    match state.metrics.render() {
        Some(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// not-found 응답 본문.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundResponse {
    pub status: u16,
    pub error: String,
    pub message: String,
}

/// 매칭되지 않은 모든 요청의 fallback.
pub async fn not_found(State(state): State<AppState>, info: RequestInfo) -> Response {
    info.trace("GetHandlerNotFound");
    state.metrics.increment_not_found();
    let body = NotFoundResponse {
        status: StatusCode::NOT_FOUND.as_u16(),
        error: NOT_FOUND_ERROR.to_string(),
        message: NOT_FOUND_MESSAGE.to_string(),
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

/// 제목과 설명을 담은 정적 HTML 페이지를 만듭니다.
pub fn static_page(title: &str, description: &str) -> Html<String> {
    let title = escape_html(title);
    let description = escape_html(description);
    Html(format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <meta name=\"description\" content=\"{description}\"><title>{title}</title></head>\n\
         <body><div class=\"container\"><h4>{title}</h4></div></body></html>"
    ))
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
