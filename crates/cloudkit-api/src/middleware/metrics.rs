//! HTTP 요청 metrics middleware.
//!
//! 모든 요청(인증 실패와 not-found 포함)을 주입된 [`MetricsSink`]에 기록합니다.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::{MatchedPath, Request, State},
    http::{header::CONTENT_LENGTH, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::metrics::{HttpObservation, MetricsSink, UNMATCHED_HANDLER};

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// HTTP 메트릭을 수집하는 미들웨어.
///
/// `handler` 라벨은 매칭된 라우트 템플릿이며, 매칭되지 않은 요청은
/// 모두 [`UNMATCHED_HANDLER`] 하나로 묶습니다.
pub async fn track_metrics(
    State(sink): State<Arc<dyn MetricsSink>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let method = request.method().to_string();
    let handler = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_HANDLER.to_string());
    let request_bytes = content_length(request.headers())
        .or_else(|| request.body().size_hint().exact())
        .unwrap_or(0);

    let response = next.run(request).await;

    let response_bytes = response
        .body()
        .size_hint()
        .exact()
        .or_else(|| content_length(response.headers()))
        .unwrap_or(0);

    sink.observe_request(&HttpObservation {
        method,
        handler,
        status: response.status().as_u16(),
        duration: start.elapsed(),
        request_bytes,
        response_bytes,
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingSink {
        observations: Mutex<Vec<HttpObservation>>,
    }

    impl MetricsSink for RecordingSink {
        fn observe_request(&self, observation: &HttpObservation) {
            self.observations.lock().unwrap().push(observation.clone());
        }

        fn increment_root_get(&self) {}

        fn increment_not_found(&self) {}

        fn render(&self) -> Option<String> {
            None
        }
    }

    async fn test_handler() -> &'static str {
        "OK"
    }

    fn app(sink: Arc<RecordingSink>) -> Router {
        let sink: Arc<dyn MetricsSink> = sink;
        Router::new()
            .route("/test", get(test_handler))
            .route("/orders/{id}", get(test_handler))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn_with_state(sink, track_metrics))
    }

    #[tokio::test]
    async fn test_records_matched_route() {
        let sink = Arc::new(RecordingSink::default());
        let request = Request::builder()
            .method(Method::GET)
            .uri("/orders/123")
            .body(Body::empty())
            .unwrap();

        let response = app(sink.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let observations = sink.observations.lock().unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].method, "GET");
        assert_eq!(observations[0].handler, "/orders/{id}");
        assert_eq!(observations[0].status, 200);
        assert_eq!(observations[0].response_bytes, 2);
    }

    #[tokio::test]
    async fn test_unmatched_routes_share_one_label() {
        let sink = Arc::new(RecordingSink::default());
        for uri in ["/missing/42", "/scan-1x", "/wp-admin/setup.php"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app(sink.clone()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        let observations = sink.observations.lock().unwrap();
        assert_eq!(observations.len(), 3);
        assert!(observations
            .iter()
            .all(|o| o.handler == UNMATCHED_HANDLER && o.status == 404));
    }

    #[tokio::test]
    async fn test_request_size_from_content_length() {
        let sink = Arc::new(RecordingSink::default());
        let request = Request::builder()
            .method(Method::GET)
            .uri("/test")
            .header(CONTENT_LENGTH, "5")
            .body(Body::from("hello"))
            .unwrap();

        app(sink.clone()).oneshot(request).await.unwrap();
        assert_eq!(sink.observations.lock().unwrap()[0].request_bytes, 5);
    }
}
