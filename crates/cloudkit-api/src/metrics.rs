//! Prometheus 메트릭 수집.
//!
//! 전역 레코더를 설치하지 않습니다. 서버 빌더에 [`MetricsSink`]를 주입하고,
//! [`PrometheusSink`]는 자신의 레코더에만 기록합니다.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

/// 매칭된 라우트가 없는 요청의 `handler` 라벨.
///
/// 요청 경로를 라벨로 쓰지 않으므로 임의 경로 스캔이 시계열을 늘리지 않습니다.
pub const UNMATCHED_HANDLER: &str = "not_found";

/// 요청 지속 시간 히스토그램 버킷 (0.1초부터 1.5배씩 5개).
pub const DURATION_BUCKETS: [f64; 5] = [0.1, 0.15, 0.225, 0.3375, 0.50625];

/// 하나의 HTTP 요청 처리 결과.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpObservation {
    pub method: String,
    /// 라우트 템플릿 또는 [`UNMATCHED_HANDLER`]
    pub handler: String,
    pub status: u16,
    pub duration: Duration,
    pub request_bytes: u64,
    pub response_bytes: u64,
}

/// 계측 싱크.
///
/// 구현체는 내부적으로 동기화되어야 합니다. 호출자는 증가/관측만 합니다.
pub trait MetricsSink: Send + Sync + 'static {
    fn observe_request(&self, observation: &HttpObservation);

    /// 루트 페이지 GET 카운터 증가.
    fn increment_root_get(&self);

    /// not-found 카운터 증가.
    fn increment_not_found(&self);

    /// 텍스트 노출 형식으로 렌더링합니다. 지원하지 않으면 `None`.
    fn render(&self) -> Option<String>;
}

/// 아무것도 기록하지 않는 싱크.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn observe_request(&self, _observation: &HttpObservation) {}

    fn increment_root_get(&self) {}

    fn increment_not_found(&self) {}

    fn render(&self) -> Option<String> {
        None
    }
}

/// 비전역 Prometheus 레코더 기반 싱크.
pub struct PrometheusSink {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    root_get_counter: String,
    not_found_counter: String,
}

impl std::fmt::Debug for PrometheusSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusSink")
            .field("root_get_counter", &self.root_get_counter)
            .field("not_found_counter", &self.not_found_counter)
            .finish()
    }
}

impl PrometheusSink {
    /// `app_name`을 카운터 이름 접두어로 사용하는 싱크를 생성합니다.
    pub fn new(app_name: &str) -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full("http_request_duration_seconds".to_string()),
                &DURATION_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();

        let prefix = metric_prefix(app_name);
        let sink = Self {
            recorder,
            handle,
            root_get_counter: format!("{prefix}_root_get_request_count"),
            not_found_counter: format!("{prefix}_root_not_found_request_count"),
        };
        sink.describe(app_name);
        Ok(sink)
    }

    fn describe(&self, app_name: &str) {
        metrics::with_local_recorder(&self.recorder, || {
            describe_counter!("http_requests_total", "Tracks the number of HTTP requests.");
            describe_histogram!(
                "http_request_duration_seconds",
                Unit::Seconds,
                "Tracks the latencies for HTTP requests."
            );
            describe_histogram!(
                "http_request_size_bytes",
                Unit::Bytes,
                "Tracks the size of HTTP requests."
            );
            describe_histogram!(
                "http_response_size_bytes",
                Unit::Bytes,
                "Tracks the size of HTTP responses."
            );
            describe_counter!(
                self.root_get_counter.clone(),
                format!("Number of GET request handled by {app_name} default root handler")
            );
            describe_counter!(
                self.not_found_counter.clone(),
                format!("Number of page not found handled by {app_name} default root handler")
            );
        });
    }
}

impl MetricsSink for PrometheusSink {
    fn observe_request(&self, observation: &HttpObservation) {
        let method = observation.method.clone();
        let handler = observation.handler.clone();
        let code = observation.status.to_string();
        metrics::with_local_recorder(&self.recorder, || {
            counter!(
                "http_requests_total",
                "method" => method.clone(),
                "handler" => handler.clone(),
                "code" => code.clone()
            )
            .increment(1);
            histogram!(
                "http_request_duration_seconds",
                "method" => method.clone(),
                "handler" => handler.clone(),
                "code" => code.clone()
            )
            .record(observation.duration.as_secs_f64());
            histogram!(
                "http_request_size_bytes",
                "method" => method.clone(),
                "handler" => handler.clone(),
                "code" => code.clone()
            )
            .record(observation.request_bytes as f64);
            histogram!(
                "http_response_size_bytes",
                "method" => method,
                "handler" => handler,
                "code" => code
            )
            .record(observation.response_bytes as f64);
        });
    }

    fn increment_root_get(&self) {
        metrics::with_local_recorder(&self.recorder, || {
            counter!(self.root_get_counter.clone()).increment(1);
        });
    }

    fn increment_not_found(&self) {
        metrics::with_local_recorder(&self.recorder, || {
            counter!(self.not_found_counter.clone()).increment(1);
        });
    }

    fn render(&self) -> Option<String> {
        Some(self.handle.render())
    }
}

/// 메트릭 이름에 쓸 수 없는 문자를 `_`로 바꿉니다.
fn metric_prefix(app_name: &str) -> String {
    app_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
