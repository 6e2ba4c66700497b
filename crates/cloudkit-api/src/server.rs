//! 라우터 구성과 서버 생명주기.
//!
//! 라우트는 `"<METHOD> <path>"` 또는 `"<path>"`(모든 메서드) 패턴으로
//! 등록합니다. 같은 메서드+경로를 다시 등록하면 마지막 등록이 이깁니다.
//! 메서드를 지정한 등록은 같은 경로의 메서드 미지정 등록보다 우선합니다.
//!
//! 미들웨어 순서 (바깥쪽부터): 메트릭 → trace → 타임아웃 → 강제 종료 → 라우트.
//! 인증 미들웨어는 `add_protected_route`로 등록한 라우트에만 적용됩니다.

use std::collections::BTreeMap;
use std::fmt;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    handler::Handler,
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use chrono::Utc;
use cloudkit_core::ServiceConfig;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::auth::{require_auth, Authenticator, JwtCodec, SimpleAdminAuthenticator, TokenError};
use crate::error::ServerError;
use crate::lifecycle::{LifecycleHandle, LifecycleState, ShutdownOutcome};
use crate::metrics::{MetricsSink, NoopSink};
use crate::middleware::track_metrics;
use crate::routes::{self, RequestInfo};
use crate::state::{AppState, ReadinessCheck};
use crate::version::{AppInfo, SimpleVersionReader, VersionReader};

/// 기본 요청 타임아웃 (초과 시 408).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// 기본 graceful shutdown 유예 시간.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// 라우트 등록에 사용할 수 있는 메서드.
const ROUTABLE_METHODS: [(Method, MethodFilter); 8] = [
    (Method::GET, MethodFilter::GET),
    (Method::HEAD, MethodFilter::HEAD),
    (Method::POST, MethodFilter::POST),
    (Method::PUT, MethodFilter::PUT),
    (Method::DELETE, MethodFilter::DELETE),
    (Method::PATCH, MethodFilter::PATCH),
    (Method::OPTIONS, MethodFilter::OPTIONS),
    (Method::TRACE, MethodFilter::TRACE),
];

fn method_filter(method: &Method) -> Option<MethodFilter> {
    ROUTABLE_METHODS
        .iter()
        .find(|(m, _)| m == method)
        .map(|(_, filter)| *filter)
}

/// `excluded`를 제외한 모든 메서드의 필터.
fn remaining_filter(excluded: &[Method]) -> Option<MethodFilter> {
    ROUTABLE_METHODS
        .iter()
        .filter(|(m, _)| !excluded.contains(m))
        .map(|(_, filter)| *filter)
        .reduce(|acc, filter| acc.or(filter))
}

/// 파싱된 라우트 패턴.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    /// `None`이면 모든 메서드
    pub method: Option<Method>,
    pub path: String,
}

impl FromStr for RoutePattern {
    type Err = ServerError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let pattern = pattern.trim();
        let (method, path) = match pattern.split_once(char::is_whitespace) {
            Some((method, path)) => {
                let method = Method::from_str(method)
                    .ok()
                    .filter(|m| method_filter(m).is_some())
                    .ok_or_else(|| {
                        ServerError::InvalidRoute(format!("unsupported method in {pattern:?}"))
                    })?;
                (Some(method), path.trim())
            }
            None => (None, pattern),
        };

        if !path.starts_with('/') {
            return Err(ServerError::InvalidRoute(format!(
                "path must start with '/' in {pattern:?}"
            )));
        }

        Ok(Self {
            method,
            path: path.to_string(),
        })
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{method} {}", self.path),
            None => f.write_str(&self.path),
        }
    }
}

type RouteFactory = Arc<dyn Fn(MethodFilter) -> MethodRouter<AppState> + Send + Sync>;

#[derive(Clone)]
struct RouteEntry {
    factory: RouteFactory,
    protected: bool,
}

/// 경로 → (메서드 → 핸들러). 메서드 키 `None`은 모든 메서드.
type RouteTable = BTreeMap<String, BTreeMap<Option<String>, RouteEntry>>;

/// [`Server`] 빌더.
pub struct ServerBuilder {
    app_name: String,
    listen_addr: SocketAddr,
    codec: JwtCodec,
    authenticator: Arc<dyn Authenticator>,
    version: Option<Arc<dyn VersionReader>>,
    metrics: Arc<dyn MetricsSink>,
    readiness: ReadinessCheck,
    shutdown_timeout: Duration,
    request_timeout: Duration,
}

impl ServerBuilder {
    pub fn new(codec: JwtCodec, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9999)),
            codec,
            authenticator,
            version: None,
            metrics: Arc::new(NoopSink),
            readiness: Arc::new(|| true),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// 검증된 서비스 설정에서 빌더를 만듭니다.
    ///
    /// 관리자 계정은 [`SimpleAdminAuthenticator`]로 검증합니다.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, TokenError> {
        let codec = JwtCodec::from_settings(&config.jwt)?;
        let authenticator = Arc::new(SimpleAdminAuthenticator::from_settings(&config.admin));
        Ok(Self::new(codec, authenticator)
            .app_name(config.app_name.clone())
            .listen_addr(config.server.socket_addr())
            .shutdown_timeout(config.shutdown_timeout))
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    pub fn version_reader(mut self, reader: Arc<dyn VersionReader>) -> Self {
        self.version = Some(reader);
        self
    }

    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    /// 준비 상태 판정 함수를 설정합니다 (`GET /readiness`).
    pub fn readiness(mut self, check: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.readiness = Arc::new(check);
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// 서버를 만들고 기본 라우트를 등록합니다.
    pub fn build(self) -> Result<Server, ServerError> {
        let version = self.version.unwrap_or_else(|| {
            Arc::new(SimpleVersionReader::new(AppInfo::new(
                self.app_name.clone(),
                env!("CARGO_PKG_VERSION"),
            )))
        });
        let lifecycle = LifecycleHandle::new();
        let state = AppState {
            app_name: Arc::from(self.app_name.as_str()),
            codec: self.codec,
            authenticator: self.authenticator,
            version,
            metrics: self.metrics,
            readiness: self.readiness,
            lifecycle: lifecycle.subscribe(),
            started_at: Utc::now(),
        };

        let mut server = Server {
            listen_addr: self.listen_addr,
            state,
            lifecycle,
            routes: RouteTable::new(),
            force_close: CancellationToken::new(),
            shutdown_timeout: self.shutdown_timeout,
            request_timeout: self.request_timeout,
        };
        server.add_route("GET /time", routes::time)?;
        server.add_route("GET /version", routes::version)?;
        server.add_route("GET /metrics", routes::metrics)?;
        server.add_route("GET /health", routes::health)?;
        server.add_route("GET /readiness", routes::readiness)?;
        server.add_route("POST /login", routes::login)?;
        Ok(server)
    }
}

/// HTTP 서버.
pub struct Server {
    listen_addr: SocketAddr,
    state: AppState,
    lifecycle: LifecycleHandle,
    routes: RouteTable,
    /// 유예 시간 초과 시 진행 중인 핸들러를 끊는 토큰
    force_close: CancellationToken,
    shutdown_timeout: Duration,
    request_timeout: Duration,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: Vec<String> = self
            .routes
            .iter()
            .flat_map(|(path, methods)| {
                methods.keys().map(move |method| match method {
                    Some(method) => format!("{method} {path}"),
                    None => path.clone(),
                })
            })
            .collect();
        f.debug_struct("Server")
            .field("listen_addr", &self.listen_addr)
            .field("routes", &routes)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Server {
    pub fn builder(codec: JwtCodec, authenticator: Arc<dyn Authenticator>) -> ServerBuilder {
        ServerBuilder::new(codec, authenticator)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// 생명주기 상태 구독.
    pub fn lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.subscribe()
    }

    /// 핸들러를 등록합니다.
    pub fn add_route<H, T>(&mut self, pattern: &str, handler: H) -> Result<(), ServerError>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.insert_route(pattern, handler, false)
    }

    /// 인증 미들웨어로 감싼 핸들러를 등록합니다.
    pub fn add_protected_route<H, T>(&mut self, pattern: &str, handler: H) -> Result<(), ServerError>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.insert_route(pattern, handler, true)
    }

    /// 정적 HTML 페이지를 등록합니다.
    pub fn add_static_page(
        &mut self,
        pattern: &str,
        title: &str,
        description: &str,
    ) -> Result<(), ServerError> {
        let page = routes::static_page(title, description);
        let handler_name = format!("GetStaticPageHandler[{title}]");
        self.add_route(pattern, move |info: RequestInfo| {
            let page = page.clone();
            let handler_name = handler_name.clone();
            async move {
                info.trace(&handler_name);
                page
            }
        })
    }

    /// `GET /` 루트 페이지를 등록합니다. 요청마다 루트 카운터를 증가시킵니다.
    pub fn add_root_page(&mut self, title: &str, description: &str) -> Result<(), ServerError> {
        let page = routes::static_page(title, description);
        self.add_route(
            "GET /",
            move |State(state): State<AppState>, info: RequestInfo| {
                let page = page.clone();
                async move {
                    info.trace("GetRootPageHandler");
                    state.metrics.increment_root_get();
                    page
                }
            },
        )
    }

    fn insert_route<H, T>(&mut self, pattern: &str, handler: H, protected: bool) -> Result<(), ServerError>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        let pattern: RoutePattern = pattern.parse()?;
        let factory: RouteFactory =
            Arc::new(move |filter: MethodFilter| -> MethodRouter<AppState> {
                on(filter, handler.clone())
            });
        let method_key = pattern.method.as_ref().map(|m| m.to_string());

        let replaced = self
            .routes
            .entry(pattern.path.clone())
            .or_default()
            .insert(method_key, RouteEntry { factory, protected })
            .is_some();
        if replaced {
            debug!(route = %pattern, "Route handler replaced");
        } else {
            debug!(route = %pattern, protected, "Route registered");
        }
        Ok(())
    }

    /// 등록된 라우트와 미들웨어로 Axum 라우터를 만듭니다.
    pub fn router(&self) -> Router {
        let mut router: Router<AppState> = Router::new();

        for (path, methods) in &self.routes {
            let claimed: Vec<Method> = methods
                .keys()
                .flatten()
                .filter_map(|m| Method::from_str(m).ok())
                .collect();

            let mut path_router: Option<MethodRouter<AppState>> = None;
            for (method, entry) in methods {
                let filter = match method {
                    Some(m) => Method::from_str(m).ok().as_ref().and_then(method_filter),
                    None => remaining_filter(&claimed),
                };
                let Some(filter) = filter else {
                    debug!(path = %path, "Catch-all route shadowed by method routes");
                    continue;
                };

                let mut method_router = (entry.factory)(filter);
                if entry.protected {
                    method_router = method_router.route_layer(middleware::from_fn_with_state(
                        self.state.codec.clone(),
                        require_auth,
                    ));
                }
                path_router = Some(match path_router {
                    Some(existing) => existing.merge(method_router),
                    None => method_router,
                });
            }

            if let Some(path_router) = path_router {
                router = router.route(path, path_router);
            }
        }

        router
            .fallback(routes::not_found)
            .layer(middleware::from_fn_with_state(
                self.force_close.clone(),
                cut_off_on_forced_shutdown,
            ))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.request_timeout,
            ))
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn_with_state(
                self.state.metrics.clone(),
                track_metrics,
            ))
            .with_state(self.state.clone())
    }

    /// 설정된 주소에 바인딩하고 종료 시그널까지 서빙합니다.
    pub async fn start(self, shutdown: CancellationToken) -> Result<ShutdownOutcome, ServerError> {
        let addr = self.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// 이미 바인딩된 리스너로 서빙합니다.
    ///
    /// `shutdown`이 취소되면 새 연결을 받지 않고 진행 중인 요청을 유예 시간만큼
    /// 기다립니다. 시간 안에 끝나면 [`ShutdownOutcome::Graceful`], 초과하면
    /// 남은 요청을 끊고 [`ShutdownOutcome::Forced`]를 반환합니다.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<ShutdownOutcome, ServerError> {
        let addr = listener.local_addr()?;
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let Server {
            lifecycle,
            force_close,
            shutdown_timeout,
            ..
        } = self;

        info!(%addr, "HTTP server listening");

        let signal = shutdown.clone();
        let serving = axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .into_future();
        tokio::pin!(serving);

        tokio::select! {
            result = &mut serving => {
                lifecycle.advance(LifecycleState::Stopped);
                result?;
                info!("HTTP server stopped");
                return Ok(ShutdownOutcome::Graceful);
            }
            _ = shutdown.cancelled() => {}
        }

        lifecycle.advance(LifecycleState::ShuttingDown);
        info!(
            grace_secs = shutdown_timeout.as_secs_f64(),
            "Shutdown signal received, waiting for in-flight requests"
        );

        let outcome = match tokio::time::timeout(shutdown_timeout, &mut serving).await {
            Ok(result) => {
                lifecycle.advance(LifecycleState::Stopped);
                result?;
                info!("Shutdown completed successfully");
                ShutdownOutcome::Graceful
            }
            Err(_) => {
                warn!(
                    grace_secs = shutdown_timeout.as_secs_f64(),
                    "Shutdown timed out, terminating outstanding connections"
                );
                force_close.cancel();
                lifecycle.advance(LifecycleState::Stopped);
                ShutdownOutcome::Forced
            }
        };

        Ok(outcome)
    }
}

/// 강제 종료 시 진행 중인 핸들러를 중단하고 503으로 응답합니다.
async fn cut_off_on_forced_shutdown(
    State(force_close): State<CancellationToken>,
    request: Request,
    next: Next,
) -> Response {
    tokio::select! {
        response = next.run(request) => response,
        _ = force_close.cancelled() => {
            (StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down").into_response()
        }
    }
}
