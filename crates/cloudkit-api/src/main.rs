//! 데모 HTTP 서버.
//!
//! 기본 라우트에 더해 다음을 등록합니다:
//! - `GET /`: 루트 페이지
//! - `GET /hello`: 정적 페이지
//! - `GET /protected`: 관리자 토큰이 필요한 엔드포인트

use std::sync::Arc;

use anyhow::Context;
use cloudkit_api::{
    routes::admin_claims, shutdown_signal, AppInfo, PrometheusSink, ServerBuilder,
    ShutdownOutcome, SimpleVersionReader,
};
use cloudkit_core::{init_logging, ServiceConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("설정 로드 실패")?;
    init_logging(&config.logging).context("로깅 초기화 실패")?;

    info!(
        app = %config.app_name,
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.socket_addr(),
        "Starting server..."
    );

    let metrics = PrometheusSink::new(&config.app_name).context("메트릭 레코더 생성 실패")?;
    let version = AppInfo::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        .with_repository(env!("CARGO_PKG_REPOSITORY"))
        .with_auth_url(format!("http://{}/login", config.server.socket_addr()));

    let mut server = ServerBuilder::from_config(&config)
        .context("토큰 코덱 생성 실패")?
        .metrics_sink(Arc::new(metrics))
        .version_reader(Arc::new(SimpleVersionReader::new(version)))
        .build()?;

    server.add_root_page(&config.app_name, "HTTP service scaffold")?;
    server.add_static_page("GET /hello", "Hello", "Hello World!")?;
    server.add_protected_route("GET /protected", admin_claims)?;

    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown_token.clone()));

    match server.start(shutdown_token).await? {
        ShutdownOutcome::Graceful => info!("Server shutdown complete"),
        ShutdownOutcome::Forced => warn!("Server shutdown forced after grace period"),
    }

    Ok(())
}
