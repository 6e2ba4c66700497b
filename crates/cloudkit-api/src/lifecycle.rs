//! 서버 생명주기 상태와 종료 시그널.
//!
//! 상태 전이는 `Running → ShuttingDown → Stopped` 한 방향뿐입니다.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 서버 생명주기 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    /// 새 연결을 받지 않고 진행 중인 요청을 기다리는 중
    ShuttingDown,
    Stopped,
}

/// 서빙 종료 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// 유예 시간 안에 모든 요청이 끝남
    Graceful,
    /// 유예 시간 초과로 남은 요청을 강제 종료함
    Forced,
}

/// 상태 전이를 게시하는 핸들.
#[derive(Debug)]
pub(crate) struct LifecycleHandle {
    tx: watch::Sender<LifecycleState>,
}

impl LifecycleHandle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(LifecycleState::Running);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// 다음 상태로만 이동합니다. 되돌리는 전이는 무시됩니다.
    pub(crate) fn advance(&self, next: LifecycleState) {
        self.tx.send_if_modified(|current| {
            let allowed = matches!(
                (*current, next),
                (LifecycleState::Running, LifecycleState::ShuttingDown)
                    | (LifecycleState::Running, LifecycleState::Stopped)
                    | (LifecycleState::ShuttingDown, LifecycleState::Stopped)
            );
            if allowed {
                *current = next;
            }
            allowed
        });
    }
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
/// 토큰이 다른 경로로 먼저 취소되면 그대로 반환합니다.
pub async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
        _ = shutdown_token.cancelled() => {
            return;
        }
    }

    shutdown_token.cancel();
    info!("Shutdown signal propagated");
}
