//! 서버 생명주기 에러.

use std::net::SocketAddr;

/// 서버 에러.
///
/// 바인딩 실패와 라우트 등록 실패는 치명적입니다. 종료 대기 시간 초과는
/// 에러가 아니라 [`crate::lifecycle::ShutdownOutcome::Forced`]로 보고됩니다.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{addr} 바인딩 실패: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("서버 실행 에러: {0}")]
    Serve(#[from] std::io::Error),

    #[error("잘못된 라우트 패턴: {0}")]
    InvalidRoute(String),
}
