//! 서비스 설정 및 부트스트랩 에러 타입.
//!
//! 시작 시점에 발생하는 에러는 모두 치명적입니다. 호출자는 진단 메시지를
//! 로깅한 뒤 프로세스를 종료해야 합니다.

use thiserror::Error;

/// 설정 에러.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 필수 설정값 누락
    #[error("필수 설정값이 없습니다: {0}")]
    Missing(&'static str),

    /// 유효하지 않은 설정값
    #[error("잘못된 설정값 {key}: {reason}")]
    Invalid {
        key: &'static str,
        reason: String,
    },

    /// 설정 소스 읽기/역직렬화 실패
    #[error("설정 소스 에러: {0}")]
    Source(#[from] config::ConfigError),

    /// 로깅 초기화 실패
    #[error("로깅 초기화 실패: {0}")]
    Logging(String),
}

impl ConfigError {
    /// `Invalid` 에러 생성 헬퍼.
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }

    /// 에러가 가리키는 설정 키.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::Missing(key) | Self::Invalid { key, .. } => Some(key),
            Self::Source(_) | Self::Logging(_) => None,
        }
    }
}

/// 설정 작업을 위한 Result 타입.
pub type ConfigResult<T> = Result<T, ConfigError>;
