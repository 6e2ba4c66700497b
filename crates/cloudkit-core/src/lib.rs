//! # CloudKit Core
//!
//! HTTP 서비스 스캐폴드가 공유하는 기반 타입을 제공합니다:
//! - 환경 변수 기반 설정 로드 및 검증
//! - 로깅 인프라
//! - 설정/부트스트랩 에러 타입

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    verify_password_complexity, AdminSettings, JwtSettings, ServerConfig, ServiceConfig,
    MAX_JWT_DURATION_MINUTES,
};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, LogConfig, LogFormat, LogTarget};
