//! HTTP 응답으로 변환되는 인증/인가 에러.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::jwt::TokenError;

/// 인증 에러.
///
/// 클라이언트에게는 고정 메시지만 보내고, 내부 원인은 서버 로그에만 남깁니다.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization 헤더가 없습니다")]
    MissingAuthorization,

    #[error("유효하지 않은 토큰: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("잘못된 자격증명")]
    InvalidCredentials,

    #[error("권한이 부족합니다: {0}")]
    Forbidden(&'static str),

    #[error("알 수 없는 사용자: {0}")]
    UnknownUser(String),

    /// 인증 미들웨어로 감싸지 않은 라우트에서 신원 정보를 요청함
    #[error("요청에 인증 정보가 없습니다")]
    MissingIdentity,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingAuthorization => StatusCode::BAD_REQUEST,
            Self::InvalidToken(_) | Self::InvalidCredentials | Self::UnknownUser(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MissingIdentity => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 클라이언트에게 보이는 메시지.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MissingAuthorization => "Authorization header missing",
            Self::InvalidToken(_) => "Invalid token",
            Self::InvalidCredentials | Self::UnknownUser(_) => "Invalid credentials",
            Self::Forbidden(message) => message,
            Self::MissingIdentity => "Internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::MissingIdentity = self {
            tracing::error!("Identity requested on a route without auth middleware");
        }
        (self.status_code(), self.public_message()).into_response()
    }
}
