//! Axum용 JWT 인증 미들웨어와 신원 추출기.
//!
//! 미들웨어는 토큰을 검증한 뒤 [`Identity`]를 요청 extensions에 넣습니다.
//! 핸들러는 토큰을 다시 파싱하지 않고 [`Identity`] 추출기로만 호출자를
//! 확인합니다.

use std::ops::Deref;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, header::SEC_WEBSOCKET_PROTOCOL, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::claims::Claims;
use super::error::AuthError;
use super::jwt::JwtCodec;

const BEARER_PREFIX: &str = "Bearer ";
/// 웹소켓 서브프로토콜로 전달할 때 붙는 접두어.
const SUBPROTOCOL_PREFIX: &str = "Authorization, ";
/// 로그에 남길 토큰 접두어 길이.
const LOGGED_PREFIX_CHARS: usize = 8;

/// 요청 범위 신원 정보.
///
/// 인증 미들웨어를 통과한 요청에서만 존재합니다.
#[derive(Debug, Clone)]
pub struct Identity(pub Arc<Claims>);

impl Identity {
    pub fn claims(&self) -> &Claims {
        &self.0
    }
}

impl Deref for Identity {
    type Target = Claims;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AuthError::MissingIdentity)
    }
}

/// 요청 헤더에서 bearer 토큰을 꺼냅니다.
///
/// `Authorization`이 없거나 비어 있을 때만 `Sec-WebSocket-Protocol`을 사용합니다.
/// 공백뿐이거나 읽을 수 없는 값도 자격증명으로 취급하므로 검증에서 거부됩니다.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = [AUTHORIZATION, SEC_WEBSOCKET_PROTOCOL]
        .iter()
        .filter_map(|name| headers.get(name))
        .find(|value| !value.is_empty())?;

    let raw = value.to_str().unwrap_or_default().trim();
    let raw = raw.strip_prefix(SUBPROTOCOL_PREFIX).unwrap_or(raw);
    let token = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw).trim();
    Some(token)
}

fn token_prefix(token: &str) -> String {
    token.chars().take(LOGGED_PREFIX_CHARS).collect()
}

/// JWT 인증 미들웨어.
///
/// - 헤더 없음: 400 `Authorization header missing`
/// - 검증 실패: 401 `Invalid token` (원인은 로그에만 기록)
/// - 성공: [`Identity`]를 extensions에 추가하고 다음 핸들러 호출
pub async fn require_auth(
    State(codec): State<JwtCodec>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(token) = extract_bearer(request.headers()) else {
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            "Authorization header missing"
        );
        return Err(AuthError::MissingAuthorization);
    };

    let claims = codec.verify(token).map_err(|e| {
        tracing::error!(
            kind = e.kind(),
            error = %e,
            token_len = token.len(),
            token_prefix = %token_prefix(token),
            "Token verification failed"
        );
        AuthError::InvalidToken(e)
    })?;

    tracing::debug!(
        login = %claims.user.login,
        jti = %claims.token_id,
        "Request authorized"
    );
    request.extensions_mut().insert(Identity(Arc::new(claims)));

    Ok(next.run(request).await)
}

/// 관리자 전용 라우트 검사.
pub fn require_admin(claims: &Claims) -> Result<(), AuthError> {
    if claims.is_admin() {
        Ok(())
    } else {
        Err(AuthError::Forbidden("User is not admin"))
    }
}
