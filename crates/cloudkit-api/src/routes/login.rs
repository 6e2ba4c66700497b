//! 로그인 엔드포인트.

use axum::{
    extract::{rejection::FormRejection, State},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use super::RequestInfo;
use crate::auth::AuthError;
use crate::state::AppState;

/// 로그인 폼 (`application/x-www-form-urlencoded`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub login: String,
    /// 클라이언트가 계산한 비밀번호 SHA-256 hex
    #[serde(default)]
    pub hashed: String,
}

/// 로그인 성공 응답.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// `POST /login`
///
/// 성공 시 200 `{"token": ...}`, 그 외에는 401 `Invalid credentials`.
pub async fn login(
    State(state): State<AppState>,
    info: RequestInfo,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, AuthError> {
    info.trace("GetLoginPostHandler");

    let Form(form) = form.map_err(|e| {
        tracing::debug!(error = %e, "Login form rejected");
        AuthError::InvalidCredentials
    })?;

    // 공백만 있는 로그인은 거부하고, 인증에는 입력값을 그대로 사용
    let login = form.login.as_str();
    if login.trim().is_empty() {
        return Err(AuthError::InvalidCredentials);
    }
    if !state.authenticator.authenticate_user(login, &form.hashed) {
        return Err(AuthError::InvalidCredentials);
    }

    let user = state.authenticator.user_info_from_login(login)?;
    let token = state.codec.issue(&user).map_err(|e| {
        tracing::error!(error = %e, login = %login, "Token issuance failed");
        AuthError::InvalidCredentials
    })?;

    tracing::info!(login = %user.login, user_id = user.id, "Login successful");
    Ok(Json(TokenResponse { token }))
}
