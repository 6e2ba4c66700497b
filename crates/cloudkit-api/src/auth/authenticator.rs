//! 로그인 자격증명 검증.

use cloudkit_core::AdminSettings;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use super::claims::UserIdentity;
use super::error::AuthError;

/// 자격증명 검증기.
///
/// 비밀번호는 클라이언트가 미리 해시한 값(`hashed`)으로 전달됩니다.
pub trait Authenticator: Send + Sync {
    /// 로그인과 비밀번호 해시가 일치하는지 확인합니다.
    fn authenticate_user(&self, login: &str, password_hash: &str) -> bool;

    /// 로그인에 해당하는 사용자 식별 정보를 생성합니다.
    fn user_info_from_login(&self, login: &str) -> Result<UserIdentity, AuthError>;
}

/// 비밀번호의 SHA-256 hex 다이제스트 (소문자).
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// 고정 관리자 계정 하나만 아는 인증기.
///
/// 해시 비교는 일반 문자열 비교입니다 (상수 시간 아님).
#[derive(Debug, Clone)]
pub struct SimpleAdminAuthenticator {
    login: String,
    password_hash: String,
    email: String,
    id: i64,
}

impl SimpleAdminAuthenticator {
    pub fn new(login: impl Into<String>, password: &str, email: impl Into<String>, id: i64) -> Self {
        let login = login.into();
        tracing::info!(admin = %login, "Simple admin authenticator configured");
        Self {
            login,
            password_hash: password_digest(password),
            email: email.into(),
            id,
        }
    }

    pub fn from_settings(settings: &AdminSettings) -> Self {
        Self::new(
            settings.login.clone(),
            settings.password.expose_secret(),
            settings.email.clone(),
            settings.id,
        )
    }
}

impl Authenticator for SimpleAdminAuthenticator {
    fn authenticate_user(&self, login: &str, password_hash: &str) -> bool {
        if login == self.login && password_hash == self.password_hash {
            return true;
        }
        tracing::warn!(login = %login, "Authentication failed");
        false
    }

    fn user_info_from_login(&self, login: &str) -> Result<UserIdentity, AuthError> {
        if login != self.login {
            return Err(AuthError::UnknownUser(login.to_string()));
        }
        Ok(UserIdentity {
            id: self.id,
            name: "Administrator".to_string(),
            email: self.email.clone(),
            login: self.login.clone(),
            is_admin: true,
        })
    }
}
