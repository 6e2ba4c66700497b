//! 토큰 페이로드 모델.
//!
//! 등록 클레임(`jti`, `iss`, `iat`, `nbf`, `exp`)과 사용자 식별 정보(`User`)로
//! 구성됩니다. 로직 없는 순수 데이터 계약입니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 인증된 사용자 식별 정보.
///
/// 인증기가 검증된 자격증명으로부터 생성하며 발급 후에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// 사용자 ID
    #[serde(rename = "user_id")]
    pub id: i64,
    /// 표시 이름
    #[serde(rename = "user_name")]
    pub name: String,
    /// 이메일
    #[serde(rename = "user_email")]
    pub email: String,
    /// 로그인 ID
    #[serde(rename = "user_login")]
    pub login: String,
    /// 관리자 여부
    pub is_admin: bool,
}

/// 토큰 페이로드.
///
/// 불변식: `issued_at <= not_before <= expires_at`. `expires_at`은 필수입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID - 발급마다 고유
    #[serde(rename = "jti")]
    pub token_id: String,
    /// 발급자
    #[serde(rename = "iss")]
    pub issuer: String,
    /// 발급 시각
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    /// 유효 시작 시각 (없으면 하한 없음)
    #[serde(
        rename = "nbf",
        with = "chrono::serde::ts_seconds_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub not_before: Option<DateTime<Utc>>,
    /// 만료 시각
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
    /// 토큰 주체
    #[serde(rename = "User")]
    pub user: UserIdentity,
}

impl Claims {
    /// `now`가 `[not_before, expires_at]` 구간 안에 있는지 확인 (양 끝 포함).
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        validity_window_contains(self.not_before, self.expires_at, now)
    }

    /// 관리자 토큰 여부.
    pub fn is_admin(&self) -> bool {
        self.user.is_admin
    }
}

/// 서명 검증 직후 확인하는 등록 클레임.
///
/// 전체 [`Claims`] 디코딩 전에 유효 구간만 먼저 판정하기 위해 사용합니다.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RegisteredClaims {
    #[serde(default)]
    pub nbf: Option<i64>,
    pub exp: i64,
}

impl RegisteredClaims {
    pub(crate) fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let ts = now.timestamp();
        self.nbf.map_or(true, |nbf| nbf <= ts) && ts <= self.exp
    }
}

fn validity_window_contains(
    not_before: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    not_before.map_or(true, |nbf| nbf <= now) && now <= expires_at
}
