//! JWT 토큰 발급/검증.
//!
//! HS512 대칭 서명을 사용합니다. 검증 순서는 구조 파싱, 서명 확인,
//! 등록 클레임 디코딩, 유효 구간 확인, 전체 클레임 디코딩입니다.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use cloudkit_core::JwtSettings;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::claims::{Claims, RegisteredClaims, UserIdentity};

/// 서명 알고리즘.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS512;

/// 토큰 처리 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// 서명기 생성 또는 서명 실패
    #[error("토큰 서명 실패: {0}")]
    Signing(String),
    /// 토큰 구조가 잘못됨
    #[error("잘못된 토큰 형식: {0}")]
    Malformed(String),
    /// 서명 불일치 또는 허용되지 않은 알고리즘
    #[error("토큰 서명이 유효하지 않습니다")]
    Signature,
    /// 현재 시각이 유효 구간 밖
    #[error("토큰 유효 기간이 아닙니다")]
    Expired,
    /// 페이로드가 예상 형태와 다름
    #[error("토큰 클레임 디코딩 실패: {0}")]
    ClaimsDecode(String),
}

impl TokenError {
    /// 로그용 에러 종류 이름.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Signing(_) => "signing",
            Self::Malformed(_) => "malformed",
            Self::Signature => "signature",
            Self::Expired => "expired",
            Self::ClaimsDecode(_) => "claims_decode",
        }
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::Signature,
        ErrorKind::Json(e) => TokenError::ClaimsDecode(e.to_string()),
        // InvalidToken, Base64, Utf8 등 구조 에러
        _ => TokenError::Malformed(err.to_string()),
    }
}

/// 현재 시각 공급자.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 수동으로 조작하는 시계 (초 단위).
///
/// 만료 동작을 실제 대기 없이 재현할 때 사용합니다.
#[derive(Debug)]
pub struct FixedClock {
    seconds: AtomicI64,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            seconds: AtomicI64::new(at.timestamp()),
        }
    }

    /// 시계를 앞으로 이동합니다.
    pub fn advance(&self, by: Duration) {
        self.seconds.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.seconds.store(at.timestamp(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

/// `now + ttl_minutes`. 1분 미만이거나 표현할 수 없는 시각이면 [`TokenError::Signing`].
fn expiry_after(now: DateTime<Utc>, ttl_minutes: i64) -> Result<DateTime<Utc>, TokenError> {
    if ttl_minutes < 1 {
        return Err(TokenError::Signing(format!(
            "token lifetime must be at least 1 minute (got {ttl_minutes})"
        )));
    }
    Duration::try_minutes(ttl_minutes)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| TokenError::Signing(format!("token lifetime out of range: {ttl_minutes}")))
}

fn build_claims(
    user: &UserIdentity,
    issuer: &str,
    ttl_minutes: i64,
    now: DateTime<Utc>,
) -> Result<Claims, TokenError> {
    let now = now.trunc_subsecs(0);
    let expires_at = expiry_after(now, ttl_minutes)?;

    Ok(Claims {
        token_id: uuid::Uuid::new_v4().to_string(),
        issuer: issuer.to_string(),
        issued_at: now,
        not_before: Some(now),
        expires_at,
        user: user.clone(),
    })
}

fn sign(claims: &Claims, key: &EncodingKey) -> Result<String, TokenError> {
    encode(&Header::new(TOKEN_ALGORITHM), claims, key)
        .map_err(|e| TokenError::Signing(e.to_string()))
}

fn validation() -> Validation {
    let mut validation = Validation::new(TOKEN_ALGORITHM);
    // 유효 구간은 주입된 시계로 직접 확인
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

fn verify_with_key(raw: &str, key: &DecodingKey, now: DateTime<Utc>) -> Result<Claims, TokenError> {
    decode_header(raw).map_err(|e| TokenError::Malformed(e.to_string()))?;

    let payload = decode::<serde_json::Value>(raw, key, &validation())
        .map_err(classify)?
        .claims;

    let registered: RegisteredClaims = serde_json::from_value(payload.clone())
        .map_err(|e| TokenError::ClaimsDecode(e.to_string()))?;
    if !registered.is_valid_at(now) {
        return Err(TokenError::Expired);
    }

    serde_json::from_value(payload).map_err(|e| TokenError::ClaimsDecode(e.to_string()))
}

/// 사용자 식별 정보로 서명된 토큰을 발급합니다.
///
/// `iat = nbf = now`, `exp = now + ttl_minutes`. 시크릿이 비어 있으면
/// [`TokenError::Signing`]을 반환합니다.
pub fn issue_token(
    user: &UserIdentity,
    issuer: &str,
    ttl_minutes: i64,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Signing("secret must not be empty".to_string()));
    }
    let claims = build_claims(user, issuer, ttl_minutes, now)?;
    sign(&claims, &EncodingKey::from_secret(secret))
}

/// 토큰을 검증하고 클레임을 반환합니다.
pub fn verify_token(raw: &str, secret: &[u8], now: DateTime<Utc>) -> Result<Claims, TokenError> {
    verify_with_key(raw, &DecodingKey::from_secret(secret), now)
}

/// 설정된 시크릿/발급자/유효 시간으로 토큰을 발급하고 검증하는 코덱.
///
/// 키는 생성 후 읽기 전용이므로 요청 간에 자유롭게 공유됩니다.
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl_minutes: i64,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCodec")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("ttl_minutes", &self.ttl_minutes)
            .field("clock", &self.clock)
            .finish()
    }
}

impl JwtCodec {
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl_minutes: i64) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Signing("secret must not be empty".to_string()));
        }
        expiry_after(Utc::now(), ttl_minutes)?;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            ttl_minutes,
            clock: Arc::new(SystemClock),
        })
    }

    /// 검증된 설정에서 코덱을 생성합니다.
    pub fn from_settings(settings: &JwtSettings) -> Result<Self, TokenError> {
        Self::new(
            settings.secret_bytes(),
            settings.issuer.clone(),
            settings.duration_minutes,
        )
    }

    /// 시계를 교체합니다.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    /// 현재 시계 기준으로 토큰을 발급합니다.
    pub fn issue(&self, user: &UserIdentity) -> Result<String, TokenError> {
        let claims = build_claims(user, &self.issuer, self.ttl_minutes, self.clock.now())?;
        let token = sign(&claims, &self.encoding_key)?;
        tracing::debug!(
            jti = %claims.token_id,
            login = %user.login,
            expires_at = %claims.expires_at,
            "Token issued"
        );
        Ok(token)
    }

    /// 현재 시계 기준으로 토큰을 검증합니다.
    pub fn verify(&self, raw: &str) -> Result<Claims, TokenError> {
        verify_with_key(raw, &self.decoding_key, self.clock.now())
    }
}
