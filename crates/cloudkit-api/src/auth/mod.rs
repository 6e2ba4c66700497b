//! 인증 및 인가 모듈.
//!
//! - 토큰 페이로드 모델 (`Claims`, `UserIdentity`)
//! - HS512 토큰 발급/검증 (`JwtCodec`)
//! - 로그인 자격증명 검증 (`Authenticator`)
//! - 요청 인증 미들웨어와 신원 추출기 (`require_auth`, `Identity`)

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod jwt;
pub mod middleware;

pub use authenticator::{password_digest, Authenticator, SimpleAdminAuthenticator};
pub use claims::{Claims, UserIdentity};
pub use error::AuthError;
pub use jwt::{issue_token, verify_token, Clock, FixedClock, JwtCodec, SystemClock, TokenError};
pub use middleware::{extract_bearer, require_admin, require_auth, Identity};
