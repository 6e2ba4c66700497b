//! 관리자 전용 데모 엔드포인트.

use axum::Json;

use super::RequestInfo;
use crate::auth::{require_admin, AuthError, Claims, Identity};

/// `GET /protected`
///
/// 인증 미들웨어 뒤에 등록해야 합니다. 관리자가 아니면 403.
pub async fn admin_claims(identity: Identity, info: RequestInfo) -> Result<Json<Claims>, AuthError> {
    info.trace("GetProtectedHandler");
    require_admin(&identity).inspect_err(|_| {
        tracing::error!(
            user_id = identity.user.id,
            login = %identity.user.login,
            "User is not admin"
        );
    })?;
    Ok(Json(identity.claims().clone()))
}
