//! 토큰 발급/검증 속성 테스트

use chrono::{TimeZone, Utc};
use cloudkit_api::{
    auth::{issue_token, verify_token},
    TokenError, UserIdentity,
};
use proptest::prelude::*;

fn user_strategy() -> impl Strategy<Value = UserIdentity> {
    (
        any::<i64>(),
        "[A-Za-z ]{0,24}",
        "[a-z0-9.]{1,16}@[a-z]{1,10}\\.org",
        "[a-z0-9_]{5,20}",
        any::<bool>(),
    )
        .prop_map(|(id, name, email, login, is_admin)| UserIdentity {
            id,
            name,
            email,
            login,
            is_admin,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_issued_token_verifies_to_same_identity(
        user in user_strategy(),
        secret in proptest::collection::vec(any::<u8>(), 1..64),
        ttl_minutes in 1i64..10_000,
        issued_secs in 1_000_000_000i64..2_000_000_000,
        elapsed_secs in 0i64..60,
    ) {
        let issued_at = Utc.timestamp_opt(issued_secs, 0).unwrap();
        let token = issue_token(&user, "prop-issuer", ttl_minutes, &secret, issued_at).unwrap();

        let now = issued_at + chrono::Duration::seconds(elapsed_secs);
        let claims = verify_token(&token, &secret, now).unwrap();

        prop_assert_eq!(&claims.user, &user);
        prop_assert_eq!(claims.issuer.as_str(), "prop-issuer");
        prop_assert_eq!(claims.issued_at, issued_at);
        prop_assert_eq!(claims.expires_at, issued_at + chrono::Duration::minutes(ttl_minutes));
    }

    #[test]
    fn test_token_rejected_with_other_secret(
        user in user_strategy(),
        secret in proptest::collection::vec(any::<u8>(), 1..64),
        other in proptest::collection::vec(any::<u8>(), 1..64),
    ) {
        prop_assume!(secret != other);
        let now = Utc::now();
        let token = issue_token(&user, "prop-issuer", 60, &secret, now).unwrap();

        prop_assert_eq!(verify_token(&token, &other, now), Err(TokenError::Signature));
    }

    #[test]
    fn test_token_rejected_after_expiry(
        user in user_strategy(),
        ttl_minutes in 1i64..1_000,
        late_secs in 1i64..100_000,
    ) {
        let secret = b"prop-expiry-secret";
        let issued_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let token = issue_token(&user, "prop-issuer", ttl_minutes, secret, issued_at).unwrap();

        let now = issued_at + chrono::Duration::minutes(ttl_minutes) + chrono::Duration::seconds(late_secs);
        prop_assert_eq!(verify_token(&token, secret, now), Err(TokenError::Expired));
    }
}
