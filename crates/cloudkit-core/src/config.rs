//! 설정 관리.
//!
//! 기본값 + 프로세스 환경 변수(선택적으로 `.env`)에서 서비스 설정을 읽고,
//! 검증된 강타입 [`ServiceConfig`]로 변환합니다. 검증 실패는 모두
//! [`ConfigError`]이며 시작 시점에 치명적입니다.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};
use crate::logging::{LogConfig, LogFormat, LogTarget};

/// 관리자 로그인 최소 길이 (유니코드 문자 수).
pub const MIN_ADMIN_USER_LENGTH: usize = 5;
/// 관리자 비밀번호 최소 길이 (유니코드 문자 수).
pub const MIN_ADMIN_PASSWORD_LENGTH: usize = 8;
/// JWT 시크릿 최소 길이.
pub const MIN_JWT_SECRET_LENGTH: usize = 16;
/// 토큰 유효 시간 상한 (10년, 분 단위).
pub const MAX_JWT_DURATION_MINUTES: i64 = 60 * 24 * 366 * 10;

/// 서비스 전체 설정.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// 애플리케이션 이름 (메트릭 접두어로도 사용)
    pub app_name: String,
    /// 리스너 설정
    pub server: ServerConfig,
    /// 토큰 서명/검증 설정
    pub jwt: JwtSettings,
    /// 고정 관리자 계정
    pub admin: AdminSettings,
    /// graceful shutdown 유예 시간
    pub shutdown_timeout: Duration,
    /// 로깅 설정
    pub logging: LogConfig,
}

/// 리스너 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// 바인딩할 IP
    pub ip: IpAddr,
    /// 리스닝할 포트
    pub port: u16,
}

impl ServerConfig {
    /// 소켓 주소 반환.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

/// JWT 설정.
#[derive(Debug, Clone)]
pub struct JwtSettings {
    /// HMAC 서명 시크릿
    pub secret: SecretString,
    /// `iss` 클레임 값
    pub issuer: String,
    /// 토큰 유효 시간 (분)
    pub duration_minutes: i64,
}

/// 관리자 계정 설정.
#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub login: String,
    pub password: SecretString,
    pub email: String,
    pub id: i64,
}

/// 소스에서 읽은 검증 전 값.
#[derive(Debug, Deserialize)]
struct RawConfig {
    app_name: String,
    server_ip: String,
    port: i64,
    jwt_secret: Option<String>,
    jwt_issuer_id: Option<String>,
    jwt_duration_minutes: i64,
    admin_user: String,
    admin_password: Option<String>,
    admin_email: String,
    admin_id: i64,
    shutdown_timeout_secs: i64,
    log_level: String,
    log_format: String,
    log_file: String,
}

impl ServiceConfig {
    /// 기본값이 채워진 설정 빌더.
    ///
    /// 테스트나 임베딩 애플리케이션은 여기에 `set_override`/`add_source`를
    /// 추가한 뒤 [`ServiceConfig::from_config`]로 넘깁니다.
    pub fn defaults() -> ConfigResult<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            .set_default("app_name", "cloudkit")?
            .set_default("server_ip", "0.0.0.0")?
            .set_default("port", 9999)?
            .set_default("jwt_duration_minutes", 60)?
            .set_default("admin_user", "goadmin")?
            .set_default("admin_email", "goadmin@yourdomain.org")?
            .set_default("admin_id", 960901)?
            .set_default("shutdown_timeout_secs", 2)?
            .set_default("log_level", "info")?
            .set_default("log_format", "pretty")?
            .set_default("log_file", "stderr")?;
        Ok(builder)
    }

    /// 환경 변수에서 설정을 로드합니다.
    ///
    /// `.env` 파일이 있으면 먼저 읽습니다. 키는 `PORT`, `JWT_SECRET`,
    /// `ADMIN_PASSWORD` 같은 대문자 이름을 그대로 사용합니다.
    pub fn from_env() -> ConfigResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }

        let config = Self::defaults()?
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        Self::from_config(config)
    }

    /// 빌드된 [`Config`]를 검증하여 `ServiceConfig`로 변환합니다.
    pub fn from_config(config: Config) -> ConfigResult<Self> {
        let raw: RawConfig = config.try_deserialize()?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> ConfigResult<Self> {
        let app_name = raw.app_name.trim().to_string();
        if app_name.is_empty() {
            return Err(ConfigError::invalid("APP_NAME", "must not be empty"));
        }

        let ip: IpAddr = raw
            .server_ip
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid("SERVER_IP", format!("{e}")))?;
        let port = validate_port(raw.port)?;

        let secret = raw
            .jwt_secret
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if secret.chars().count() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::invalid(
                "JWT_SECRET",
                format!("should contain at least {MIN_JWT_SECRET_LENGTH} characters"),
            ));
        }

        let issuer = raw
            .jwt_issuer_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_ISSUER_ID"))?;

        if !(1..=MAX_JWT_DURATION_MINUTES).contains(&raw.jwt_duration_minutes) {
            return Err(ConfigError::invalid(
                "JWT_DURATION_MINUTES",
                format!(
                    "should be between 1 and {MAX_JWT_DURATION_MINUTES} minutes (got {})",
                    raw.jwt_duration_minutes
                ),
            ));
        }

        let admin_login = validate_admin_user(&raw.admin_user)?;
        let admin_password = raw
            .admin_password
            .ok_or(ConfigError::Missing("ADMIN_PASSWORD"))?;
        validate_admin_password(&admin_password)?;

        if !raw.admin_email.contains('@') {
            return Err(ConfigError::invalid(
                "ADMIN_EMAIL",
                "should be a valid email address",
            ));
        }
        if raw.admin_id < 1 {
            return Err(ConfigError::invalid("ADMIN_ID", "should be a positive integer"));
        }

        if raw.shutdown_timeout_secs < 1 {
            return Err(ConfigError::invalid(
                "SHUTDOWN_TIMEOUT_SECS",
                "should be at least 1 second",
            ));
        }

        let format: LogFormat = raw
            .log_format
            .parse()
            .map_err(|e: String| ConfigError::invalid("LOG_FORMAT", e))?;
        let target = LogTarget::parse(&raw.log_file)?;

        Ok(Self {
            app_name,
            server: ServerConfig { ip, port },
            jwt: JwtSettings {
                secret: SecretString::new(secret.into()),
                issuer,
                duration_minutes: raw.jwt_duration_minutes,
            },
            admin: AdminSettings {
                login: admin_login,
                password: SecretString::new(admin_password.into()),
                email: raw.admin_email,
                id: raw.admin_id,
            },
            shutdown_timeout: Duration::from_secs(raw.shutdown_timeout_secs as u64),
            logging: LogConfig::new(raw.log_level)
                .with_format(format)
                .with_target(target),
        })
    }
}

impl JwtSettings {
    /// 시크릿 바이트 (서명 시점에만 노출).
    pub fn secret_bytes(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }
}

/// 포트 범위 검증 (1..=65535).
pub fn validate_port(port: i64) -> ConfigResult<u16> {
    if !(1..=65535).contains(&port) {
        return Err(ConfigError::invalid(
            "PORT",
            format!("should contain an integer between 1 and 65535 (got {port})"),
        ));
    }
    Ok(port as u16)
}

/// 관리자 로그인 검증.
pub fn validate_admin_user(login: &str) -> ConfigResult<String> {
    let count = login.chars().count();
    if count < MIN_ADMIN_USER_LENGTH {
        return Err(ConfigError::invalid(
            "ADMIN_USER",
            format!("should contain at least {MIN_ADMIN_USER_LENGTH} characters (got {count})"),
        ));
    }
    Ok(login.to_string())
}

/// 관리자 비밀번호 길이 및 복잡도 검증.
pub fn validate_admin_password(password: &str) -> ConfigResult<()> {
    let count = password.chars().count();
    if count < MIN_ADMIN_PASSWORD_LENGTH {
        return Err(ConfigError::invalid(
            "ADMIN_PASSWORD",
            format!("should contain at least {MIN_ADMIN_PASSWORD_LENGTH} characters (got {count})"),
        ));
    }
    if !verify_password_complexity(password) {
        return Err(ConfigError::invalid(
            "ADMIN_PASSWORD",
            "should contain at least one lowercase letter, one uppercase letter, one digit and \
             one special character, without whitespace, #, | or '",
        ));
    }
    Ok(())
}

/// 비밀번호 복잡도 검사.
///
/// 소문자, 대문자, 숫자, 특수문자(구두점/기호)를 각각 하나 이상 포함해야 하며
/// 공백, `#`, `|`, `'`는 허용하지 않습니다.
pub fn verify_password_complexity(s: &str) -> bool {
    let (mut number, mut upper, mut lower, mut special) = (false, false, false, false);
    for c in s.chars() {
        if c.is_numeric() {
            number = true;
        } else if c.is_uppercase() {
            upper = true;
        } else if c.is_lowercase() {
            lower = true;
        } else if c == '#' || c == '|' || c == '\'' || c.is_whitespace() {
            return false;
        } else if !c.is_alphanumeric() && !c.is_control() {
            special = true;
        }
    }
    number && upper && lower && special
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

    fn base() -> ConfigBuilder<DefaultState> {
        ServiceConfig::defaults()
            .unwrap()
            .set_override("jwt_secret", SECRET)
            .unwrap()
            .set_override("jwt_issuer_id", "cloudkit-test")
            .unwrap()
            .set_override("admin_password", "ValidP@ssw0rd")
            .unwrap()
    }

    fn load(builder: ConfigBuilder<DefaultState>) -> ConfigResult<ServiceConfig> {
        ServiceConfig::from_config(builder.build().unwrap())
    }

    #[test]
    fn test_defaults_with_required_values() {
        let config = load(base()).unwrap();

        assert_eq!(config.app_name, "cloudkit");
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.jwt.duration_minutes, 60);
        assert_eq!(config.jwt.issuer, "cloudkit-test");
        assert_eq!(config.jwt.secret_bytes(), SECRET.as_bytes());
        assert_eq!(config.admin.login, "goadmin");
        assert_eq!(config.admin.id, 960901);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(2));
        assert_eq!(config.logging.target, LogTarget::Stderr);
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let config = load(base()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains(SECRET));
        assert!(!debug.contains("ValidP@ssw0rd"));
    }

    #[test]
    fn test_missing_secret_is_error() {
        let builder = ServiceConfig::defaults()
            .unwrap()
            .set_override("jwt_issuer_id", "cloudkit-test")
            .unwrap()
            .set_override("admin_password", "ValidP@ssw0rd")
            .unwrap();
        let err = load(builder).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn test_short_secret_is_error() {
        let err = load(base().set_override("jwt_secret", "short").unwrap()).unwrap_err();
        assert_eq!(err.key(), Some("JWT_SECRET"));
    }

    #[test]
    fn test_missing_admin_password_is_error() {
        let builder = ServiceConfig::defaults()
            .unwrap()
            .set_override("jwt_secret", SECRET)
            .unwrap()
            .set_override("jwt_issuer_id", "cloudkit-test")
            .unwrap();
        let err = load(builder).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ADMIN_PASSWORD")));
    }

    #[test]
    fn test_port_from_string_value() {
        let config = load(base().set_override("port", "3000").unwrap()).unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_jwt_duration_bounds() {
        let config = load(
            base()
                .set_override("jwt_duration_minutes", MAX_JWT_DURATION_MINUTES)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(config.jwt.duration_minutes, MAX_JWT_DURATION_MINUTES);

        for minutes in [0_i64, MAX_JWT_DURATION_MINUTES + 1, 200_000_000_000] {
            let err = load(base().set_override("jwt_duration_minutes", minutes).unwrap())
                .unwrap_err();
            assert_eq!(err.key(), Some("JWT_DURATION_MINUTES"));
        }
    }

    #[test]
    fn test_port_validation() {
        assert_eq!(validate_port(1).unwrap(), 1);
        assert_eq!(validate_port(65535).unwrap(), 65535);
        assert!(validate_port(0).is_err());
        assert!(validate_port(65536).is_err());
        assert!(load(base().set_override("port", "abc").unwrap()).is_err());
    }

    #[test]
    fn test_admin_user_length_counts_characters() {
        assert!(validate_admin_user("exact").is_ok());
        assert!(validate_admin_user("adm").is_err());
        // 이모지 4개 = 4글자
        assert!(validate_admin_user("💥⭐🌀🚩").is_err());
        assert!(validate_admin_user("💥⭐🌀🚩✅").is_ok());
    }

    #[test]
    fn test_password_complexity() {
        assert!(verify_password_complexity("ValidP@ssw0rd"));
        assert!(verify_password_complexity("P@ss1"));
        assert!(!verify_password_complexity("PASSWORD123!"));
        assert!(!verify_password_complexity("password123!"));
        assert!(!verify_password_complexity("Password!"));
        assert!(!verify_password_complexity("Password123"));
        assert!(!verify_password_complexity("Password123#"));
        assert!(!verify_password_complexity("Password123|"));
        assert!(!verify_password_complexity("Password123'"));
        assert!(!verify_password_complexity("Password 123!"));
    }

    #[test]
    fn test_admin_password_validation() {
        assert!(validate_admin_password("ValidP@ssw0rd").is_ok());
        assert!(validate_admin_password("Short1!").is_err());
        assert!(validate_admin_password("Password123").is_err());
    }

    #[test]
    fn test_invalid_log_file_is_error() {
        let err = load(base().set_override("log_file", "a.l").unwrap()).unwrap_err();
        assert_eq!(err.key(), Some("LOG_FILE"));
    }

    #[test]
    fn test_invalid_server_ip_is_error() {
        let err = load(base().set_override("server_ip", "not-an-ip").unwrap()).unwrap_err();
        assert_eq!(err.key(), Some("SERVER_IP"));
    }

    #[test]
    fn test_socket_addr() {
        let config = load(
            base()
                .set_override("server_ip", "127.0.0.1")
                .unwrap()
                .set_override("port", 8080)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(config.server.socket_addr().to_string(), "127.0.0.1:8080");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_port_range(port in any::<i64>()) {
                let valid = (1..=65535).contains(&port);
                prop_assert_eq!(validate_port(port).is_ok(), valid);
            }

            #[test]
            fn test_forbidden_characters_fail_complexity(
                base in "[a-z]{2,8}[A-Z]{2,8}[0-9]{1,4}[!@$%&*]{1,3}",
                forbidden in prop::sample::select(vec!['#', '|', '\'', ' ', '\t']),
                at in 0usize..16,
            ) {
                prop_assert!(verify_password_complexity(&base));
                let mut password = base.clone();
                password.insert(at.min(password.len()), forbidden);
                prop_assert!(!verify_password_complexity(&password));
            }
        }
    }
}
