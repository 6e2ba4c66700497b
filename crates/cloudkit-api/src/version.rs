//! 애플리케이션 버전 정보.

use serde::{Deserialize, Serialize};

/// `/version` 응답.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub app: String,
    pub version: String,
    pub repository: String,
    pub revision: String,
    pub build_stamp: String,
    pub auth_url: String,
}

impl AppInfo {
    pub fn new(app: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    pub fn with_build_stamp(mut self, build_stamp: impl Into<String>) -> Self {
        self.build_stamp = build_stamp.into();
        self
    }

    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self
    }
}

/// 버전 정보 공급자.
pub trait VersionReader: Send + Sync {
    fn version_info(&self) -> AppInfo;
}

/// 고정된 [`AppInfo`]를 반환하는 공급자.
#[derive(Debug, Clone)]
pub struct SimpleVersionReader {
    info: AppInfo,
}

impl SimpleVersionReader {
    pub fn new(info: AppInfo) -> Self {
        Self { info }
    }
}

impl VersionReader for SimpleVersionReader {
    fn version_info(&self) -> AppInfo {
        self.info.clone()
    }
}
