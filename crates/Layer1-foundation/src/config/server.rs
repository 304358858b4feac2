//! Server Config - 서버 통합 설정
//!
//! TOML 파일에서 로드하며, 모든 필드는 기본값을 가집니다.
//!
//! ```toml
//! [server]
//! name = "gcp-o11y-mcp"
//!
//! [project]
//! id = "my-project"
//!
//! [cache]
//! live_ttl_secs = 120
//! historical_ttl_secs = 600
//!
//! [retry]
//! max_retries = 3
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 설정 디렉토리명 (`~/.config/<dir>`)
pub const CONFIG_DIR: &str = "o11y-mcp";

/// 설정 파일명
pub const CONFIG_FILE: &str = "config.toml";

/// Upper bound for `query.default_lookback_hours` (ten years, the longest log retention)
pub const MAX_LOOKBACK_HOURS: u64 = 87_600;

// ============================================================================
// Server Config (통합)
// ============================================================================

/// o11y-mcp 통합 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub project: ProjectSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub query: QuerySettings,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 기본 경로 (`<config_dir>/o11y-mcp/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// 파일에서 로드. 파일이 없으면 기본값
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// 기본 경로에서 로드
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// 값 범위 검사
    pub fn validate(&self) -> Result<()> {
        if self.cache.live_ttl_secs == 0 || self.cache.historical_ttl_secs == 0 {
            return Err(Error::Config("cache TTLs must be greater than zero".into()));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(Error::Config(
                "cache.sweep_interval_secs must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_fraction) {
            return Err(Error::Config(format!(
                "retry.jitter_fraction must be within [0, 1], got {}",
                self.retry.jitter_fraction
            )));
        }
        if self.query.attempt_timeout_secs == 0 {
            return Err(Error::Config(
                "query.attempt_timeout_secs must be greater than zero".into(),
            ));
        }
        if !(1..=MAX_LOOKBACK_HOURS).contains(&self.query.default_lookback_hours) {
            return Err(Error::Config(format!(
                "query.default_lookback_hours must be within [1, {}], got {}",
                MAX_LOOKBACK_HOURS, self.query.default_lookback_hours
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Sections
// ============================================================================

/// 서버 식별 정보 (initialize 응답에 사용)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_name")]
    pub name: String,

    #[serde(default = "default_server_version")]
    pub version: String,
}

/// 원격 log store 접속 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// 프로젝트 ID (없으면 `GOOGLE_CLOUD_PROJECT` 환경 변수)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// 고정 Bearer 토큰을 읽을 환경 변수 이름
    ///
    /// 비어 있으면 ADC 자격 증명 파일, 없으면 metadata server 에서 토큰을 갱신합니다.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// API endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

/// 결과 캐시 TTL 정책
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// 시작 시간이 없는 쿼리 (live tail)
    #[serde(default = "default_live_ttl_secs")]
    pub live_ttl_secs: u64,

    /// 시작 시간이 명시된 쿼리 (historical)
    #[serde(default = "default_historical_ttl_secs")]
    pub historical_ttl_secs: u64,

    /// 만료 엔트리 정리 주기
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Rate-limit 재시도 정책
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 백오프에 더해지는 고정 비율
    #[serde(default = "default_jitter_fraction")]
    pub jitter_fraction: f64,
}

/// 쿼리 실행 제한
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySettings {
    /// 원격 호출 1회당 타임아웃
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// 시간 범위가 없는 쿼리에 주입되는 lookback
    #[serde(default = "default_lookback_hours")]
    pub default_lookback_hours: u64,
}

// Default value functions
fn default_server_name() -> String {
    "gcp-o11y-mcp".to_string()
}
fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
fn default_access_token_env() -> String {
    "GOOGLE_OAUTH_ACCESS_TOKEN".to_string()
}
fn default_endpoint() -> String {
    "https://logging.googleapis.com".to_string()
}
fn default_live_ttl_secs() -> u64 {
    120
} // 2 minutes
fn default_historical_ttl_secs() -> u64 {
    600
} // 10 minutes
fn default_sweep_interval_secs() -> u64 {
    300
} // 5 minutes
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_retries() -> u32 {
    3
}
fn default_jitter_fraction() -> f64 {
    0.1
}
fn default_attempt_timeout_secs() -> u64 {
    30
}
fn default_lookback_hours() -> u64 {
    24
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
        }
    }
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            id: None,
            access_token_env: default_access_token_env(),
            endpoint: default_endpoint(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            live_ttl_secs: default_live_ttl_secs(),
            historical_ttl_secs: default_historical_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_retries: default_max_retries(),
            jitter_fraction: default_jitter_fraction(),
        }
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_attempt_timeout_secs(),
            default_lookback_hours: default_lookback_hours(),
        }
    }
}

impl CacheSettings {
    pub fn live_ttl(&self) -> Duration {
        Duration::from_secs(self.live_ttl_secs)
    }

    pub fn historical_ttl(&self) -> Duration {
        Duration::from_secs(self.historical_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl QuerySettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Clamped to [`MAX_LOOKBACK_HOURS`] even when `validate` was skipped
    pub fn default_lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(self.default_lookback_hours.min(MAX_LOOKBACK_HOURS) as i64)
    }
}
