//! 설정 관리: ctwatch.toml 파싱 및 런타임 설정
//!
//! [`CtwatchConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`CTWATCH_MONITOR_WORKERS=8` 형식)
//! 3. 설정 파일 (`ctwatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ctwatch_core::error::CtwatchError> {
//! use ctwatch_core::config::CtwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = CtwatchConfig::load("ctwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = CtwatchConfig::parse("[monitor]\nworkers = 8")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, CtwatchError};

/// Google CT 로그 목록 (v3 형식)
pub const DEFAULT_LOG_LIST_URL: &str = "https://www.gstatic.com/ct/log_list/v3/log_list.json";

/// ctwatch 통합 설정
///
/// `ctwatch.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CtwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// CT 모니터 설정
    #[serde(default)]
    pub monitor: MonitorSection,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl CtwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CtwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CtwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CtwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CtwatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, CtwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            CtwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CTWATCH_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "CTWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CTWATCH_GENERAL_LOG_FORMAT");

        // Monitor
        override_string(&mut self.monitor.log_list_url, "CTWATCH_MONITOR_LOG_LIST_URL");
        override_u64(
            &mut self.monitor.poll_interval_secs,
            "CTWATCH_MONITOR_POLL_INTERVAL_SECS",
        );
        override_u64(&mut self.monitor.window_size, "CTWATCH_MONITOR_WINDOW_SIZE");
        override_usize(
            &mut self.monitor.queue_capacity,
            "CTWATCH_MONITOR_QUEUE_CAPACITY",
        );
        override_usize(&mut self.monitor.workers, "CTWATCH_MONITOR_WORKERS");
        override_u64(&mut self.monitor.max_mmd_secs, "CTWATCH_MONITOR_MAX_MMD_SECS");
        override_u64(
            &mut self.monitor.http_timeout_secs,
            "CTWATCH_MONITOR_HTTP_TIMEOUT_SECS",
        );
        override_bool(&mut self.monitor.match_sans, "CTWATCH_MONITOR_MATCH_SANS");
        override_bool(
            &mut self.monitor.include_precertificates,
            "CTWATCH_MONITOR_INCLUDE_PRECERTIFICATES",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "CTWATCH_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "CTWATCH_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "CTWATCH_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CtwatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.monitor.validate()?;

        if self.metrics.enabled && self.metrics.endpoint != "/metrics" {
            return Err(invalid(
                "metrics.endpoint",
                "only '/metrics' is supported".to_owned(),
            ));
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// CT 모니터 설정 (`[monitor]` 섹션)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    /// CT 로그 목록 문서 URL
    pub log_list_url: String,
    /// 로그별 폴링 주기 (초)
    pub poll_interval_secs: u64,
    /// 한 번의 폴링에서 가져올 최대 엔트리 수
    pub window_size: u64,
    /// 출력 큐 용량
    pub queue_capacity: usize,
    /// 필터 워커 수
    pub workers: usize,
    /// 허용하는 최대 MMD (초)
    pub max_mmd_secs: u64,
    /// HTTP 요청 타임아웃 (초)
    pub http_timeout_secs: u64,
    /// Subject CN 외에 SAN(DNS)도 매칭 대상에 포함할지 여부
    pub match_sans: bool,
    /// precertificate 엔트리도 검사할지 여부
    pub include_precertificates: bool,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            log_list_url: DEFAULT_LOG_LIST_URL.to_owned(),
            poll_interval_secs: 5,
            window_size: 1000,
            queue_capacity: 1000,
            workers: 5,
            max_mmd_secs: 86_400,
            http_timeout_secs: 30,
            match_sans: false,
            include_precertificates: true,
        }
    }
}

impl MonitorSection {
    /// `[monitor]` 섹션의 값 범위를 검증합니다.
    pub fn validate(&self) -> Result<(), CtwatchError> {
        const MAX_POLL_INTERVAL_SECS: u64 = 3600;
        const MAX_WINDOW_SIZE: u64 = 10_000;
        const MAX_QUEUE_CAPACITY: usize = 10_000_000;
        const MAX_WORKERS: usize = 1024;

        let url = self.log_list_url.trim();
        if url.is_empty() {
            return Err(invalid(
                "monitor.log_list_url",
                "must not be empty".to_owned(),
            ));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(invalid(
                "monitor.log_list_url",
                format!("'{url}' must be an http(s) URL"),
            ));
        }

        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(invalid(
                "monitor.poll_interval_secs",
                format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            ));
        }

        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(invalid(
                "monitor.window_size",
                format!("must be 1-{MAX_WINDOW_SIZE}"),
            ));
        }

        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(invalid(
                "monitor.queue_capacity",
                format!("must be 1-{MAX_QUEUE_CAPACITY}"),
            ));
        }

        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(invalid(
                "monitor.workers",
                format!("must be 1-{MAX_WORKERS}"),
            ));
        }

        if self.max_mmd_secs == 0 {
            return Err(invalid(
                "monitor.max_mmd_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(invalid(
                "monitor.http_timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9185,
            endpoint: "/metrics".to_owned(),
        }
    }
}

fn invalid(field: &str, reason: String) -> CtwatchError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
