//! CT 모니터 설정
//!
//! [`MonitorConfig`]는 core의 [`MonitorSection`](ctwatch_core::config::MonitorSection)을
//! 기반으로 모니터 내부에서 사용하는 값을 `Duration` 등 실행 타입으로 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use ctwatch_core::config::CtwatchConfig;
//! use ctwatch_monitor::config::MonitorConfig;
//!
//! let core_config = CtwatchConfig::default();
//! let config = MonitorConfig::from_core(&core_config.monitor);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CtMonitorError;

/// 룰 매칭 대상
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTarget {
    /// Subject Common Name만 검사 (기본값)
    #[default]
    CommonName,
    /// Subject Common Name과 SAN(DNS) 모두 검사
    CommonNameAndSans,
}

/// CT 모니터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// CT 로그 목록 문서 URL
    pub log_list_url: String,
    /// 로그별 폴링 주기
    pub poll_interval: Duration,
    /// 한 번의 폴링에서 가져올 최대 엔트리 수
    pub window_size: u64,
    /// 출력 큐 용량
    pub queue_capacity: usize,
    /// 필터 워커 수
    pub workers: usize,
    /// 허용하는 최대 MMD (초)
    pub max_mmd_secs: u64,
    /// HTTP 요청 타임아웃
    pub http_timeout: Duration,
    /// 룰 매칭 대상
    pub match_target: MatchTarget,
    /// precertificate 엔트리도 검사할지 여부
    pub include_precertificates: bool,
    /// 진단 이벤트 브로드캐스트 채널 용량
    pub event_channel_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from_core(&ctwatch_core::config::MonitorSection::default())
    }
}

impl MonitorConfig {
    /// core의 `MonitorSection`에서 모니터 설정을 생성합니다.
    pub fn from_core(core: &ctwatch_core::config::MonitorSection) -> Self {
        Self {
            log_list_url: core.log_list_url.clone(),
            poll_interval: Duration::from_secs(core.poll_interval_secs),
            window_size: core.window_size,
            queue_capacity: core.queue_capacity,
            workers: core.workers,
            max_mmd_secs: core.max_mmd_secs,
            http_timeout: Duration::from_secs(core.http_timeout_secs),
            match_target: if core.match_sans {
                MatchTarget::CommonNameAndSans
            } else {
                MatchTarget::CommonName
            },
            include_precertificates: core.include_precertificates,
            event_channel_capacity: 256,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CtMonitorError> {
        if self.log_list_url.trim().is_empty() {
            return Err(CtMonitorError::Config {
                field: "log_list_url".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.poll_interval.is_zero() {
            return Err(CtMonitorError::Config {
                field: "poll_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.window_size == 0 {
            return Err(CtMonitorError::Config {
                field: "window_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.queue_capacity == 0 {
            return Err(CtMonitorError::Config {
                field: "queue_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.workers == 0 {
            return Err(CtMonitorError::Config {
                field: "workers".to_owned(),
                reason: "at least one filter worker is required".to_owned(),
            });
        }

        if self.event_channel_capacity == 0 {
            return Err(CtMonitorError::Config {
                field: "event_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 모니터 설정 빌더
#[derive(Default)]
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 로그 목록 URL을 설정합니다.
    pub fn log_list_url(mut self, url: impl Into<String>) -> Self {
        self.config.log_list_url = url.into();
        self
    }

    /// 폴링 주기를 설정합니다.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// 폴링 윈도우 크기를 설정합니다.
    pub fn window_size(mut self, size: u64) -> Self {
        self.config.window_size = size;
        self
    }

    /// 출력 큐 용량을 설정합니다.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// 필터 워커 수를 설정합니다.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// 최대 MMD(초)를 설정합니다.
    pub fn max_mmd_secs(mut self, secs: u64) -> Self {
        self.config.max_mmd_secs = secs;
        self
    }

    /// 룰 매칭 대상을 설정합니다.
    pub fn match_target(mut self, target: MatchTarget) -> Self {
        self.config.match_target = target;
        self
    }

    /// precertificate 검사 여부를 설정합니다.
    pub fn include_precertificates(mut self, include: bool) -> Self {
        self.config.include_precertificates = include;
        self
    }

    /// 설정을 검증하고 `MonitorConfig`를 생성합니다.
    pub fn build(self) -> Result<MonitorConfig, CtMonitorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
