//! ctwatch 공통 크레이트
//!
//! 모든 ctwatch 크레이트가 공유하는 에러 타입, 설정 구조체,
//! 메트릭 이름, 생명주기 trait을 정의합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, CtwatchError, PipelineError};

// 설정
pub use config::{CtwatchConfig, GeneralConfig, MetricsConfig, MonitorSection};

// 파이프라인 trait
pub use pipeline::{HealthStatus, Pipeline};
