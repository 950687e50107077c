//! CT 모니터 에러 타입
//!
//! [`CtMonitorError`]는 모니터 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<CtMonitorError> for CtwatchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! # 치명도
//! - [`RuleCompile`](CtMonitorError::RuleCompile), [`RuleLoad`](CtMonitorError::RuleLoad):
//!   모니터 구성 전 실패 (치명적)
//! - [`LogListFetch`](CtMonitorError::LogListFetch), [`LogListParse`](CtMonitorError::LogListParse):
//!   해당 탐색 시도만 실패
//! - [`Transport`](CtMonitorError::Transport), [`Protocol`](CtMonitorError::Protocol):
//!   한 로그에 국한된 일시적 실패, 다음 주기에 재시도
//! - [`Decode`](CtMonitorError::Decode): 워커 내부에서 조용히 폐기

use ctwatch_core::error::{ConfigError, CtwatchError, PipelineError};

/// CT 모니터 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CtMonitorError {
    /// 룰 정규식 컴파일 실패
    #[error("rule compile error: category '{category}': {reason}")]
    RuleCompile {
        /// 문제가 된 카테고리
        category: String,
        /// 실패 사유
        reason: String,
    },

    /// 룰 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 룰 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 로그 목록 문서 수신 실패
    #[error("failed to fetch CT log list: {0}")]
    LogListFetch(String),

    /// 로그 목록 문서 파싱 실패
    #[error("failed to parse CT log list: {0}")]
    LogListParse(String),

    /// 로그 서버와의 전송 실패
    #[error("transport error: {log}: {reason}")]
    Transport {
        /// 로그 URL
        log: String,
        /// 실패 사유
        reason: String,
    },

    /// 로그 서버 응답 형식 오류
    #[error("protocol error: {log}: {reason}")]
    Protocol {
        /// 로그 URL
        log: String,
        /// 실패 사유
        reason: String,
    },

    /// 인증서 디코딩 실패
    #[error("certificate decode error: {0}")]
    Decode(String),

    /// 잘못된 상태에서의 생명주기 호출
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<CtMonitorError> for CtwatchError {
    fn from(err: CtMonitorError) -> Self {
        match err {
            CtMonitorError::Config { field, reason } => {
                CtwatchError::Config(ConfigError::InvalidValue { field, reason })
            }
            CtMonitorError::LogListFetch(_) | CtMonitorError::LogListParse(_) => {
                CtwatchError::Pipeline(PipelineError::Discovery(err.to_string()))
            }
            other => CtwatchError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
