//! 에러 타입: 도메인별 에러 정의

/// ctwatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum CtwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 모니터 파이프라인 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline is not running")]
    NotRunning,

    /// 구성(룰 컴파일 등) 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 로그 목록 탐색 실패
    #[error("log discovery failed: {0}")]
    Discovery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_names_field() {
        let err = CtwatchError::from(ConfigError::InvalidValue {
            field: "monitor.workers".to_owned(),
            reason: "must be 1-1024".to_owned(),
        });
        let msg = err.to_string();
        assert!(msg.contains("monitor.workers"));
        assert!(msg.contains("1-1024"));
    }

    #[test]
    fn pipeline_error_converts() {
        let err: CtwatchError = PipelineError::Discovery("timeout".to_owned()).into();
        assert!(matches!(err, CtwatchError::Pipeline(PipelineError::Discovery(_))));
        assert!(err.to_string().contains("timeout"));
    }
}
