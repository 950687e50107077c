//! CT 로그 목록 (v3 스키마)
//!
//! 운영자별 `logs`(RFC 6962 로그)와 `tiled_logs`(static/tiled 로그)를 모두 읽어
//! [`LogDescriptor`] 목록으로 평탄화합니다. tiled 로그는 `monitoring_url`을
//! 조회 엔드포인트로 사용합니다.
//!
//! 목록 문서를 가져오는 방법은 [`LogListSource`] trait으로 추상화되어 있습니다.
//! - [`HttpLogListSource`]: 설정된 URL에서 HTTP로 수신
//! - [`StaticLogListSource`]: 메모리에 이미 있는 목록 (오프라인/테스트용)

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::IgnoredAny;
use tracing::debug;

use crate::error::CtMonitorError;

/// 로그 운영 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogState {
    /// 포함 심사 대기
    Pending,
    /// 심사 통과
    Qualified,
    /// 사용 가능
    Usable,
    /// 읽기 전용 (신규 제출 불가)
    ReadOnly,
    /// 폐기됨
    Retired,
    /// 거부됨
    Rejected,
}

/// 발견된 로그 하나의 기술 정보
///
/// 탐색 과정에서만 사용되는 일시적 값입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDescriptor {
    /// 운영자 이름
    pub operator: String,
    /// 조회 엔드포인트 URL
    pub url: String,
    /// 사람이 읽는 설명
    pub description: String,
    /// 운영 상태 (문서에 없으면 `None`)
    pub state: Option<LogState>,
    /// 유효 구간 종료 시각 (배타적, 없으면 만료 없음)
    pub validity_end: Option<DateTime<Utc>>,
    /// 최대 병합 지연 (초)
    pub mmd_secs: u64,
    /// tiled 로그 목록에서 온 항목인지 여부
    pub tiled: bool,
}

/// 파싱된 CT 로그 목록
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogList {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    operators: Vec<Operator>,
}

#[derive(Debug, Clone, Deserialize)]
struct Operator {
    #[serde(default)]
    name: String,
    #[serde(default)]
    logs: Vec<RawLog>,
    #[serde(default)]
    tiled_logs: Vec<RawTiledLog>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawLog {
    #[serde(default)]
    description: String,
    url: String,
    #[serde(default)]
    mmd: u64,
    #[serde(default)]
    state: Option<RawStates>,
    #[serde(default)]
    temporal_interval: Option<TemporalInterval>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTiledLog {
    #[serde(default)]
    description: String,
    monitoring_url: String,
    #[serde(default)]
    mmd: u64,
    #[serde(default)]
    state: Option<RawStates>,
    #[serde(default)]
    temporal_interval: Option<TemporalInterval>,
}

/// 상태 객체는 상태 이름을 키로 하는 단일 항목 객체입니다.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawStates {
    pending: Option<IgnoredAny>,
    qualified: Option<IgnoredAny>,
    usable: Option<IgnoredAny>,
    readonly: Option<IgnoredAny>,
    retired: Option<IgnoredAny>,
    rejected: Option<IgnoredAny>,
}

impl RawStates {
    fn resolve(&self) -> Option<LogState> {
        // 종결 상태를 우선합니다.
        if self.rejected.is_some() {
            Some(LogState::Rejected)
        } else if self.retired.is_some() {
            Some(LogState::Retired)
        } else if self.readonly.is_some() {
            Some(LogState::ReadOnly)
        } else if self.usable.is_some() {
            Some(LogState::Usable)
        } else if self.qualified.is_some() {
            Some(LogState::Qualified)
        } else if self.pending.is_some() {
            Some(LogState::Pending)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TemporalInterval {
    end_exclusive: Option<DateTime<Utc>>,
}

impl LogList {
    /// JSON 바이트에서 로그 목록을 파싱합니다.
    pub fn parse(bytes: &[u8]) -> Result<Self, CtMonitorError> {
        serde_json::from_slice(bytes).map_err(|e| CtMonitorError::LogListParse(e.to_string()))
    }

    /// 문서 버전 문자열
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// 운영자 수
    pub fn operator_count(&self) -> usize {
        self.operators.len()
    }

    /// 모든 운영자의 로그와 tiled 로그를 문서 순서대로 평탄화합니다.
    pub fn descriptors(&self) -> Vec<LogDescriptor> {
        let mut out = Vec::new();
        for operator in &self.operators {
            for log in &operator.logs {
                out.push(LogDescriptor {
                    operator: operator.name.clone(),
                    url: log.url.clone(),
                    description: log.description.clone(),
                    state: log.state.as_ref().and_then(RawStates::resolve),
                    validity_end: log.temporal_interval.as_ref().and_then(|t| t.end_exclusive),
                    mmd_secs: log.mmd,
                    tiled: false,
                });
            }
            for log in &operator.tiled_logs {
                out.push(LogDescriptor {
                    operator: operator.name.clone(),
                    url: log.monitoring_url.clone(),
                    description: log.description.clone(),
                    state: log.state.as_ref().and_then(RawStates::resolve),
                    validity_end: log.temporal_interval.as_ref().and_then(|t| t.end_exclusive),
                    mmd_secs: log.mmd,
                    tiled: true,
                });
            }
        }
        out
    }
}

/// 로그 목록 문서 공급자
pub trait LogListSource: Send + Sync + 'static {
    /// 로그 목록을 가져와 파싱합니다.
    fn fetch(&self) -> impl Future<Output = Result<LogList, CtMonitorError>> + Send;
}

/// HTTP로 로그 목록을 가져오는 공급자
pub struct HttpLogListSource {
    url: url::Url,
    client: reqwest::Client,
}

impl HttpLogListSource {
    /// URL과 요청 타임아웃으로 공급자를 생성합니다.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, CtMonitorError> {
        let url = url::Url::parse(url).map_err(|e| CtMonitorError::Config {
            field: "log_list_url".to_owned(),
            reason: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CtMonitorError::Config {
                field: "http_client".to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self { url, client })
    }

    /// 대상 URL
    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl LogListSource for HttpLogListSource {
    async fn fetch(&self) -> Result<LogList, CtMonitorError> {
        debug!(url = %self.url, "fetching CT log list");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| CtMonitorError::LogListFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CtMonitorError::LogListFetch(format!(
                "{} returned HTTP {status}",
                self.url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CtMonitorError::LogListFetch(e.to_string()))?;

        LogList::parse(&body)
    }
}

/// 메모리에 보관된 로그 목록 공급자
#[derive(Debug, Clone)]
pub struct StaticLogListSource {
    list: LogList,
}

impl StaticLogListSource {
    /// 파싱된 목록으로 공급자를 생성합니다.
    pub fn new(list: LogList) -> Self {
        Self { list }
    }

    /// JSON 문서로 공급자를 생성합니다.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CtMonitorError> {
        Ok(Self::new(LogList::parse(bytes)?))
    }
}

impl LogListSource for StaticLogListSource {
    async fn fetch(&self) -> Result<LogList, CtMonitorError> {
        Ok(self.list.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "version": "41.7",
      "operators": [
        {
          "name": "Google",
          "email": ["google-ct-logs@googlegroups.com"],
          "logs": [
            {
              "description": "Google 'Argon2026h1' log",
              "log_id": "abc=",
              "key": "xyz=",
              "url": "https://ct.googleapis.com/logs/us1/argon2026h1/",
              "mmd": 86400,
              "state": { "usable": { "timestamp": "2025-01-01T00:00:00Z" } },
              "temporal_interval": {
                "start_inclusive": "2026-01-01T00:00:00Z",
                "end_exclusive": "2026-07-01T00:00:00Z"
              }
            },
            {
              "description": "Google 'Xenon2019' log",
              "url": "https://ct.googleapis.com/logs/xenon2019/",
              "mmd": 86400,
              "state": { "retired": { "timestamp": "2020-01-01T00:00:00Z" } }
            }
          ],
          "tiled_logs": [
            {
              "description": "Example tiled log",
              "submission_url": "https://submit.example.net/",
              "monitoring_url": "https://tiles.example.net/",
              "mmd": 60,
              "state": { "qualified": { "timestamp": "2025-06-01T00:00:00Z" } }
            }
          ]
        },
        { "name": "Empty Operator" }
      ]
    }"#;

    #[test]
    fn parses_logs_and_tiled_logs() {
        let list = LogList::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(list.version(), Some("41.7"));
        assert_eq!(list.operator_count(), 2);

        let logs = list.descriptors();
        assert_eq!(logs.len(), 3);

        assert_eq!(logs[0].url, "https://ct.googleapis.com/logs/us1/argon2026h1/");
        assert_eq!(logs[0].state, Some(LogState::Usable));
        assert_eq!(logs[0].mmd_secs, 86_400);
        assert!(logs[0].validity_end.is_some());
        assert!(!logs[0].tiled);

        assert_eq!(logs[1].state, Some(LogState::Retired));
        assert!(logs[1].validity_end.is_none());

        assert_eq!(logs[2].url, "https://tiles.example.net/");
        assert_eq!(logs[2].state, Some(LogState::Qualified));
        assert!(logs[2].tiled);
        assert_eq!(logs[2].operator, "Google");
    }

    #[test]
    fn missing_state_resolves_to_none() {
        let list = LogList::parse(
            br#"{"operators":[{"name":"x","logs":[{"url":"https://a/","mmd":1}]}]}"#,
        )
        .unwrap();
        assert_eq!(list.descriptors()[0].state, None);
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let err = LogList::parse(b"{\"operators\": [").unwrap_err();
        assert!(matches!(err, CtMonitorError::LogListParse(_)));
    }

    #[test]
    fn wrong_shape_is_parse_error() {
        let err = LogList::parse(br#"{"operators": "nope"}"#).unwrap_err();
        assert!(matches!(err, CtMonitorError::LogListParse(_)));
    }

    #[test]
    fn http_source_rejects_invalid_url() {
        let result = HttpLogListSource::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(CtMonitorError::Config { .. })));
    }

    #[tokio::test]
    async fn static_source_returns_list() {
        let source = StaticLogListSource::from_json(SAMPLE.as_bytes()).unwrap();
        let list = source.fetch().await.unwrap();
        assert_eq!(list.descriptors().len(), 3);
    }
}
