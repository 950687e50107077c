//! 매칭 결과와 결과 수신자
//!
//! 필터 워커는 룰에 매칭된 인증서마다 [`MatchResult`]를 만들어 [`MatchSink`]에
//! 넘깁니다. 결과는 넘긴 뒤 보관하지 않습니다.
//!
//! - [`ChannelSink`]: `mpsc` 채널로 전달 (빌더가 수신 측을 반환)
//! - [`JsonLinesSink`]: 한 줄에 JSON 하나씩 기록 (기본: 표준 출력)

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::certificate::DecodedCertificate;
use crate::entry::CertKind;

/// 룰에 매칭된 인증서 하나
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    /// 매칭된 룰 카테고리
    pub category: String,
    /// 엔트리를 읽은 로그 URL
    pub log: String,
    /// 로그 내 인덱스
    pub index: u64,
    /// 인증서 종류
    pub kind: CertKind,
    /// 리프 타임스탬프 (epoch 밀리초)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    /// 디코딩된 인증서 속성
    pub certificate: DecodedCertificate,
}

impl MatchResult {
    /// Subject Common Name
    pub fn common_name(&self) -> Option<&str> {
        self.certificate.subject_cn.as_deref()
    }
}

/// 매칭 결과 수신자
///
/// 여러 워커가 동시에 호출하므로 내부에서 동기화해야 하며, 호출자를 오래
/// 붙잡지 않아야 합니다.
pub trait MatchSink: Send + Sync + 'static {
    /// 매칭 결과 하나를 전달합니다.
    fn deliver(&self, result: MatchResult);
}

/// `mpsc` 채널 기반 수신자
///
/// 채널이 가득 차면 결과를 버리고 경고를 남깁니다. 워커는 대기하지 않습니다.
pub struct ChannelSink {
    tx: mpsc::Sender<MatchResult>,
}

impl ChannelSink {
    /// 송신 측으로 수신자를 생성합니다.
    pub fn new(tx: mpsc::Sender<MatchResult>) -> Self {
        Self { tx }
    }

    /// 용량을 지정해 수신자와 수신 채널을 함께 생성합니다.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<MatchResult>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl MatchSink for ChannelSink {
    fn deliver(&self, result: MatchResult) {
        match self.tx.try_send(result) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(result)) => {
                warn!(
                    category = %result.category,
                    log = %result.log,
                    index = result.index,
                    "match channel full, dropping match"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("match receiver dropped");
            }
        }
    }
}

/// JSON Lines 수신자
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl JsonLinesSink<std::io::Stdout> {
    /// 표준 출력에 기록하는 수신자
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> JsonLinesSink<W> {
    /// 임의의 writer로 수신자를 생성합니다.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// 내부 writer를 돌려받습니다.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send + 'static> MatchSink for JsonLinesSink<W> {
    fn deliver(&self, result: MatchResult) {
        let line = match serde_json::to_string(&result) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to serialize match");
                return;
            }
        };

        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            warn!(error = %e, "failed to write match");
        }
    }
}
