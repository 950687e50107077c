//! 비치명 진단 이벤트와 통계
//!
//! 한 로그나 한 엔트리에 국한된 실패는 모니터를 멈추지 않습니다. 대신
//! [`Diagnostics`]를 통해 세 갈래로 보고됩니다.
//! - `tracing` 로그
//! - `metrics` 카운터/게이지
//! - [`MonitorEvent`] 브로드캐스트 (구독자가 있을 때만)
//!
//! 누적 수치는 [`MonitorStats`]에 원자적으로 기록되며 언제든 스냅샷을 읽을 수 있습니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ctwatch_core::metrics as m;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// 진단 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// 탐색 중 로그를 건너뜀 (연결 또는 트리 크기 조회 실패)
    SourceSkipped {
        /// 로그 URL
        log: String,
        /// 사유
        reason: String,
    },
    /// 폴링 실패 (다음 주기에 재시도)
    PollFailed {
        /// 로그 URL
        log: String,
        /// 사유
        reason: String,
    },
    /// 큐 과부하로 엔트리 폐기
    EntriesDropped {
        /// 로그 URL
        log: String,
        /// 이번 폴링에서 버려진 수
        count: u64,
    },
}

/// 누적 통계
#[derive(Debug, Default)]
pub struct MonitorStats {
    sources_skipped: AtomicU64,
    polls: AtomicU64,
    poll_failures: AtomicU64,
    entries_fetched: AtomicU64,
    entries_dropped: AtomicU64,
    entries_without_certificate: AtomicU64,
    decode_failures: AtomicU64,
    matches: AtomicU64,
}

/// 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// 탐색 중 건너뛴 로그 수
    pub sources_skipped: u64,
    /// 성공한 폴링 수
    pub polls: u64,
    /// 실패한 폴링 수
    pub poll_failures: u64,
    /// 로그에서 받은 엔트리 수
    pub entries_fetched: u64,
    /// 과부하로 버려진 엔트리 수
    pub entries_dropped: u64,
    /// 인증서 없이 폐기된 엔트리 수
    pub entries_without_certificate: u64,
    /// 디코딩 실패 수
    pub decode_failures: u64,
    /// 매칭 수
    pub matches: u64,
}

impl MonitorStats {
    /// 현재 값을 읽습니다.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sources_skipped: self.sources_skipped.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            entries_fetched: self.entries_fetched.load(Ordering::Relaxed),
            entries_dropped: self.entries_dropped.load(Ordering::Relaxed),
            entries_without_certificate: self.entries_without_certificate.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
        }
    }
}

/// 진단 보고 경로
///
/// 복제 비용이 작으며 폴링 루프와 워커가 각자 하나씩 들고 있습니다.
#[derive(Clone, Default)]
pub struct Diagnostics {
    events: Option<broadcast::Sender<MonitorEvent>>,
    stats: Arc<MonitorStats>,
}

impl Diagnostics {
    /// 이벤트 브로드캐스트 채널을 포함해 생성합니다.
    pub fn with_events(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            events: Some(tx),
            stats: Arc::default(),
        }
    }

    /// 이벤트를 구독합니다. 채널이 없으면 `None`입니다.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<MonitorEvent>> {
        self.events.as_ref().map(broadcast::Sender::subscribe)
    }

    /// 누적 통계
    pub fn stats(&self) -> &Arc<MonitorStats> {
        &self.stats
    }

    fn emit(&self, event: MonitorEvent) {
        if let Some(tx) = &self.events {
            // 구독자가 없으면 실패하지만 무시합니다.
            let _ = tx.send(event);
        }
    }

    pub(crate) fn source_skipped(&self, log: &str, reason: &str) {
        warn!(log, reason, "skipping CT log");
        self.stats.sources_skipped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::MONITOR_SOURCES_SKIPPED_TOTAL).increment(1);
        self.emit(MonitorEvent::SourceSkipped {
            log: log.to_owned(),
            reason: reason.to_owned(),
        });
    }

    pub(crate) fn poll_failed(&self, log: &str, reason: &str) {
        warn!(log, reason, "poll failed, retrying next tick");
        self.stats.poll_failures.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::MONITOR_POLL_FAILURES_TOTAL, m::LABEL_LOG => log.to_owned()).increment(1);
        self.emit(MonitorEvent::PollFailed {
            log: log.to_owned(),
            reason: reason.to_owned(),
        });
    }

    pub(crate) fn polled(&self, log: &str, fetched: u64) {
        self.stats.polls.fetch_add(1, Ordering::Relaxed);
        if fetched > 0 {
            debug!(log, fetched, "fetched entries");
            self.stats.entries_fetched.fetch_add(fetched, Ordering::Relaxed);
            metrics::counter!(m::MONITOR_ENTRIES_FETCHED_TOTAL, m::LABEL_LOG => log.to_owned())
                .increment(fetched);
        }
    }

    pub(crate) fn entries_dropped(&self, log: &str, count: u64) {
        if count == 0 {
            return;
        }
        warn!(log, count, "output queue full, dropping entries");
        self.stats.entries_dropped.fetch_add(count, Ordering::Relaxed);
        metrics::counter!(m::MONITOR_ENTRIES_DROPPED_TOTAL, m::LABEL_LOG => log.to_owned())
            .increment(count);
        self.emit(MonitorEvent::EntriesDropped {
            log: log.to_owned(),
            count,
        });
    }

    pub(crate) fn without_certificate(&self) {
        self.stats
            .entries_without_certificate
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decode_failed(&self, log: &str, index: u64, reason: &str) {
        trace!(log, index, reason, "certificate decode failed");
        self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::MONITOR_DECODE_FAILURES_TOTAL).increment(1);
    }

    pub(crate) fn matched(&self, category: &str) {
        self.stats.matches.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::MONITOR_MATCHES_TOTAL, m::LABEL_CATEGORY => category.to_owned())
            .increment(1);
    }
}
