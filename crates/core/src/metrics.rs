//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `ctwatch_`
//! - 모듈명: `monitor_`, `daemon_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// CT 로그 URL 레이블 키
pub const LABEL_LOG: &str = "log";

/// 룰 카테고리 레이블 키
pub const LABEL_CATEGORY: &str = "category";

/// 실패 단계 레이블 키 (tree_size, entries)
pub const LABEL_STAGE: &str = "stage";

// ─── Monitor 메트릭 ─────────────────────────────────────────────────

/// Monitor: 모니터링 중인 로그 수 (gauge)
pub const MONITOR_SOURCES_ACTIVE: &str = "ctwatch_monitor_sources_active";

/// Monitor: 탐색 중 제외된 로그 수 (counter)
pub const MONITOR_SOURCES_SKIPPED_TOTAL: &str = "ctwatch_monitor_sources_skipped_total";

/// Monitor: 로그에서 가져온 엔트리 수 (counter)
pub const MONITOR_ENTRIES_FETCHED_TOTAL: &str = "ctwatch_monitor_entries_fetched_total";

/// Monitor: 큐 포화로 버려진 엔트리 수 (counter)
pub const MONITOR_ENTRIES_DROPPED_TOTAL: &str = "ctwatch_monitor_entries_dropped_total";

/// Monitor: 폴링 실패 수 (counter, label: stage)
pub const MONITOR_POLL_FAILURES_TOTAL: &str = "ctwatch_monitor_poll_failures_total";

/// Monitor: 인증서 디코딩 실패 수 (counter)
pub const MONITOR_DECODE_FAILURES_TOTAL: &str = "ctwatch_monitor_decode_failures_total";

/// Monitor: 룰 매칭 수 (counter, label: category)
pub const MONITOR_MATCHES_TOTAL: &str = "ctwatch_monitor_matches_total";

/// Monitor: 출력 큐에 대기 중인 엔트리 수 (gauge)
pub const MONITOR_QUEUE_DEPTH: &str = "ctwatch_monitor_queue_depth";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 로드된 룰 카테고리 수 (gauge)
pub const DAEMON_RULES_LOADED: &str = "ctwatch_daemon_rules_loaded";

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_gauge!(
        MONITOR_SOURCES_ACTIVE,
        "Number of CT logs currently being polled"
    );
    describe_counter!(
        MONITOR_SOURCES_SKIPPED_TOTAL,
        "Number of CT logs skipped during discovery because of a client or tree head failure"
    );
    describe_counter!(
        MONITOR_ENTRIES_FETCHED_TOTAL,
        "Total number of log entries retrieved from all CT logs"
    );
    describe_counter!(
        MONITOR_ENTRIES_DROPPED_TOTAL,
        "Total number of log entries dropped because the output queue was full"
    );
    describe_counter!(
        MONITOR_POLL_FAILURES_TOTAL,
        "Total number of failed tree head or get-entries calls"
    );
    describe_counter!(
        MONITOR_DECODE_FAILURES_TOTAL,
        "Total number of certificates that could not be decoded"
    );
    describe_counter!(
        MONITOR_MATCHES_TOTAL,
        "Total number of certificates matching a rule category"
    );
    describe_gauge!(
        MONITOR_QUEUE_DEPTH,
        "Current number of entries waiting in the output queue"
    );
    describe_gauge!(DAEMON_RULES_LOADED, "Number of rule categories loaded");
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        MONITOR_SOURCES_ACTIVE,
        MONITOR_SOURCES_SKIPPED_TOTAL,
        MONITOR_ENTRIES_FETCHED_TOTAL,
        MONITOR_ENTRIES_DROPPED_TOTAL,
        MONITOR_POLL_FAILURES_TOTAL,
        MONITOR_DECODE_FAILURES_TOTAL,
        MONITOR_MATCHES_TOTAL,
        MONITOR_QUEUE_DEPTH,
        DAEMON_RULES_LOADED,
    ];

    #[test]
    fn all_metrics_start_with_ctwatch_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("ctwatch_"),
                "Metric '{}' does not start with 'ctwatch_' prefix",
                name
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        let counters = [
            MONITOR_SOURCES_SKIPPED_TOTAL,
            MONITOR_ENTRIES_FETCHED_TOTAL,
            MONITOR_ENTRIES_DROPPED_TOTAL,
            MONITOR_POLL_FAILURES_TOTAL,
            MONITOR_DECODE_FAILURES_TOTAL,
            MONITOR_MATCHES_TOTAL,
        ];
        for name in counters {
            assert!(name.ends_with("_total"), "counter '{name}' must end with _total");
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더가 설치되지 않아도 패닉하지 않아야 함
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_LOG, LABEL_CATEGORY, LABEL_STAGE] {
            assert_eq!(label.to_lowercase(), label);
        }
    }
}
