//! 로그 소스와 페이지네이션 커서
//!
//! [`LogSource`]는 로그 하나의 조회 능력과 커서(`last_observed_size`)를 함께 보관합니다.
//! 생성 이후에는 자신의 폴링 루프만 소유하므로 동시 변경이 없습니다.
//!
//! # 커서 규칙
//! - `last_observed_size`는 절대 감소하지 않습니다 (로그는 추가 전용).
//! - 한 번의 폴링은 `window_size`보다 많은 엔트리를 가져오지 않습니다.
//! - 조회에 성공하면 커서는 실제로 받은 구간의 끝으로 전진합니다.
//!   서버가 요청보다 적게 돌려주면 받은 만큼만 전진합니다.

use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use crate::client::LogClient;
use crate::entry::RawEntry;
use crate::error::CtMonitorError;

/// 기본 폴링 윈도우 크기
pub const DEFAULT_WINDOW_SIZE: u64 = 1000;

/// 폴링 한 번의 결과
#[derive(Debug)]
pub enum PollOutcome {
    /// 트리 크기 변화 없음
    Unchanged,
    /// 새 엔트리 수신
    Fetched {
        /// 실제로 수신한 구간 `[start, end)`
        window: Range<u64>,
        /// 수신 순서대로의 엔트리
        entries: Vec<RawEntry>,
    },
}

/// 커서를 가진 로그 소스
pub struct LogSource<C> {
    client: C,
    url: Arc<str>,
    description: String,
    last_observed_size: u64,
    window_size: u64,
}

impl<C: LogClient> LogSource<C> {
    /// 소스를 생성합니다. 모니터링은 `initial_size`부터 시작합니다.
    pub fn new(client: C, description: impl Into<String>, initial_size: u64, window_size: u64) -> Self {
        let url = Arc::from(client.url());
        Self {
            client,
            url,
            description: description.into(),
            last_observed_size: initial_size,
            window_size: window_size.max(1),
        }
    }

    /// 로그 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 엔트리에 붙는 공유 로그 식별자
    pub fn log_id(&self) -> Arc<str> {
        Arc::clone(&self.url)
    }

    /// 로그 설명
    pub fn description(&self) -> &str {
        &self.description
    }

    /// 지금까지 소비한 엔트리 수 (커서)
    pub fn last_observed_size(&self) -> u64 {
        self.last_observed_size
    }

    /// 폴링 윈도우 크기
    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    /// 현재 트리 크기에 대해 다음에 가져올 구간을 계산합니다.
    ///
    /// 새 엔트리가 없거나 트리가 줄어든 것으로 보이면 `None`입니다.
    pub fn next_window(&self, current_size: u64) -> Option<Range<u64>> {
        if current_size <= self.last_observed_size {
            return None;
        }
        let start = self.last_observed_size;
        let end = start.saturating_add(self.window_size).min(current_size);
        Some(start..end)
    }

    /// 한 번 폴링합니다.
    ///
    /// 전송 실패는 커서를 움직이지 않고 그대로 반환합니다.
    pub async fn poll(&mut self) -> Result<PollOutcome, CtMonitorError> {
        let current = self.client.tree_size().await?;

        let Some(window) = self.next_window(current) else {
            if current < self.last_observed_size {
                debug!(
                    log = %self.url,
                    current,
                    cursor = self.last_observed_size,
                    "reported tree size is behind cursor, ignoring"
                );
            }
            return Ok(PollOutcome::Unchanged);
        };

        let mut entries = self.client.entries(window.start, window.end).await?;
        let requested = usize::try_from(window.end - window.start).unwrap_or(usize::MAX);
        entries.truncate(requested);

        if entries.is_empty() {
            return Err(CtMonitorError::Protocol {
                log: self.url.to_string(),
                reason: format!(
                    "no entries returned for range [{}, {})",
                    window.start, window.end
                ),
            });
        }

        let fetched_end = window.start + entries.len() as u64;
        self.last_observed_size = fetched_end;

        Ok(PollOutcome::Fetched {
            window: window.start..fetched_end,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockLogClient;

    fn source(mock: &MockLogClient, initial: u64, window: u64) -> LogSource<MockLogClient> {
        LogSource::new(mock.clone(), "mock log", initial, window)
    }

    #[test]
    fn next_window_is_capped() {
        let mock = MockLogClient::new("https://mock/");
        let src = source(&mock, 100, 1000);
        assert_eq!(src.next_window(100), None);
        assert_eq!(src.next_window(50), None);
        assert_eq!(src.next_window(150), Some(100..150));
        assert_eq!(src.next_window(5100), Some(100..1100));
    }

    #[test]
    fn zero_window_is_raised_to_one() {
        let mock = MockLogClient::new("https://mock/");
        let src = source(&mock, 0, 0);
        assert_eq!(src.window_size(), 1);
        assert_eq!(src.next_window(10), Some(0..1));
    }

    #[tokio::test]
    async fn unchanged_tree_is_noop() {
        let mock = MockLogClient::new("https://mock/");
        mock.set_tree_size(10);
        let mut src = source(&mock, 10, 1000);

        assert!(matches!(src.poll().await.unwrap(), PollOutcome::Unchanged));
        assert_eq!(src.last_observed_size(), 10);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn large_backlog_fetches_exactly_one_window() {
        let mock = MockLogClient::new("https://mock/");
        mock.set_tree_size(5000);
        let mut src = source(&mock, 0, 1000);

        match src.poll().await.unwrap() {
            PollOutcome::Fetched { window, entries } => {
                assert_eq!(window, 0..1000);
                assert_eq!(entries.len(), 1000);
                assert_eq!(entries[0].index, 0);
                assert_eq!(entries[999].index, 999);
            }
            PollOutcome::Unchanged => panic!("expected entries"),
        }
        assert_eq!(src.last_observed_size(), 1000);
        assert_eq!(mock.requests(), vec![(0, 1000)]);
    }

    #[tokio::test]
    async fn cursor_advances_across_repeated_polls_on_growing_log() {
        let mock = MockLogClient::new("https://mock/");
        mock.set_tree_size(3);
        let mut src = source(&mock, 0, 2);
        let mut previous = src.last_observed_size();

        let mut seen = Vec::new();
        for step in 0..8u64 {
            if step == 3 {
                mock.set_tree_size(7);
            }
            if let PollOutcome::Fetched { window, entries } = src.poll().await.unwrap() {
                assert_eq!(src.last_observed_size(), window.end);
                assert!(window.end - window.start <= 2);
                seen.extend(entries.iter().map(|e| e.index));
            }
            assert!(src.last_observed_size() >= previous);
            previous = src.last_observed_size();
        }

        assert_eq!(src.last_observed_size(), 7);
        assert_eq!(seen, (0..7).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn short_response_advances_by_received_count() {
        let mock = MockLogClient::new("https://mock/");
        mock.set_tree_size(100);
        mock.limit_batch(32);
        let mut src = source(&mock, 0, 1000);

        match src.poll().await.unwrap() {
            PollOutcome::Fetched { window, .. } => assert_eq!(window, 0..32),
            PollOutcome::Unchanged => panic!("expected entries"),
        }
        assert_eq!(src.last_observed_size(), 32);

        src.poll().await.unwrap();
        assert_eq!(mock.requests(), vec![(0, 100), (32, 100)]);
        assert_eq!(src.last_observed_size(), 64);
    }

    #[tokio::test]
    async fn transport_failure_keeps_cursor() {
        let mock = MockLogClient::new("https://mock/");
        mock.set_tree_size(10);
        mock.fail_entries(true);
        let mut src = source(&mock, 0, 1000);

        assert!(matches!(src.poll().await, Err(CtMonitorError::Transport { .. })));
        assert_eq!(src.last_observed_size(), 0);

        mock.fail_entries(false);
        src.poll().await.unwrap();
        assert_eq!(src.last_observed_size(), 10);
    }

    #[tokio::test]
    async fn tree_size_failure_is_reported() {
        let mock = MockLogClient::new("https://mock/");
        mock.fail_tree_size(true);
        let mut src = source(&mock, 0, 1000);
        assert!(src.poll().await.is_err());
    }

    #[tokio::test]
    async fn empty_response_is_protocol_error() {
        let mock = MockLogClient::new("https://mock/");
        mock.set_tree_size(10);
        mock.limit_batch(0);
        let mut src = source(&mock, 0, 1000);

        assert!(matches!(src.poll().await, Err(CtMonitorError::Protocol { .. })));
        assert_eq!(src.last_observed_size(), 0);
    }

    #[tokio::test]
    async fn shrinking_tree_does_not_move_cursor_backwards() {
        let mock = MockLogClient::new("https://mock/");
        mock.set_tree_size(5);
        let mut src = source(&mock, 20, 1000);
        assert!(matches!(src.poll().await.unwrap(), PollOutcome::Unchanged));
        assert_eq!(src.last_observed_size(), 20);
    }
}
