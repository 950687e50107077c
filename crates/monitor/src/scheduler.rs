//! 폴링 스케줄러
//!
//! 로그 소스마다 독립적인 폴링 태스크를 하나씩 띄웁니다. 각 태스크는
//! 즉시 한 번 폴링한 뒤 고정 주기로 폴링하며, 취소 신호를 받으면 종료하고
//! 최종 커서를 담은 [`LogSource`]를 돌려줍니다.
//!
//! 취소는 주기 대기 지점에서만 관찰합니다. 진행 중인 네트워크 호출은
//! 끝까지 완료된 뒤에 종료합니다.
//!
//! 폴링 실패는 보고만 하고 다음 주기에 그대로 재시도합니다 (백오프 없음).

use std::sync::Arc;
use std::time::Duration;

use ctwatch_core::metrics as m;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::LogClient;
use crate::event::Diagnostics;
use crate::queue::{OfferError, OutputQueue};
use crate::source::{LogSource, PollOutcome};

/// 로그별 폴링 태스크 생성기
#[derive(Clone)]
pub struct PollingScheduler {
    interval: Duration,
    queue: Arc<OutputQueue>,
    diagnostics: Diagnostics,
    cancel: CancellationToken,
}

impl PollingScheduler {
    /// 스케줄러를 생성합니다.
    pub fn new(
        interval: Duration,
        queue: Arc<OutputQueue>,
        diagnostics: Diagnostics,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            interval,
            queue,
            diagnostics,
            cancel,
        }
    }

    /// 소스 하나에 대한 폴링 태스크를 띄웁니다.
    ///
    /// 태스크는 취소 후 최종 커서 상태의 소스를 반환합니다.
    pub fn spawn<C: LogClient>(&self, source: LogSource<C>) -> JoinHandle<LogSource<C>> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run(source).await })
    }

    /// 모든 소스에 대해 폴링 태스크를 띄웁니다.
    pub fn spawn_all<C: LogClient>(
        &self,
        sources: impl IntoIterator<Item = LogSource<C>>,
    ) -> Vec<JoinHandle<LogSource<C>>> {
        sources.into_iter().map(|source| self.spawn(source)).collect()
    }

    async fn run<C: LogClient>(self, mut source: LogSource<C>) -> LogSource<C> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(log = %source.url(), cursor = source.last_observed_size(), "poll loop started");

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            poll_once(&mut source, &self.queue, &self.diagnostics).await;
        }

        debug!(log = %source.url(), cursor = source.last_observed_size(), "poll loop stopped");
        source
    }
}

/// 한 번 폴링하고 받은 엔트리를 큐에 넣습니다.
///
/// 큐가 가득 차서 버려진 엔트리는 폴링 단위로 합산해 한 번 보고합니다.
pub(crate) async fn poll_once<C: LogClient>(
    source: &mut LogSource<C>,
    queue: &OutputQueue,
    diagnostics: &Diagnostics,
) {
    match source.poll().await {
        Ok(PollOutcome::Unchanged) => diagnostics.polled(source.url(), 0),
        Ok(PollOutcome::Fetched { entries, .. }) => {
            let fetched = entries.len() as u64;
            let mut dropped = 0u64;
            for entry in entries {
                match queue.offer(entry) {
                    Ok(()) => {}
                    Err(OfferError::Full(_)) => dropped += 1,
                    Err(OfferError::Closed(_)) => {
                        debug!(log = %source.url(), "output queue closed, discarding rest of window");
                        break;
                    }
                }
            }

            diagnostics.polled(source.url(), fetched);
            diagnostics.entries_dropped(source.url(), dropped);
            metrics::gauge!(m::MONITOR_QUEUE_DEPTH).set(queue.len() as f64);
        }
        Err(e) => diagnostics.poll_failed(source.url(), &e.to_string()),
    }
}
