//! 출력 큐
//!
//! 폴링 루프(다중 생산자)와 필터 워커(다중 소비자) 사이의 고정 용량 큐입니다.
//!
//! - [`OutputQueue::offer`]는 절대 대기하지 않습니다. 큐가 가득 차면 엔트리를
//!   버리고 [`OfferError::Full`]로 돌려줍니다.
//! - [`OutputQueue::take`]는 엔트리가 생기거나 큐가 닫힐 때까지 대기합니다.
//! - [`OutputQueue::close`] 이후에는 투입이 거부되며, 남은 엔트리는 `take`로
//!   모두 꺼낼 수 있고 그 다음에 `None`(스트림 종료)이 반환됩니다.
//!
//! 저장소는 lock-free `ConcurrentQueue`이고, 대기/깨우기는 `tokio::sync::Notify`로
//! 처리합니다.

use std::sync::atomic::{AtomicU64, Ordering};

use concurrent_queue::{ConcurrentQueue, PopError, PushError};
use tokio::sync::Notify;

use crate::entry::RawEntry;

/// 투입 실패 사유
#[derive(Debug)]
pub enum OfferError {
    /// 용량 초과로 버려짐 (엔트리 반환)
    Full(RawEntry),
    /// 닫힌 큐
    Closed(RawEntry),
}

impl OfferError {
    /// 거부된 엔트리를 돌려받습니다.
    pub fn into_entry(self) -> RawEntry {
        match self {
            Self::Full(entry) | Self::Closed(entry) => entry,
        }
    }

    /// 닫힌 큐로 인한 거부인지 여부
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// 고정 용량 MPMC 출력 큐
pub struct OutputQueue {
    inner: ConcurrentQueue<RawEntry>,
    capacity: usize,
    available: Notify,
    dropped: AtomicU64,
}

impl OutputQueue {
    /// 주어진 용량으로 큐를 생성합니다. 용량 0은 1로 올려 잡습니다.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: ConcurrentQueue::bounded(capacity),
            capacity,
            available: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// 엔트리를 대기 없이 투입합니다.
    pub fn offer(&self, entry: RawEntry) -> Result<(), OfferError> {
        match self.inner.push(entry) {
            Ok(()) => {
                self.available.notify_one();
                Ok(())
            }
            Err(PushError::Full(entry)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(OfferError::Full(entry))
            }
            Err(PushError::Closed(entry)) => Err(OfferError::Closed(entry)),
        }
    }

    /// 엔트리를 하나 꺼냅니다. 비어 있으면 새 엔트리나 닫힘을 기다립니다.
    ///
    /// 닫힌 큐가 비었을 때 `None`을 반환합니다.
    pub async fn take(&self) -> Option<RawEntry> {
        loop {
            match self.inner.pop() {
                Ok(entry) => return Some(entry),
                Err(PopError::Closed) => return None,
                Err(PopError::Empty) => {}
            }

            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            // 대기 등록 후 다시 확인해야 그 사이의 투입/닫힘을 놓치지 않습니다.
            match self.inner.pop() {
                Ok(entry) => return Some(entry),
                Err(PopError::Closed) => return None,
                Err(PopError::Empty) => {}
            }

            notified.await;
        }
    }

    /// 대기 없이 엔트리를 꺼냅니다.
    pub fn try_take(&self) -> Option<RawEntry> {
        self.inner.pop().ok()
    }

    /// 큐를 닫습니다. 여러 번 호출해도 안전하며, 처음 닫은 호출만 `true`를 반환합니다.
    pub fn close(&self) -> bool {
        let closed_now = self.inner.close();
        self.available.notify_waiters();
        closed_now
    }

    /// 닫힘 여부
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// 현재 적재된 엔트리 수
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// 비어있는지 여부
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// 고정 용량
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 용량 초과로 버려진 누적 엔트리 수
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// 사용률 (0.0 ~ 1.0)
    pub fn utilization(&self) -> f64 {
        self.len() as f64 / self.capacity as f64
    }
}
