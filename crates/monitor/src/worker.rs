//! 필터 워커 풀
//!
//! 고정 수의 워커가 출력 큐를 공유하여 엔트리를 꺼내고, 인증서를 디코딩해
//! 룰 팩과 대조합니다.
//!
//! 엔트리 처리 순서:
//! 1. 인증서 본문이 없으면 폐기
//! 2. precertificate 제외 설정이면 precertificate 폐기
//! 3. 디코딩 실패 시 조용히 폐기 (trace 로그와 카운터만)
//! 4. 룰 팩에서 사전순 첫 매칭 카테고리 선택, 없으면 폐기
//! 5. [`MatchResult`]를 만들어 수신자에게 전달
//!
//! 워커는 취소 신호를 받으면 이미 큐에 쌓인 엔트리를 대기 없이 처리한 뒤
//! 종료합니다. 큐가 닫혀 비어도 종료합니다. 따라서 `cancel`은 큐에 넣는
//! 쪽이 모두 멈춘 뒤에 올려야 합니다.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::certificate::DecodedCertificate;
use crate::config::MatchTarget;
use crate::entry::{CertKind, RawEntry};
use crate::event::Diagnostics;
use crate::queue::OutputQueue;
use crate::rules::RulePack;
use crate::sink::{MatchResult, MatchSink};

/// 워커들이 공유하는 필터 설정과 수신자
pub struct FilterContext {
    rules: Arc<RulePack>,
    sink: Arc<dyn MatchSink>,
    diagnostics: Diagnostics,
    match_target: MatchTarget,
    include_precertificates: bool,
}

impl FilterContext {
    /// 필터 컨텍스트를 생성합니다.
    pub fn new(
        rules: Arc<RulePack>,
        sink: Arc<dyn MatchSink>,
        diagnostics: Diagnostics,
        match_target: MatchTarget,
        include_precertificates: bool,
    ) -> Self {
        Self {
            rules,
            sink,
            diagnostics,
            match_target,
            include_precertificates,
        }
    }

    /// 엔트리 하나를 판정합니다. 매칭되지 않으면 `None`입니다.
    pub fn evaluate(&self, entry: RawEntry) -> Option<MatchResult> {
        let Some(payload) = entry.certificate else {
            self.diagnostics.without_certificate();
            return None;
        };

        if payload.kind == CertKind::Precertificate && !self.include_precertificates {
            return None;
        }

        let certificate = match DecodedCertificate::from_der(&payload.der) {
            Ok(certificate) => certificate,
            Err(e) => {
                self.diagnostics
                    .decode_failed(&entry.log, entry.index, &e.to_string());
                return None;
            }
        };

        let include_sans = self.match_target == MatchTarget::CommonNameAndSans;
        let category = self
            .rules
            .first_match(&certificate.match_candidates(include_sans))?
            .to_owned();

        Some(MatchResult {
            category,
            log: entry.log.to_string(),
            index: entry.index,
            kind: payload.kind,
            timestamp_ms: entry.timestamp_ms,
            certificate,
        })
    }

    fn process(&self, entry: RawEntry) {
        if let Some(result) = self.evaluate(entry) {
            debug!(
                category = %result.category,
                cn = result.common_name().unwrap_or_default(),
                log = %result.log,
                index = result.index,
                "certificate matched"
            );
            self.diagnostics.matched(&result.category);
            self.sink.deliver(result);
        }
    }
}

/// 고정 크기 필터 워커 풀
pub struct FilterWorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl FilterWorkerPool {
    /// 워커 `workers`개를 띄웁니다. 0이면 1개로 올려 잡습니다.
    pub fn spawn(
        workers: usize,
        queue: Arc<OutputQueue>,
        context: Arc<FilterContext>,
        cancel: CancellationToken,
    ) -> Self {
        let handles = (0..workers.max(1))
            .map(|id| {
                let queue = Arc::clone(&queue);
                let context = Arc::clone(&context);
                let cancel = cancel.clone();
                tokio::spawn(run_worker(id, queue, context, cancel))
            })
            .collect();

        Self { handles }
    }

    /// 워커 수
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// 워커가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// 모든 워커가 종료될 때까지 기다립니다.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "filter worker terminated abnormally");
            }
        }
    }
}

async fn run_worker(
    id: usize,
    queue: Arc<OutputQueue>,
    context: Arc<FilterContext>,
    cancel: CancellationToken,
) {
    debug!(worker = id, "filter worker started");

    loop {
        let entry = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                while let Some(entry) = queue.try_take() {
                    context.process(entry);
                }
                break;
            }
            entry = queue.take() => entry,
        };

        match entry {
            Some(entry) => context.process(entry),
            None => break,
        }
    }

    debug!(worker = id, "filter worker stopped");
}
