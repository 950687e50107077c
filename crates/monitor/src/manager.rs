//! CT 로그 모니터 관리자 -- 탐색, 폴링, 필터링, 생명주기 전체 흐름 관리
//!
//! [`CtLogsManager`]는 core의 [`Pipeline`] trait을 구현하여
//! `ctwatch-daemon`에서 start/stop/health_check 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! LogListSource ──discover()──> [LogSource, ...]
//!                                   |
//!                      PollingScheduler (로그당 태스크 1개)
//!                                   |
//!                              OutputQueue (고정 용량, 가득 차면 폐기)
//!                                   |
//!                      FilterWorkerPool (워커 N개)
//!                                   |
//!                              MatchSink
//! ```
//!
//! # 상태 전이
//! `Created → Running → Stopping → Stopped` 단방향이며 재시작하지 않습니다.
//! - `start()`를 두 번 호출하면 `AlreadyRunning` 에러
//! - `start()` 전이나 이미 정지한 뒤의 `stop()`은 아무 일도 하지 않음
//!
//! `stop()`은 먼저 폴링 태스크를 취소하고 진행 중이던 폴링까지 모두 끝나기를
//! 기다립니다. 그 뒤에 워커를 취소하므로 워커는 마지막 폴링이 넣은 엔트리까지
//! 처리하고 종료합니다. 마지막으로 출력 큐를 닫습니다.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use ctwatch_core::error::{CtwatchError, PipelineError};
use ctwatch_core::metrics as m;
use ctwatch_core::pipeline::{HealthStatus, Pipeline};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{HttpClientFactory, LogClient, LogClientFactory};
use crate::config::MonitorConfig;
use crate::eligibility::LogEligibilityFilter;
use crate::error::CtMonitorError;
use crate::event::{Diagnostics, MonitorEvent, StatsSnapshot};
use crate::loglist::{HttpLogListSource, LogListSource};
use crate::queue::OutputQueue;
use crate::rules::RulePack;
use crate::scheduler::PollingScheduler;
use crate::sink::{ChannelSink, MatchResult, MatchSink};
use crate::worker::{FilterContext, FilterWorkerPool};

/// 큐 사용률이 이 값을 넘으면 Degraded로 보고합니다.
const QUEUE_DEGRADED_UTILIZATION: f64 = 0.9;

/// 관리자 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// 생성됨, 아직 시작하지 않음
    Created,
    /// 실행 중
    Running,
    /// 정지 진행 중
    Stopping,
    /// 정지됨 (재시작 불가)
    Stopped,
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// CT 로그 모니터 관리자
///
/// # 사용 예시
/// ```ignore
/// use ctwatch_core::Pipeline;
/// use ctwatch_monitor::CtMonitorBuilder;
///
/// let (mut manager, matches) = CtMonitorBuilder::new()
///     .config(config)
///     .rules(rules)
///     .with_http_transport()?
///     .build()?;
///
/// manager.discover().await?;
/// manager.start().await?;
/// // ...
/// manager.stop().await?;
/// ```
pub struct CtLogsManager<L: LogListSource, F: LogClientFactory> {
    config: MonitorConfig,
    state: ManagerState,
    rules: Arc<RulePack>,
    sink: Arc<dyn MatchSink>,
    log_list: L,
    factory: F,
    filter: LogEligibilityFilter,
    queue: Arc<OutputQueue>,
    diagnostics: Diagnostics,
    /// 폴링 태스크 취소 신호
    poll_cancel: CancellationToken,
    /// 워커 취소 신호. 폴링 태스크가 모두 끝난 뒤에만 올립니다.
    worker_cancel: CancellationToken,
    /// 실행 전/정지 후의 소스 (정지 후에는 최종 커서 보관)
    sources: Vec<crate::source::LogSource<F::Client>>,
    source_count: usize,
    pollers: Vec<JoinHandle<crate::source::LogSource<F::Client>>>,
    workers: Option<FilterWorkerPool>,
}

impl<L: LogListSource, F: LogClientFactory> CtLogsManager<L, F> {
    /// 로그 목록을 가져와 모니터링할 소스를 구성합니다.
    ///
    /// 목록 수신/파싱 실패는 에러로 반환합니다. 개별 로그의 연결이나 트리 크기
    /// 조회 실패는 해당 로그만 건너뛰고 나머지는 계속 진행합니다.
    /// 시작 전에는 다시 호출할 수 있으며, 이전 탐색 결과를 대체합니다.
    ///
    /// 반환값은 구성된 소스 수입니다.
    pub async fn discover(&mut self) -> Result<usize, CtMonitorError> {
        if self.state != ManagerState::Created {
            return Err(CtMonitorError::Lifecycle(format!(
                "discover is only allowed before start (state: {})",
                self.state
            )));
        }

        let list = self.log_list.fetch().await?;
        let descriptors = list.descriptors();
        let listed = descriptors.len();
        let now = Utc::now();

        let mut seen = HashSet::new();
        let mut probes = JoinSet::new();
        let mut rejected = 0usize;

        for log in descriptors {
            if !self.filter.accepts(&log, now) {
                debug!(log = %log.url, description = %log.description, "log not eligible");
                rejected += 1;
                continue;
            }
            if !seen.insert(log.url.clone()) {
                continue;
            }

            let client = match self.factory.connect(&log.url) {
                Ok(client) => client,
                Err(e) => {
                    self.diagnostics.source_skipped(&log.url, &e.to_string());
                    continue;
                }
            };

            probes.spawn(async move {
                let size = client.tree_size().await;
                (log, client, size)
            });
        }

        let window_size = self.config.window_size;
        let mut sources = Vec::with_capacity(probes.len());
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((log, client, Ok(size))) => {
                    debug!(log = %log.url, tree_size = size, "log source ready");
                    sources.push(crate::source::LogSource::new(
                        client,
                        log.description,
                        size,
                        window_size,
                    ));
                }
                Ok((log, _, Err(e))) => {
                    self.diagnostics.source_skipped(&log.url, &e.to_string());
                }
                Err(e) => warn!(error = %e, "tree size probe task failed"),
            }
        }

        // 완료 순서와 무관하게 결정적인 순서를 유지합니다.
        sources.sort_by(|a, b| a.url().cmp(b.url()));

        info!(
            listed,
            rejected,
            sources = sources.len(),
            skipped = self.diagnostics.stats().snapshot().sources_skipped,
            "CT log discovery complete"
        );
        metrics::gauge!(m::MONITOR_SOURCES_ACTIVE).set(sources.len() as f64);

        self.source_count = sources.len();
        self.sources = sources;
        Ok(self.source_count)
    }

    /// 현재 상태
    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// 구성된 소스 수
    pub fn source_count(&self) -> usize {
        self.source_count
    }

    /// 실행 중이 아닐 때의 (URL, 커서) 목록. 실행 중에는 비어 있습니다.
    pub fn cursors(&self) -> Vec<(String, u64)> {
        self.sources
            .iter()
            .map(|s| (s.url().to_owned(), s.last_observed_size()))
            .collect()
    }

    /// 누적 통계
    pub fn stats(&self) -> StatsSnapshot {
        self.diagnostics.stats().snapshot()
    }

    /// 진단 이벤트를 구독합니다.
    pub fn subscribe_events(&self) -> Option<broadcast::Receiver<MonitorEvent>> {
        self.diagnostics.subscribe()
    }

    /// 공유 출력 큐
    pub fn queue(&self) -> &Arc<OutputQueue> {
        &self.queue
    }

    /// 룰 수
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 설정
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}

impl<L: LogListSource, F: LogClientFactory> Pipeline for CtLogsManager<L, F> {
    async fn start(&mut self) -> Result<(), CtwatchError> {
        if self.state != ManagerState::Created {
            return Err(PipelineError::AlreadyRunning.into());
        }

        if self.sources.is_empty() {
            warn!("starting CT monitor with no log sources");
        }

        info!(
            sources = self.sources.len(),
            workers = self.config.workers,
            rules = self.rules.len(),
            "starting CT monitor"
        );

        let context = Arc::new(FilterContext::new(
            Arc::clone(&self.rules),
            Arc::clone(&self.sink),
            self.diagnostics.clone(),
            self.config.match_target,
            self.config.include_precertificates,
        ));
        self.workers = Some(FilterWorkerPool::spawn(
            self.config.workers,
            Arc::clone(&self.queue),
            context,
            self.worker_cancel.clone(),
        ));

        let scheduler = PollingScheduler::new(
            self.config.poll_interval,
            Arc::clone(&self.queue),
            self.diagnostics.clone(),
            self.poll_cancel.clone(),
        );
        self.pollers = scheduler.spawn_all(self.sources.drain(..));

        self.state = ManagerState::Running;
        info!("CT monitor started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CtwatchError> {
        if self.state != ManagerState::Running {
            debug!(state = %self.state, "stop ignored, monitor is not running");
            return Ok(());
        }

        info!("stopping CT monitor");
        self.state = ManagerState::Stopping;
        self.poll_cancel.cancel();

        for poller in self.pollers.drain(..) {
            match poller.await {
                Ok(source) => self.sources.push(source),
                Err(e) => warn!(error = %e, "poll loop terminated abnormally"),
            }
        }

        // 폴링이 모두 끝난 뒤라 큐에 더 들어올 엔트리가 없습니다.
        self.worker_cancel.cancel();
        if let Some(workers) = self.workers.take() {
            workers.join().await;
        }

        let undelivered = self.queue.len();
        self.queue.close();
        metrics::gauge!(m::MONITOR_SOURCES_ACTIVE).set(0.0);
        metrics::gauge!(m::MONITOR_QUEUE_DEPTH).set(undelivered as f64);

        self.state = ManagerState::Stopped;
        info!(undelivered, "CT monitor stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ManagerState::Running => {
                let utilization = self.queue.utilization();
                if self.source_count == 0 {
                    HealthStatus::Degraded("no CT log sources".to_owned())
                } else if utilization > QUEUE_DEGRADED_UTILIZATION {
                    HealthStatus::Degraded(format!(
                        "output queue {:.0}% full",
                        utilization * 100.0
                    ))
                } else {
                    HealthStatus::Healthy
                }
            }
            ManagerState::Created => HealthStatus::Unhealthy("not started".to_owned()),
            ManagerState::Stopping => HealthStatus::Unhealthy("stopping".to_owned()),
            ManagerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// CT 모니터 빌더
///
/// 로그 목록 공급자와 클라이언트 팩토리는 타입 매개변수로 교체할 수 있습니다.
/// 수신자를 지정하지 않으면 `mpsc` 채널 수신자를 만들어 수신 측을 함께 반환합니다.
pub struct CtMonitorBuilder<L = HttpLogListSource, F = HttpClientFactory> {
    config: MonitorConfig,
    rules: Option<RulePack>,
    patterns: Vec<(String, String)>,
    sink: Option<Arc<dyn MatchSink>>,
    match_channel_capacity: usize,
    log_list: Option<L>,
    factory: Option<F>,
    filter: Option<LogEligibilityFilter>,
}

impl CtMonitorBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: MonitorConfig::default(),
            rules: None,
            patterns: Vec::new(),
            sink: None,
            match_channel_capacity: 1024,
            log_list: None,
            factory: None,
            filter: None,
        }
    }
}

impl Default for CtMonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: LogListSource, F: LogClientFactory> CtMonitorBuilder<L, F> {
    /// 모니터 설정을 지정합니다.
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// 컴파일된 룰 팩을 지정합니다.
    pub fn rules(mut self, rules: RulePack) -> Self {
        self.rules = Some(rules);
        self
    }

    /// 룰 하나를 추가합니다. `build()`에서 컴파일됩니다.
    pub fn rule(mut self, category: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.patterns.push((category.into(), pattern.into()));
        self
    }

    /// 매칭 결과 수신자를 지정합니다.
    pub fn sink(mut self, sink: impl MatchSink) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// 기본 채널 수신자의 용량을 지정합니다.
    pub fn match_channel_capacity(mut self, capacity: usize) -> Self {
        self.match_channel_capacity = capacity;
        self
    }

    /// 로그 적격성 필터를 지정합니다. 기본값은 설정의 `max_mmd_secs`를 사용합니다.
    pub fn eligibility_filter(mut self, filter: LogEligibilityFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// 로그 목록 공급자를 지정합니다.
    pub fn log_list_source<L2: LogListSource>(self, source: L2) -> CtMonitorBuilder<L2, F> {
        CtMonitorBuilder {
            config: self.config,
            rules: self.rules,
            patterns: self.patterns,
            sink: self.sink,
            match_channel_capacity: self.match_channel_capacity,
            log_list: Some(source),
            factory: self.factory,
            filter: self.filter,
        }
    }

    /// 로그 클라이언트 팩토리를 지정합니다.
    pub fn client_factory<F2: LogClientFactory>(self, factory: F2) -> CtMonitorBuilder<L, F2> {
        CtMonitorBuilder {
            config: self.config,
            rules: self.rules,
            patterns: self.patterns,
            sink: self.sink,
            match_channel_capacity: self.match_channel_capacity,
            log_list: self.log_list,
            factory: Some(factory),
            filter: self.filter,
        }
    }

    /// 현재 설정의 URL과 타임아웃으로 HTTP 공급자와 팩토리를 구성합니다.
    pub fn with_http_transport(
        self,
    ) -> Result<CtMonitorBuilder<HttpLogListSource, HttpClientFactory>, CtMonitorError> {
        let log_list = HttpLogListSource::new(&self.config.log_list_url, self.config.http_timeout)?;
        let factory = HttpClientFactory::new(self.config.http_timeout)?;
        Ok(self.log_list_source(log_list).client_factory(factory))
    }

    /// 관리자를 생성합니다.
    ///
    /// 수신자를 지정하지 않았다면 매칭 결과 수신 채널을 함께 반환합니다.
    pub fn build(
        self,
    ) -> Result<(CtLogsManager<L, F>, Option<mpsc::Receiver<MatchResult>>), CtMonitorError> {
        self.config.validate()?;

        let rules = match (self.rules, self.patterns.is_empty()) {
            (Some(rules), true) => rules,
            (None, false) => RulePack::compile(self.patterns)?,
            (Some(_), false) => {
                return Err(CtMonitorError::Config {
                    field: "rules".to_owned(),
                    reason: "set either a rule pack or individual rules, not both".to_owned(),
                });
            }
            (None, true) => {
                return Err(CtMonitorError::Config {
                    field: "rules".to_owned(),
                    reason: "at least one rule is required".to_owned(),
                });
            }
        };
        if rules.is_empty() {
            return Err(CtMonitorError::Config {
                field: "rules".to_owned(),
                reason: "at least one rule is required".to_owned(),
            });
        }

        let log_list = self.log_list.ok_or_else(|| CtMonitorError::Config {
            field: "log_list_source".to_owned(),
            reason: "log list source is required".to_owned(),
        })?;
        let factory = self.factory.ok_or_else(|| CtMonitorError::Config {
            field: "client_factory".to_owned(),
            reason: "log client factory is required".to_owned(),
        })?;

        let (sink, match_rx) = match self.sink {
            Some(sink) => (sink, None),
            None => {
                let (sink, rx) = ChannelSink::channel(self.match_channel_capacity);
                (Arc::new(sink) as Arc<dyn MatchSink>, Some(rx))
            }
        };

        let filter = self
            .filter
            .unwrap_or_else(|| LogEligibilityFilter::new(self.config.max_mmd_secs));
        let queue = Arc::new(OutputQueue::new(self.config.queue_capacity));
        let diagnostics = Diagnostics::with_events(self.config.event_channel_capacity);

        let manager = CtLogsManager {
            config: self.config,
            state: ManagerState::Created,
            rules: Arc::new(rules),
            sink,
            log_list,
            factory,
            filter,
            queue,
            diagnostics,
            poll_cancel: CancellationToken::new(),
            worker_cancel: CancellationToken::new(),
            sources: Vec::new(),
            source_count: 0,
            pollers: Vec::new(),
            workers: None,
        };

        Ok((manager, match_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::tests::fixture_der;
    use crate::client::mock::{MockClientFactory, MockLogClient};
    use crate::config::MonitorConfigBuilder;
    use crate::loglist::StaticLogListSource;
    use std::time::Duration;

    fn log_list(urls: &[(&str, &str, u64)]) -> StaticLogListSource {
        let logs: Vec<_> = urls
            .iter()
            .map(|(url, description, mmd)| {
                serde_json::json!({
                    "description": description,
                    "url": url,
                    "mmd": mmd,
                    "state": { "usable": { "timestamp": "2025-01-01T00:00:00Z" } }
                })
            })
            .collect();
        let doc = serde_json::json!({ "operators": [{ "name": "Test", "logs": logs }] });
        StaticLogListSource::from_json(doc.to_string().as_bytes()).unwrap()
    }

    fn config() -> MonitorConfig {
        MonitorConfigBuilder::new()
            .poll_interval(Duration::from_millis(50))
            .workers(2)
            .queue_capacity(64)
            .build()
            .unwrap()
    }

    type TestManager = CtLogsManager<StaticLogListSource, MockClientFactory>;

    fn build(
        list: StaticLogListSource,
        factory: MockClientFactory,
    ) -> (TestManager, mpsc::Receiver<MatchResult>) {
        let (manager, rx) = CtMonitorBuilder::new()
            .config(config())
            .rule("test", r"^test\.")
            .log_list_source(list)
            .client_factory(factory)
            .build()
            .unwrap();
        (manager, rx.unwrap())
    }

    #[test]
    fn build_requires_rules() {
        let result = CtMonitorBuilder::new()
            .log_list_source(log_list(&[]))
            .client_factory(MockClientFactory::default())
            .build();
        assert!(matches!(result, Err(CtMonitorError::Config { ref field, .. }) if field == "rules"));
    }

    #[test]
    fn build_rejects_invalid_rule_naming_category() {
        let result = CtMonitorBuilder::new()
            .rule("broken", "(")
            .log_list_source(log_list(&[]))
            .client_factory(MockClientFactory::default())
            .build();
        assert!(matches!(
            result,
            Err(CtMonitorError::RuleCompile { ref category, .. }) if category == "broken"
        ));
    }

    #[test]
    fn build_requires_transport() {
        let result = CtMonitorBuilder::new().rule("a", "a").build();
        assert!(matches!(
            result,
            Err(CtMonitorError::Config { ref field, .. }) if field == "log_list_source"
        ));
    }

    #[test]
    fn custom_sink_returns_no_receiver() {
        let (sink, _rx) = ChannelSink::channel(1);
        let (_, rx) = CtMonitorBuilder::new()
            .rule("a", "a")
            .sink(sink)
            .log_list_source(log_list(&[]))
            .client_factory(MockClientFactory::default())
            .build()
            .unwrap();
        assert!(rx.is_none());
    }

    #[test]
    fn http_transport_uses_config() {
        let result = CtMonitorBuilder::new().rule("a", "a").with_http_transport();
        assert!(result.is_ok());

        let bad = CtMonitorBuilder::new()
            .config(MonitorConfig {
                log_list_url: "::not a url::".to_owned(),
                ..MonitorConfig::default()
            })
            .with_http_transport();
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn discover_isolates_per_log_failures() {
        let factory = MockClientFactory::default();
        let healthy = MockLogClient::new("https://b.example/");
        healthy.set_tree_size(42);
        let broken_sth = MockLogClient::new("https://c.example/");
        broken_sth.fail_tree_size(true);
        let other = MockLogClient::new("https://a.example/");
        other.set_tree_size(7);
        factory.register(healthy);
        factory.register(broken_sth);
        factory.register(other);

        let list = log_list(&[
            ("https://b.example/", "B", 60),
            ("https://c.example/", "C", 60),
            ("https://unreachable.example/", "D", 60),
            ("https://a.example/", "A", 60),
            ("https://bogus.example/", "bogus log", 60),
            ("https://slow.example/", "slow", 86_401),
        ]);

        let (mut manager, _rx) = build(list, factory);
        let mut events = manager.subscribe_events().unwrap();
        let count = manager.discover().await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            manager.cursors(),
            vec![
                ("https://a.example/".to_owned(), 7),
                ("https://b.example/".to_owned(), 42)
            ]
        );
        assert_eq!(manager.stats().sources_skipped, 2);

        let mut skipped = Vec::new();
        while let Ok(MonitorEvent::SourceSkipped { log, .. }) = events.try_recv() {
            skipped.push(log);
        }
        skipped.sort();
        assert_eq!(skipped, vec!["https://c.example/", "https://unreachable.example/"]);
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let factory = MockClientFactory::default();
        let log = MockLogClient::new("https://log.example/");
        factory.register(log);
        let (mut manager, _rx) = build(log_list(&[("https://log.example/", "L", 60)]), factory);

        // 시작 전 stop은 아무 일도 하지 않습니다.
        manager.stop().await.unwrap();
        assert_eq!(manager.state(), ManagerState::Created);
        assert!(manager.health_check().await.is_unhealthy());

        manager.discover().await.unwrap();
        manager.start().await.unwrap();
        assert_eq!(manager.state(), ManagerState::Running);
        assert!(manager.health_check().await.is_healthy());
        assert!(manager.start().await.is_err());
        assert!(matches!(
            manager.discover().await,
            Err(CtMonitorError::Lifecycle(_))
        ));

        manager.stop().await.unwrap();
        assert_eq!(manager.state(), ManagerState::Stopped);
        assert!(manager.queue().is_closed());

        // 두 번째 stop도 안전합니다.
        manager.stop().await.unwrap();
        assert_eq!(manager.state(), ManagerState::Stopped);
        assert!(manager.start().await.is_err());
    }

    #[tokio::test]
    async fn running_without_sources_is_degraded() {
        let (mut manager, _rx) = build(log_list(&[]), MockClientFactory::default());
        assert_eq!(manager.discover().await.unwrap(), 0);
        manager.start().await.unwrap();
        assert!(matches!(
            manager.health_check().await,
            HealthStatus::Degraded(_)
        ));
        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn matches_flow_end_to_end_and_stop_keeps_cursor() {
        let factory = MockClientFactory::default();
        let log = MockLogClient::new("https://log.example/");
        factory.register(log.clone());
        let (mut manager, mut rx) = build(log_list(&[("https://log.example/", "L", 60)]), factory);

        manager.discover().await.unwrap();
        log.append_cert(fixture_der("test.example.com"));
        log.append_cert(fixture_der("other1.com"));
        manager.start().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.category, "test");
        assert_eq!(result.index, 0);

        manager.stop().await.unwrap();
        assert_eq!(manager.cursors(), vec![("https://log.example/".to_owned(), 2)]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stop_evaluates_entries_from_in_flight_poll() {
        let factory = MockClientFactory::default();
        let log = MockLogClient::new("https://log.example/");
        factory.register(log.clone());
        let (mut manager, mut rx) = build(log_list(&[("https://log.example/", "L", 60)]), factory);

        manager.discover().await.unwrap();
        log.append_cert(fixture_der("test.example.com"));
        log.delay_entries(Duration::from_millis(300));
        manager.start().await.unwrap();

        // get-entries 응답이 오기 전에 정지를 요청합니다.
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.stop().await.unwrap();

        assert_eq!(manager.cursors(), vec![("https://log.example/".to_owned(), 1)]);
        assert_eq!(manager.stats().entries_fetched, 1);
        assert_eq!(manager.stats().matches, 1);
        assert!(manager.queue().is_empty());
        let result = rx.try_recv().expect("match from the last poll is delivered");
        assert_eq!(result.category, "test");
        assert_eq!(result.index, 0);
    }
}
