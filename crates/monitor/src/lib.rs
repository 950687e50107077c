//! ctwatch CT 로그 모니터
//!
//! 공개 Certificate Transparency 로그를 지속적으로 폴링하여 새로 발급된
//! 인증서 중 운영자가 지정한 정규식 룰에 맞는 것을 찾아냅니다.
//!
//! # 구성 요소
//! - [`RulePack`]: 카테고리 → 정규식 매핑 (불변)
//! - [`LogEligibilityFilter`]: 모니터링할 로그 선별
//! - [`LogSource`]: 로그별 커서와 조회 능력
//! - [`PollingScheduler`]: 로그마다 독립 폴링 태스크
//! - [`OutputQueue`]: 고정 용량 큐, 가득 차면 폐기
//! - [`FilterWorkerPool`]: 디코딩과 룰 매칭
//! - [`CtLogsManager`]: 탐색과 생명주기 관리
//!
//! # 사용 예시
//! ```ignore
//! use ctwatch_core::Pipeline;
//! use ctwatch_monitor::{CtMonitorBuilder, RulePack};
//!
//! let rules = RulePack::load_json_file("rules.json").await?;
//! let (mut manager, mut matches) = CtMonitorBuilder::new()
//!     .rules(rules)
//!     .with_http_transport()?
//!     .build()?;
//!
//! manager.discover().await?;
//! manager.start().await?;
//! while let Some(m) = matches.as_mut().unwrap().recv().await {
//!     println!("{} {:?}", m.category, m.common_name());
//! }
//! ```

pub mod certificate;
pub mod client;
pub mod config;
pub mod eligibility;
pub mod entry;
pub mod error;
pub mod event;
pub mod loglist;
pub mod manager;
pub mod queue;
pub mod rules;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod worker;

// --- 주요 타입 re-export ---

pub use certificate::DecodedCertificate;
pub use client::{HttpClientFactory, HttpLogClient, LogClient, LogClientFactory};
pub use config::{MatchTarget, MonitorConfig, MonitorConfigBuilder};
pub use eligibility::LogEligibilityFilter;
pub use entry::{CertKind, CertPayload, RawEntry};
pub use error::CtMonitorError;
pub use event::{Diagnostics, MonitorEvent, MonitorStats, StatsSnapshot};
pub use loglist::{HttpLogListSource, LogDescriptor, LogList, LogListSource, LogState, StaticLogListSource};
pub use manager::{CtLogsManager, CtMonitorBuilder, ManagerState};
pub use queue::{OfferError, OutputQueue};
pub use rules::RulePack;
pub use scheduler::PollingScheduler;
pub use sink::{ChannelSink, JsonLinesSink, MatchResult, MatchSink};
pub use source::{LogSource, PollOutcome};
pub use worker::{FilterContext, FilterWorkerPool};
