//! 로그 적격성 판정
//!
//! 로그 목록에서 발견된 로그 중 모니터링할 가치가 있는 로그를 선별합니다.
//! 판정은 순수 함수이며 실패하지 않습니다.

use chrono::{DateTime, Utc};

use crate::loglist::{LogDescriptor, LogState};

/// 허용하는 기본 최대 MMD (24시간)
pub const DEFAULT_MAX_MMD_SECS: u64 = 86_400;

/// 테스트/더미 로그를 표시하는 설명 문자열 (대소문자 구분)
const REJECTED_MARKERS: [&str; 2] = ["bogus", "placeholder"];

/// 로그 적격성 필터
///
/// 다음 중 하나라도 해당하면 로그를 거부합니다.
/// - 설명에 `bogus` 또는 `placeholder` 포함
/// - 상태가 `Retired` 또는 `Rejected`
/// - 현재 시각이 유효 구간 종료 시각 이후
/// - MMD가 최대 허용값 초과
#[derive(Debug, Clone, Copy)]
pub struct LogEligibilityFilter {
    max_mmd_secs: u64,
}

impl Default for LogEligibilityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MMD_SECS)
    }
}

impl LogEligibilityFilter {
    /// 최대 MMD를 지정하여 필터를 생성합니다.
    pub fn new(max_mmd_secs: u64) -> Self {
        Self { max_mmd_secs }
    }

    /// 현재 시각 기준으로 로그 사용 가능 여부를 판정합니다.
    pub fn usable(
        &self,
        description: &str,
        state: Option<LogState>,
        validity_end: Option<DateTime<Utc>>,
        mmd_secs: u64,
    ) -> bool {
        self.usable_at(description, state, validity_end, mmd_secs, Utc::now())
    }

    /// 주어진 시각 기준으로 로그 사용 가능 여부를 판정합니다.
    ///
    /// 상태가 없으면 폐기되지 않은 것으로, 유효 구간이 없으면 만료되지 않는 것으로 봅니다.
    pub fn usable_at(
        &self,
        description: &str,
        state: Option<LogState>,
        validity_end: Option<DateTime<Utc>>,
        mmd_secs: u64,
        now: DateTime<Utc>,
    ) -> bool {
        if REJECTED_MARKERS
            .iter()
            .any(|marker| description.contains(marker))
        {
            return false;
        }

        if matches!(state, Some(LogState::Retired | LogState::Rejected)) {
            return false;
        }

        if validity_end.is_some_and(|end| now >= end) {
            return false;
        }

        mmd_secs <= self.max_mmd_secs
    }

    /// 로그 디스크립터를 주어진 시각 기준으로 판정합니다.
    pub fn accepts(&self, log: &LogDescriptor, now: DateTime<Utc>) -> bool {
        self.usable_at(
            &log.description,
            log.state,
            log.validity_end,
            log.mmd_secs,
            now,
        )
    }
}
