//! 룰 팩
//!
//! 카테고리 이름 → 컴파일된 정규식 매핑입니다. 생성 시 한 번 컴파일되며
//! 이후 세션 동안 변경되지 않고 모든 필터 워커가 공유하여 읽습니다.
//!
//! # 매칭 순서
//! 여러 카테고리가 동시에 매칭되면 카테고리 이름의 사전순으로 가장 앞선
//! 카테고리 하나만 선택합니다. 내부적으로 `BTreeMap`을 사용하므로 순회 순서가
//! 항상 사전순입니다.
//!
//! # 룰 파일 형식
//! ```json
//! { "acme": "^acme\\.", "bank-phishing": "(?i)secure-?bank" }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::error::CtMonitorError;

/// 불변 카테고리 → 정규식 매핑
#[derive(Debug, Clone, Default)]
pub struct RulePack {
    rules: BTreeMap<String, Regex>,
}

impl RulePack {
    /// (카테고리, 패턴) 쌍들을 컴파일합니다.
    ///
    /// 하나라도 컴파일에 실패하면 해당 카테고리를 담은 `RuleCompile` 에러를 반환합니다.
    /// 같은 카테고리가 반복되면 마지막 패턴이 사용됩니다.
    pub fn compile<I, K, V>(patterns: I) -> Result<Self, CtMonitorError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut rules = BTreeMap::new();
        for (category, pattern) in patterns {
            let category = category.into();
            let regex = Regex::new(pattern.as_ref()).map_err(|e| CtMonitorError::RuleCompile {
                category: category.clone(),
                reason: e.to_string(),
            })?;
            rules.insert(category, regex);
        }
        Ok(Self { rules })
    }

    /// JSON 객체 문자열에서 룰 팩을 생성합니다.
    pub fn from_json_str(json: &str) -> Result<Self, CtMonitorError> {
        let raw: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|e| CtMonitorError::RuleLoad {
                path: "<inline>".to_owned(),
                reason: e.to_string(),
            })?;
        Self::compile(raw)
    }

    /// JSON 룰 파일을 읽어 룰 팩을 생성합니다.
    ///
    /// 빈 객체는 매칭할 수 있는 것이 없으므로 거부합니다.
    pub async fn load_json_file(path: impl AsRef<Path>) -> Result<Self, CtMonitorError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CtMonitorError::RuleLoad {
                path: shown.clone(),
                reason: e.to_string(),
            })?;

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&content).map_err(|e| CtMonitorError::RuleLoad {
                path: shown.clone(),
                reason: e.to_string(),
            })?;

        if raw.is_empty() {
            return Err(CtMonitorError::RuleLoad {
                path: shown,
                reason: "rule file defines no categories".to_owned(),
            });
        }

        let pack = Self::compile(raw)?;
        debug!(path = %shown, rules = pack.len(), "rule pack loaded");
        Ok(pack)
    }

    /// 후보 문자열 중 하나라도 매칭되는 첫 카테고리를 반환합니다.
    ///
    /// 카테고리는 사전순으로 검사하며, 각 카테고리에 대해 모든 후보를 본 뒤
    /// 다음 카테고리로 넘어갑니다.
    pub fn first_match<S: AsRef<str>>(&self, candidates: &[S]) -> Option<&str> {
        self.rules
            .iter()
            .find(|(_, regex)| candidates.iter().any(|c| regex.is_match(c.as_ref())))
            .map(|(category, _)| category.as_str())
    }

    /// 룰 수
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// 룰이 비어있는지 여부
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 카테고리 이름 (사전순)
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}
